//! Background task that turns triggers into refresh cycles.

use std::future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use super::{
    IdentityCreatedEvent, RefreshOutcome, RefreshTimer, RefreshTrigger, Synchronizer,
};
use crate::domain::{CredentialsStore, DirectoryCredentials, TraceId};

/// Why a refresh was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    /// Directory credentials changed.
    ConfigurationChanged,
    /// A person created a local identity.
    IdentityCreated,
    /// The armed deadline passed.
    Timer,
}

impl RefreshReason {
    /// Stable label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfigurationChanged => "configuration_changed",
            Self::IdentityCreated => "identity_created",
            Self::Timer => "timer",
        }
    }
}

/// [`RefreshTimer`] backed by a watch channel the scheduler sleeps on.
#[derive(Debug, Clone)]
pub struct TokioRefreshTimer {
    deadline: Arc<watch::Sender<Option<Instant>>>,
}

impl Default for TokioRefreshTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TokioRefreshTimer {
    /// Create a disarmed timer.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(None);
        Self {
            deadline: Arc::new(sender),
        }
    }

    /// Pending deadline, if armed.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        *self.deadline.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Instant>> {
        self.deadline.subscribe()
    }
}

impl RefreshTimer for TokioRefreshTimer {
    fn arm(&self, after: Duration) {
        let deadline = Instant::now().checked_add(after);
        if deadline.is_none() {
            warn!(?after, "refresh interval out of range; timer left disarmed");
        }
        self.deadline.send_replace(deadline);
    }

    fn disarm(&self) {
        self.deadline.send_replace(None);
    }
}

/// Handle used to trigger refreshes and stop the scheduler.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    requests: mpsc::Sender<RefreshReason>,
    credentials: Arc<CredentialsStore>,
    config_pending: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl RefreshHandle {
    /// Ask for a refresh.
    ///
    /// Returns `false` when the request was dropped because one is already
    /// pending or the scheduler has stopped.
    pub fn request(&self, reason: RefreshReason) -> bool {
        match self.requests.try_send(reason) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(reason = reason.as_str(), "refresh already pending; dropping trigger");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(reason = reason.as_str(), "refresh scheduler stopped; dropping trigger");
                false
            }
        }
    }

    /// Stop the scheduler. A cycle in flight is abandoned.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl RefreshTrigger for RefreshHandle {
    fn configuration_changed(&self, credentials: DirectoryCredentials) -> bool {
        if !self.credentials.replace(credentials) {
            debug!("directory configuration unchanged");
            return false;
        }
        // Survives the post-cycle drain, so a change made mid-cycle still
        // gets a cycle of its own.
        self.config_pending.store(true, Ordering::SeqCst);
        match self.requests.try_send(RefreshReason::ConfigurationChanged) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("refresh busy; configuration change carried to the next cycle");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("refresh scheduler stopped; configuration change not applied");
                false
            }
        }
    }

    fn identity_created(&self, event: &IdentityCreatedEvent) -> bool {
        if !event.is_user_originated() {
            debug!("ignoring system-originated identity creation");
            return false;
        }
        self.request(RefreshReason::IdentityCreated)
    }
}

/// Long-running task serializing refresh cycles.
pub struct RefreshScheduler {
    synchronizer: Arc<Synchronizer>,
    timer: TokioRefreshTimer,
    deadline: watch::Receiver<Option<Instant>>,
    requests: mpsc::Receiver<RefreshReason>,
    config_pending: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl RefreshScheduler {
    /// Spawn the scheduler on the current runtime.
    ///
    /// `timer` must be the same timer the synchronizer arms.
    pub fn spawn(
        synchronizer: Arc<Synchronizer>,
        timer: TokioRefreshTimer,
        cancel: CancellationToken,
    ) -> (RefreshHandle, JoinHandle<()>) {
        let (sender, requests) = mpsc::channel(1);
        let config_pending = Arc::new(AtomicBool::new(false));
        let handle = RefreshHandle {
            requests: sender,
            credentials: Arc::clone(synchronizer.credentials()),
            config_pending: Arc::clone(&config_pending),
            cancel: cancel.clone(),
        };
        let scheduler = Self {
            synchronizer,
            deadline: timer.subscribe(),
            timer,
            requests,
            config_pending,
            cancel,
        };
        (handle, tokio::spawn(scheduler.run()))
    }

    async fn run(mut self) {
        info!("refresh scheduler started");
        let mut carried = None;
        loop {
            let reason = match carried.take() {
                Some(reason) => reason,
                None => match self.next_trigger().await {
                    Some(reason) => reason,
                    None => break,
                },
            };
            // The cycle reads credentials after this point.
            self.config_pending.store(false, Ordering::SeqCst);
            let trace_id = TraceId::generate();
            let cycle = TraceId::scope(trace_id, self.synchronizer.refresh()).instrument(
                info_span!("refresh", reason = reason.as_str(), %trace_id),
            );
            let outcome = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                outcome = cycle => outcome,
            };
            if let RefreshOutcome::Published { users } = outcome {
                debug!(reason = reason.as_str(), users, "triggered refresh published");
            }
            self.drop_stale_requests();
            if self.config_pending.swap(false, Ordering::SeqCst) {
                debug!("configuration changed during refresh; running again");
                carried = Some(RefreshReason::ConfigurationChanged);
            }
        }
        info!("refresh scheduler stopped");
    }

    async fn next_trigger(&mut self) -> Option<RefreshReason> {
        loop {
            let armed = *self.deadline.borrow_and_update();
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return None,
                request = self.requests.recv() => return request,
                () = sleep_until_armed(armed) => {
                    self.timer.disarm();
                    return Some(RefreshReason::Timer);
                }
                changed = self.deadline.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }
            }
        }
    }

    fn drop_stale_requests(&mut self) {
        while let Ok(reason) = self.requests.try_recv() {
            debug!(
                reason = reason.as_str(),
                "trigger arrived during refresh; dropping"
            );
        }
    }
}

async fn sleep_until_armed(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => future::pending().await,
    }
}
