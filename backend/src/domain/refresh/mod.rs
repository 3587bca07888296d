//! Refresh cycle orchestration.
//!
//! A [`Synchronizer`] runs one cycle at a time: authenticate, fetch the
//! organization, index local identities, page through directory users,
//! resolve, and publish. Any failure ends the cycle without touching the
//! published snapshot. The next automatic attempt is armed on the
//! [`RefreshTimer`] before any network work starts, so failures are retried
//! on the regular interval.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use mockable::Clock;
use tracing::{debug, error, info, warn};

use super::directory_client::DirectoryClient;
use super::identity_resolver::{LocalIdentityIndex, ResolveContext, resolve};
use super::ports::{DirectorySource, IdentitySource};
use super::{CredentialsStore, DirectoryCredentials, DirectorySnapshot, SnapshotStore};

mod error;
mod phase;
mod scheduler;

pub use error::{AmbiguitySide, SyncError, SyncErrorKind};
pub use phase::{RefreshPhase, RefreshStatus};
pub use scheduler::{RefreshHandle, RefreshReason, RefreshScheduler, TokioRefreshTimer};

/// Default gap between automatic refresh attempts.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// Self-rescheduling timer driving automatic refreshes.
///
/// Arming replaces any pending deadline.
pub trait RefreshTimer: Send + Sync {
    /// Fire once, `after` from now.
    fn arm(&self, after: Duration);
    /// Cancel the pending deadline, if any.
    fn disarm(&self);
}

/// Inbound side of the scheduler: where configuration changes and identity
/// events are reported.
#[cfg_attr(test, mockall::automock)]
pub trait RefreshTrigger: Send + Sync {
    /// Store `credentials`; refresh only if they changed.
    fn configuration_changed(&self, credentials: DirectoryCredentials) -> bool;
    /// Refresh after an identity creation unless it was system-originated.
    fn identity_created(&self, event: &IdentityCreatedEvent) -> bool;
}

/// Tuning for refresh cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynchronizerConfig {
    /// Directory users requested per page.
    pub page_size: u32,
    /// Local identities requested per page.
    pub identity_page_size: u32,
    /// Gap between automatic attempts.
    pub refresh_interval: Duration,
    /// Domain profile links are built under.
    pub profile_domain: String,
}

impl Default for SynchronizerConfig {
    fn default() -> Self {
        Self {
            page_size: 200,
            identity_page_size: 200,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            profile_domain: "pingboard.com".to_owned(),
        }
    }
}

/// Collaborators a [`Synchronizer`] is wired to.
pub struct SynchronizerPorts {
    /// HR directory adapter.
    pub directory: Arc<dyn DirectorySource>,
    /// Local identity service adapter.
    pub identities: Arc<dyn IdentitySource>,
    /// Store readers query.
    pub snapshots: Arc<SnapshotStore>,
    /// Current directory credentials.
    pub credentials: Arc<CredentialsStore>,
    /// Timer arming the next automatic attempt.
    pub timer: Arc<dyn RefreshTimer>,
    /// Wall clock used for token expiry and status timestamps.
    pub clock: Arc<dyn Clock>,
}

/// How a call to [`Synchronizer::refresh`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new snapshot was published.
    Published {
        /// Users in the published snapshot.
        users: usize,
    },
    /// No credentials are configured; nothing ran and no retry was armed.
    NotConfigured,
    /// Another cycle was in flight, so this call was dropped.
    AlreadyRunning,
    /// The cycle failed and the prior snapshot was kept.
    Failed(SyncError),
}

/// Local identity creation notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityCreatedEvent {
    /// User agent of the request that created the identity; empty for
    /// system-originated creations.
    pub user_agent: String,
}

impl IdentityCreatedEvent {
    /// Whether a person (rather than an automated process) created the
    /// identity.
    #[must_use]
    pub fn is_user_originated(&self) -> bool {
        !self.user_agent.trim().is_empty()
    }
}

/// Runs refresh cycles and publishes their snapshots.
pub struct Synchronizer {
    client: DirectoryClient,
    identities: Arc<dyn IdentitySource>,
    snapshots: Arc<SnapshotStore>,
    credentials: Arc<CredentialsStore>,
    timer: Arc<dyn RefreshTimer>,
    clock: Arc<dyn Clock>,
    config: SynchronizerConfig,
    refresh_lock: tokio::sync::Mutex<()>,
    status: Mutex<RefreshStatus>,
}

impl Synchronizer {
    /// Wire a synchronizer to its collaborators.
    pub fn new(ports: SynchronizerPorts, config: SynchronizerConfig) -> Self {
        let SynchronizerPorts {
            directory,
            identities,
            snapshots,
            credentials,
            timer,
            clock,
        } = ports;
        Self {
            client: DirectoryClient::new(directory, Arc::clone(&clock)),
            identities,
            snapshots,
            credentials,
            timer,
            clock,
            config,
            refresh_lock: tokio::sync::Mutex::new(()),
            status: Mutex::new(RefreshStatus::default()),
        }
    }

    /// Credentials store shared with the configuration path.
    #[must_use]
    pub fn credentials(&self) -> &Arc<CredentialsStore> {
        &self.credentials
    }

    /// Current phase and publication timestamps.
    #[must_use]
    pub fn status(&self) -> RefreshStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one refresh cycle unless one is already running.
    ///
    /// Failures never escape: they are logged, reported in the outcome, and
    /// leave the published snapshot untouched.
    pub async fn refresh(&self) -> RefreshOutcome {
        let Ok(_running) = self.refresh_lock.try_lock() else {
            debug!("refresh already in flight; dropping trigger");
            return RefreshOutcome::AlreadyRunning;
        };

        self.timer.disarm();
        let credentials = self.credentials.current();
        if !credentials.is_configured() {
            info!("directory credentials not configured; skipping refresh");
            return RefreshOutcome::NotConfigured;
        }
        self.timer.arm(self.config.refresh_interval);

        info!("refresh cycle started");
        let _idle = PhaseReset(&self.status);
        match self.run_cycle(&credentials).await {
            Ok(snapshot) => {
                self.set_phase(RefreshPhase::Publishing);
                let users = snapshot.len();
                self.snapshots.publish(snapshot);
                self.update_status(|status| status.last_published_at = Some(self.clock.utc()));
                info!(users, "refresh cycle published snapshot");
                RefreshOutcome::Published { users }
            }
            Err(failure) => {
                self.update_status(|status| status.last_failed_at = Some(self.clock.utc()));
                log_failure(&failure);
                RefreshOutcome::Failed(failure)
            }
        }
    }

    async fn run_cycle(
        &self,
        credentials: &DirectoryCredentials,
    ) -> Result<DirectorySnapshot, SyncError> {
        self.set_phase(RefreshPhase::Authenticating);
        let session = self.client.authenticate(credentials).await?;

        self.set_phase(RefreshPhase::FetchingOrganization);
        let organization = session.fetch_organization().await?;

        self.set_phase(RefreshPhase::IndexingLocalIdentities);
        let index =
            LocalIdentityIndex::fetch(self.identities.as_ref(), self.config.identity_page_size)
                .await?;

        self.set_phase(RefreshPhase::FetchingDirectoryPages);
        let records = session.fetch_all_records(self.config.page_size).await?;

        self.set_phase(RefreshPhase::Resolving);
        let departments = session.resolve_departments(&records).await;
        resolve(
            &records,
            &index,
            &ResolveContext {
                organization: &organization,
                profile_domain: &self.config.profile_domain,
                departments: &departments,
            },
        )
    }

    fn set_phase(&self, phase: RefreshPhase) {
        debug!(phase = phase.as_str(), "refresh phase");
        self.update_status(|status| status.phase = phase);
    }

    fn update_status(&self, apply: impl FnOnce(&mut RefreshStatus)) {
        apply(&mut self.status.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

/// Returns the status to idle when a cycle ends, including when the cycle
/// future is dropped mid-flight.
struct PhaseReset<'a>(&'a Mutex<RefreshStatus>);

impl Drop for PhaseReset<'_> {
    fn drop(&mut self) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .phase = RefreshPhase::Idle;
    }
}

fn log_failure(failure: &SyncError) {
    match failure.kind() {
        SyncErrorKind::Ambiguity => {
            error!(data_quality = true, error = %failure, "refresh cycle aborted");
        }
        kind => {
            warn!(kind = ?kind, error = %failure, "refresh cycle failed; keeping previous snapshot");
        }
    }
}

#[cfg(test)]
mod tests;
