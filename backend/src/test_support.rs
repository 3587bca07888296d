//! Shared test doubles for unit tests (in `src/`) and integration tests (in
//! `tests/`). Compiled for tests and behind the `test-support` feature.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use mockable::Clock;
use tokio::sync::Semaphore;

use crate::domain::ports::{
    DirectoryGroup, DirectorySource, DirectorySourceError, DirectoryUsersPage, TokenGrant,
};
use crate::domain::refresh::RefreshTimer;
use crate::domain::{DirectoryCredentials, DirectoryRecord, OrgInfo, ResolvedUser, StartDate};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Clock frozen at a settable instant.
#[derive(Debug)]
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    /// Freeze the clock at `now`.
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *lock(&self.0) = now;
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

/// Directory record with only an id and email set.
#[must_use]
pub fn directory_record(id: &str, email: &str) -> DirectoryRecord {
    DirectoryRecord {
        id: id.to_owned(),
        email: email.to_owned(),
        phone: String::new(),
        job_title: String::new(),
        start_date: StartDate::UNKNOWN,
        department_id: None,
        manager_id: None,
    }
}

/// Published user with placeholder fields.
#[must_use]
pub fn resolved_user(username: &str, id: &str) -> ResolvedUser {
    ResolvedUser {
        username: username.to_owned(),
        id: id.to_owned(),
        email: format!("{username}@co.com"),
        url: format!("https://co.pingboard.com/users/{id}"),
        start_year: 2020,
        start_month: 1,
        start_day: 15,
        phone: String::new(),
        job_title: String::new(),
        department: "Engineering".to_owned(),
        manager: String::new(),
    }
}

/// Something done to a [`RecordingTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Armed with the given delay.
    Armed(Duration),
    /// Disarmed.
    Disarmed,
}

/// Timer that records calls instead of firing.
#[derive(Debug, Default)]
pub struct RecordingTimer(Mutex<Vec<TimerEvent>>);

impl RecordingTimer {
    /// Every call so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<TimerEvent> {
        lock(&self.0).clone()
    }

    /// Delays the timer was armed with, in order.
    #[must_use]
    pub fn armed(&self) -> Vec<Duration> {
        lock(&self.0)
            .iter()
            .filter_map(|event| match event {
                TimerEvent::Armed(after) => Some(*after),
                TimerEvent::Disarmed => None,
            })
            .collect()
    }
}

impl RefreshTimer for RecordingTimer {
    fn arm(&self, after: Duration) {
        lock(&self.0).push(TimerEvent::Armed(after));
    }

    fn disarm(&self) {
        lock(&self.0).push(TimerEvent::Disarmed);
    }
}

/// In-memory directory serving a fixed organization, user pages, and groups.
///
/// Users pages can be held behind a gate to simulate a slow directory.
#[derive(Debug)]
pub struct ScriptedDirectorySource {
    organization: OrgInfo,
    pages: Vec<Vec<DirectoryRecord>>,
    groups: HashMap<String, String>,
    token_failure: Option<DirectorySourceError>,
    gate: Option<Arc<Semaphore>>,
    token_requests: AtomicUsize,
    page_requests: AtomicUsize,
    group_requests: AtomicUsize,
    token_secrets: Mutex<Vec<String>>,
}

impl ScriptedDirectorySource {
    /// Directory for `organization` with no users.
    #[must_use]
    pub fn new(organization: OrgInfo) -> Self {
        Self {
            organization,
            pages: Vec::new(),
            groups: HashMap::new(),
            token_failure: None,
            gate: None,
            token_requests: AtomicUsize::new(0),
            page_requests: AtomicUsize::new(0),
            group_requests: AtomicUsize::new(0),
            token_secrets: Mutex::new(Vec::new()),
        }
    }

    /// Append a users page.
    #[must_use]
    pub fn with_page(mut self, records: Vec<DirectoryRecord>) -> Self {
        self.pages.push(records);
        self
    }

    /// Register a department group.
    #[must_use]
    pub fn with_group(mut self, id: &str, name: &str) -> Self {
        self.groups.insert(id.to_owned(), name.to_owned());
        self
    }

    /// Fail every token request with `error`.
    #[must_use]
    pub fn failing_token(mut self, error: DirectorySourceError) -> Self {
        self.token_failure = Some(error);
        self
    }

    /// Make each users page wait for a permit from `gate`.
    #[must_use]
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Token requests served so far.
    #[must_use]
    pub fn token_requests(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }

    /// Client secrets presented to the token endpoint, in order.
    #[must_use]
    pub fn token_secrets(&self) -> Vec<String> {
        lock(&self.token_secrets).clone()
    }

    /// Users pages served so far.
    #[must_use]
    pub fn page_requests(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }

    /// Group lookups served so far.
    #[must_use]
    pub fn group_requests(&self) -> usize {
        self.group_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectorySource for ScriptedDirectorySource {
    async fn request_token(
        &self,
        credentials: &DirectoryCredentials,
    ) -> Result<TokenGrant, DirectorySourceError> {
        self.token_requests.fetch_add(1, Ordering::SeqCst);
        lock(&self.token_secrets).push(credentials.client_secret().to_owned());
        match &self.token_failure {
            Some(error) => Err(error.clone()),
            None => Ok(TokenGrant {
                access_token: "scripted-token".to_owned(),
                expires_in_seconds: 7200,
            }),
        }
    }

    async fn fetch_companies(&self, _token: &str) -> Result<Vec<OrgInfo>, DirectorySourceError> {
        Ok(vec![self.organization.clone()])
    }

    async fn fetch_users_page(
        &self,
        _token: &str,
        page: u32,
        _page_size: u32,
    ) -> Result<DirectoryUsersPage, DirectorySourceError> {
        self.page_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|error| DirectorySourceError::transport(error.to_string()))?;
            permit.forget();
        }
        let records = usize::try_from(page.saturating_sub(1))
            .ok()
            .and_then(|index| self.pages.get(index))
            .cloned()
            .unwrap_or_default();
        Ok(DirectoryUsersPage {
            records,
            page,
            page_count: u32::try_from(self.pages.len()).unwrap_or(u32::MAX),
        })
    }

    async fn fetch_groups(
        &self,
        _token: &str,
        group_id: &str,
    ) -> Result<Vec<DirectoryGroup>, DirectorySourceError> {
        self.group_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .groups
            .get(group_id)
            .map(|name| DirectoryGroup {
                id: group_id.to_owned(),
                name: name.clone(),
            })
            .into_iter()
            .collect())
    }
}
