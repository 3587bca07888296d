//! Validating client over the [`DirectorySource`] port.
//!
//! Every response is checked against the directory's contract before it is
//! trusted: one company, page numbers that match the request, non-empty pages,
//! and a usable token. Any violation aborts the cycle. Department names are the
//! exception; a bad department lookup only degrades that one field.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::domain::ports::{DirectorySource, DirectoryUsersPage};
use crate::domain::{DirectoryCredentials, DirectoryRecord, OrgInfo, SyncError};

/// Per-cycle memo of department id to name.
///
/// Misses are stored as empty names so a failing id is looked up once only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepartmentCache {
    names: HashMap<String, String>,
}

impl DepartmentCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached name for `department_id`; `Some("")` records a miss.
    #[must_use]
    pub fn get(&self, department_id: &str) -> Option<&str> {
        self.names.get(department_id).map(String::as_str)
    }

    /// Remember `name` for `department_id`.
    pub fn insert(&mut self, department_id: impl Into<String>, name: impl Into<String>) {
        self.names.insert(department_id.into(), name.into());
    }

    /// Number of distinct ids looked up.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether nothing has been looked up yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Entry point for talking to the HR directory.
pub struct DirectoryClient {
    source: Arc<dyn DirectorySource>,
    clock: Arc<dyn Clock>,
}

impl DirectoryClient {
    /// Wrap a directory source.
    pub fn new(source: Arc<dyn DirectorySource>, clock: Arc<dyn Clock>) -> Self {
        Self { source, clock }
    }

    /// Exchange `credentials` for an authenticated session.
    ///
    /// # Errors
    ///
    /// Fails on transport errors, non-200 responses, undecodable bodies, an
    /// empty token, or a token with no remaining validity.
    pub async fn authenticate(
        &self,
        credentials: &DirectoryCredentials,
    ) -> Result<DirectorySession, SyncError> {
        const OPERATION: &str = "token exchange";
        let grant = self
            .source
            .request_token(credentials)
            .await
            .map_err(|source| SyncError::Directory {
                operation: OPERATION,
                source,
            })?;

        if grant.access_token.is_empty() {
            return Err(SyncError::validation(OPERATION, "empty access token"));
        }
        if grant.expires_in_seconds <= 0 {
            return Err(SyncError::validation(
                OPERATION,
                format!("token validity of {}s", grant.expires_in_seconds),
            ));
        }

        let expires_at = self
            .clock
            .utc()
            .checked_add_signed(TimeDelta::seconds(grant.expires_in_seconds))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        info!(%expires_at, "obtained directory access token");

        Ok(DirectorySession {
            source: Arc::clone(&self.source),
            token: Zeroizing::new(grant.access_token),
            expires_at,
        })
    }
}

/// Authenticated view of the directory for one refresh cycle.
pub struct DirectorySession {
    source: Arc<dyn DirectorySource>,
    token: Zeroizing<String>,
    expires_at: DateTime<Utc>,
}

impl DirectorySession {
    /// When the session's token stops being accepted.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Fetch the organization the credentials belong to.
    ///
    /// # Errors
    ///
    /// Fails on any source error or unless exactly one company is returned.
    pub async fn fetch_organization(&self) -> Result<OrgInfo, SyncError> {
        const OPERATION: &str = "company lookup";
        let companies = self
            .source
            .fetch_companies(&self.token)
            .await
            .map_err(|source| SyncError::Directory {
                operation: OPERATION,
                source,
            })?;

        let count = companies.len();
        let mut companies = companies.into_iter();
        match (companies.next(), companies.next()) {
            (Some(org), None) => {
                info!(company = %org.name, subdomain = %org.subdomain, "resolved directory company");
                Ok(org)
            }
            _ => Err(SyncError::validation(
                OPERATION,
                format!("expected exactly one company, got {count}"),
            )),
        }
    }

    /// Fetch and validate one page of users.
    ///
    /// # Errors
    ///
    /// Fails on any source error, when the reported page differs from `page`,
    /// or when the page holds no records.
    pub async fn fetch_users_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<DirectoryUsersPage, SyncError> {
        const OPERATION: &str = "users page";
        let response = self
            .source
            .fetch_users_page(&self.token, page, page_size)
            .await
            .map_err(|source| SyncError::Directory {
                operation: OPERATION,
                source,
            })?;

        if response.page != page {
            return Err(SyncError::validation(
                OPERATION,
                format!("requested page {page}, got page {}", response.page),
            ));
        }
        if response.records.is_empty() {
            return Err(SyncError::validation(
                OPERATION,
                format!("page {page} contained no users"),
            ));
        }
        debug!(page, users = response.records.len(), "fetched directory page");
        Ok(response)
    }

    /// Fetch every page of users.
    ///
    /// The page count is taken from the first response; pages are requested
    /// until the page number exceeds it.
    ///
    /// # Errors
    ///
    /// Propagates the first failing page.
    pub async fn fetch_all_records(&self, page_size: u32) -> Result<Vec<DirectoryRecord>, SyncError> {
        let mut records = Vec::new();
        let mut page = 1_u32;
        let mut page_count: Option<u32> = None;

        while page_count.is_none_or(|count| page <= count) {
            let response = self.fetch_users_page(page, page_size).await?;
            page_count = Some(response.page_count);
            records.extend(response.records);
            page = page.saturating_add(1);
        }

        info!(users = records.len(), pages = page.saturating_sub(1), "fetched directory users");
        Ok(records)
    }

    /// Resolve a department id to its name, consulting `cache` first.
    ///
    /// Returns an empty string when the lookup fails or the group does not
    /// match; the miss is cached for the rest of the cycle.
    pub async fn resolve_department_name(
        &self,
        department_id: &str,
        cache: &mut DepartmentCache,
    ) -> String {
        if let Some(name) = cache.get(department_id) {
            return name.to_owned();
        }

        let name = match self.source.fetch_groups(&self.token, department_id).await {
            Ok(groups) => match groups.as_slice() {
                [group] if group.id == department_id => group.name.clone(),
                _ => {
                    debug!(department_id, groups = groups.len(), "department lookup did not match");
                    String::new()
                }
            },
            Err(error) => {
                warn!(department_id, %error, "department lookup failed");
                String::new()
            }
        };
        cache.insert(department_id, name.clone());
        name
    }

    /// Resolve the department of every record that references one.
    pub async fn resolve_departments(&self, records: &[DirectoryRecord]) -> DepartmentCache {
        let mut cache = DepartmentCache::new();
        for department_id in records.iter().filter_map(|r| r.department_id.as_deref()) {
            self.resolve_department_name(department_id, &mut cache).await;
        }
        debug!(departments = cache.len(), "resolved departments");
        cache
    }
}
