//! Driven port for the external HR-directory service.
//!
//! The adapter behind this port owns transport and decoding only. Response
//! validation (page numbering, entry counts, token sanity) lives with the
//! domain client so every adapter is held to the same contract.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{DirectoryCredentials, DirectoryRecord, OrgInfo};

/// Bearer token grant returned by the client-credentials exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    /// Opaque bearer token.
    pub access_token: String,
    /// Remaining validity in seconds.
    pub expires_in_seconds: i64,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field("expires_in_seconds", &self.expires_in_seconds)
            .finish()
    }
}

/// One page of directory users together with the reported paging metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirectoryUsersPage {
    /// Records on this page.
    pub records: Vec<DirectoryRecord>,
    /// Page number the service says it returned.
    pub page: u32,
    /// Total number of pages the service reports.
    pub page_count: u32,
}

/// A directory group (departments are groups).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryGroup {
    /// Group identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

define_port_error! {
    /// Errors surfaced while calling the HR directory.
    pub enum DirectorySourceError {
        /// The request never produced a response.
        Transport { message: String } =>
            "directory transport failed: {message}",
        /// The request timed out.
        Timeout { message: String } =>
            "directory request timed out: {message}",
        /// The service answered with a non-200 status.
        Status { status: u16, message: String } =>
            "directory responded with status {status}: {message}",
        /// The body could not be decoded into the expected shape.
        Decode { message: String } =>
            "directory response decode failed: {message}",
    }
}

/// Port for reading the HR directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectorySource: Send + Sync {
    /// Exchange client credentials for a bearer token.
    async fn request_token(
        &self,
        credentials: &DirectoryCredentials,
    ) -> Result<TokenGrant, DirectorySourceError>;

    /// Fetch the organization(s) visible to `token`.
    async fn fetch_companies(&self, token: &str) -> Result<Vec<OrgInfo>, DirectorySourceError>;

    /// Fetch one page of users.
    async fn fetch_users_page(
        &self,
        token: &str,
        page: u32,
        page_size: u32,
    ) -> Result<DirectoryUsersPage, DirectorySourceError>;

    /// Fetch the group(s) reported for `group_id`.
    async fn fetch_groups(
        &self,
        token: &str,
        group_id: &str,
    ) -> Result<Vec<DirectoryGroup>, DirectorySourceError>;
}
