//! Driven port for the local identity service.

use async_trait::async_trait;

use super::define_port_error;

/// A local account as known to the identity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentity {
    /// Local username; the key snapshots are published under.
    pub username: String,
    /// Raw email on the local account.
    pub email: String,
}

impl LocalIdentity {
    /// Convenience constructor.
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
        }
    }
}

/// One page of local identities.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentityPage {
    /// Identities on this page.
    pub identities: Vec<LocalIdentity>,
    /// Whether another page follows.
    pub has_more: bool,
}

define_port_error! {
    /// Errors surfaced while listing local identities.
    pub enum IdentitySourceError {
        /// The request never produced a response.
        Transport { message: String } =>
            "identity service transport failed: {message}",
        /// The service answered with a non-success status.
        Status { status: u16, message: String } =>
            "identity service responded with status {status}: {message}",
        /// The body could not be decoded.
        Decode { message: String } =>
            "identity service response decode failed: {message}",
    }
}

/// Port for paging through local identities.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentitySource: Send + Sync {
    /// List one page of identities (pages are zero-based).
    async fn list_identities(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<IdentityPage, IdentitySourceError>;
}

/// Fixture returning a fixed identity list as a single page.
#[derive(Debug, Clone, Default)]
pub struct FixtureIdentitySource {
    identities: Vec<LocalIdentity>,
}

impl FixtureIdentitySource {
    /// Serve `identities` on page zero.
    #[must_use]
    pub fn new(identities: Vec<LocalIdentity>) -> Self {
        Self { identities }
    }
}

#[async_trait]
impl IdentitySource for FixtureIdentitySource {
    async fn list_identities(
        &self,
        page: u32,
        _page_size: u32,
    ) -> Result<IdentityPage, IdentitySourceError> {
        let identities = if page == 0 {
            self.identities.clone()
        } else {
            Vec::new()
        };
        Ok(IdentityPage {
            identities,
            has_more: false,
        })
    }
}
