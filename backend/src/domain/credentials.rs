//! Directory API credentials and the lock-guarded store the refresh path reads.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use zeroize::Zeroizing;

/// OAuth2 client credentials for the HR directory.
#[derive(Clone, Default)]
pub struct DirectoryCredentials {
    client_id: String,
    client_secret: Zeroizing<String>,
}

impl DirectoryCredentials {
    /// Bundle a client id and secret.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: Zeroizing::new(client_secret.into()),
        }
    }

    /// OAuth2 client id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        self.client_id.as_str()
    }

    /// OAuth2 client secret.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        self.client_secret.as_str()
    }

    /// Both halves are present; a refresh without them is skipped entirely.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }
}

impl PartialEq for DirectoryCredentials {
    fn eq(&self, other: &Self) -> bool {
        self.client_id == other.client_id
            && self.client_secret.as_str() == other.client_secret.as_str()
    }
}

impl Eq for DirectoryCredentials {}

impl fmt::Debug for DirectoryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Current credentials, shared between the configuration path and refreshes.
#[derive(Debug, Default)]
pub struct CredentialsStore {
    current: RwLock<DirectoryCredentials>,
}

impl CredentialsStore {
    /// Create a store seeded with `credentials`.
    #[must_use]
    pub fn new(credentials: DirectoryCredentials) -> Self {
        Self {
            current: RwLock::new(credentials),
        }
    }

    /// Copy of the current credentials.
    #[must_use]
    pub fn current(&self) -> DirectoryCredentials {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Store `credentials`, returning whether they differ from the old value.
    pub fn replace(&self, credentials: DirectoryCredentials) -> bool {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if *guard == credentials {
            return false;
        }
        *guard = credentials;
        true
    }
}
