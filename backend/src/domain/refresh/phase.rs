//! Refresh cycle phases and the status readers can observe.

use chrono::{DateTime, Utc};

/// Step a refresh cycle is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPhase {
    /// No cycle running.
    #[default]
    Idle,
    /// Exchanging client credentials for a token.
    Authenticating,
    /// Fetching the organization record.
    FetchingOrganization,
    /// Paging through local identities.
    IndexingLocalIdentities,
    /// Paging through directory users.
    FetchingDirectoryPages,
    /// Resolving departments, managers and identity matches.
    Resolving,
    /// Swapping the new snapshot in.
    Publishing,
}

impl RefreshPhase {
    /// Stable label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Authenticating => "authenticating",
            Self::FetchingOrganization => "fetching_organization",
            Self::IndexingLocalIdentities => "indexing_local_identities",
            Self::FetchingDirectoryPages => "fetching_directory_pages",
            Self::Resolving => "resolving",
            Self::Publishing => "publishing",
        }
    }
}

/// Observable state of the synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshStatus {
    /// Current phase.
    pub phase: RefreshPhase,
    /// When a snapshot was last published.
    pub last_published_at: Option<DateTime<Utc>>,
    /// When the last cycle failed, if it did after the last publication.
    pub last_failed_at: Option<DateTime<Utc>>,
}
