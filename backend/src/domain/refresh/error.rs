//! Failures that abort one refresh cycle.

use std::fmt;

use crate::domain::NormalizedEmail;
use crate::domain::ports::{DirectorySourceError, IdentitySourceError};

/// Which user population produced an ambiguous email key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbiguitySide {
    /// Two local identities share a key.
    Local,
    /// Two directory records share a key.
    Directory,
}

impl fmt::Display for AmbiguitySide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Local => "local identity",
            Self::Directory => "directory",
        })
    }
}

/// Coarse classification used for logging and retry expectations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    /// Network failure, timeout, or non-success status.
    Transport,
    /// The response arrived but had the wrong shape.
    Validation,
    /// Duplicate normalized email keys; a data-quality problem.
    Ambiguity,
}

/// Reason a refresh cycle was abandoned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// A directory call failed.
    #[error("{operation} failed: {source}")]
    Directory {
        /// Operation being attempted.
        operation: &'static str,
        /// Adapter error.
        source: DirectorySourceError,
    },
    /// Listing local identities failed.
    #[error("{operation} failed: {source}")]
    Identity {
        /// Operation being attempted.
        operation: &'static str,
        /// Adapter error.
        source: IdentitySourceError,
    },
    /// A response decoded but broke the expected contract.
    #[error("{operation} returned an unexpected response: {reason}")]
    Validation {
        /// Operation being attempted.
        operation: &'static str,
        /// What was wrong.
        reason: String,
    },
    /// Two users normalize to the same email key.
    #[error("ambiguous {side} email {email}: claimed by {first} and {second}")]
    Ambiguous {
        /// Population the duplicate was found in.
        side: AmbiguitySide,
        /// Shared key.
        email: NormalizedEmail,
        /// First claimant (username or directory id).
        first: String,
        /// Second claimant.
        second: String,
    },
}

impl SyncError {
    /// Build a validation failure.
    pub fn validation(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            operation,
            reason: reason.into(),
        }
    }

    /// Classify the failure.
    ///
    /// Undecodable bodies count as validation failures; everything else an
    /// adapter reports is transport.
    #[must_use]
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            Self::Directory {
                source: DirectorySourceError::Decode { .. },
                ..
            }
            | Self::Identity {
                source: IdentitySourceError::Decode { .. },
                ..
            }
            | Self::Validation { .. } => SyncErrorKind::Validation,
            Self::Directory { .. } | Self::Identity { .. } => SyncErrorKind::Transport,
            Self::Ambiguous { .. } => SyncErrorKind::Ambiguity,
        }
    }

    /// Whether retrying later can succeed without someone fixing data.
    #[must_use]
    pub fn is_data_quality(&self) -> bool {
        self.kind() == SyncErrorKind::Ambiguity
    }
}
