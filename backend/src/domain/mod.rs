//! Domain types and services for mirroring the HR directory.
//!
//! Purpose: hold everything that does not know about HTTP. Inbound adapters
//! query the [`SnapshotStore`]; outbound adapters implement the traits in
//! [`ports`]; the [`refresh`] module ties the two together.
//!
//! Public surface:
//! - [`NormalizedEmail`]: the join key between directory and local users.
//! - [`DirectoryRecord`], [`OrgInfo`], [`ResolvedUser`]: directory data
//!   before and after resolution.
//! - [`DirectorySnapshot`], [`SnapshotStore`]: the published view.
//! - [`DirectoryCredentials`], [`CredentialsStore`]: current configuration.
//! - [`Synchronizer`], [`RefreshScheduler`]: the refresh engine.
//! - [`DomainError`], [`ErrorCode`]: failures returned to request handlers.

mod credentials;
mod directory;
pub mod directory_client;
mod email;
pub mod error;
pub mod identity_resolver;
pub mod ports;
pub mod refresh;
mod snapshot;
mod tenure;
mod trace_id;

pub use self::credentials::{CredentialsStore, DirectoryCredentials};
pub use self::directory::{DirectoryRecord, OrgInfo, ResolvedUser, StartDate, UNKNOWN_DEPARTMENT};
pub use self::directory_client::{DepartmentCache, DirectoryClient, DirectorySession};
pub use self::email::{NormalizedEmail, normalize_email};
pub use self::error::{DomainError, ErrorCode};
pub use self::identity_resolver::{LocalIdentityIndex, ResolveContext, resolve};
pub use self::refresh::{
    AmbiguitySide, IdentityCreatedEvent, RefreshHandle, RefreshOutcome, RefreshPhase,
    RefreshReason, RefreshScheduler, RefreshStatus, RefreshTimer, RefreshTrigger, SyncError,
    SyncErrorKind, Synchronizer, SynchronizerConfig, SynchronizerPorts, TokioRefreshTimer,
};
pub use self::snapshot::{DirectorySnapshot, SnapshotStore};
pub use self::tenure::describe_tenure;
pub use self::trace_id::TraceId;

/// Result alias for request handlers.
///
/// # Examples
/// ```
/// use org_directory::domain::{ApiResult, DomainError};
///
/// fn handler() -> ApiResult<()> {
///     Err(DomainError::unauthorized("missing caller identity"))
/// }
/// assert!(handler().is_err());
/// ```
pub type ApiResult<T> = Result<T, DomainError>;
