//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data`, so they depend only
//! on the snapshot store and domain traits and stay testable without I/O.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::{RefreshTrigger, SnapshotStore};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Published directory snapshot.
    pub snapshots: Arc<SnapshotStore>,
    /// Where identity events are reported.
    pub refresh: Arc<dyn RefreshTrigger>,
    /// Clock used to compute tenure.
    pub clock: Arc<dyn Clock>,
}

impl HttpState {
    /// Bundle handler dependencies.
    pub fn new(
        snapshots: Arc<SnapshotStore>,
        refresh: Arc<dyn RefreshTrigger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            snapshots,
            refresh,
            clock,
        }
    }
}
