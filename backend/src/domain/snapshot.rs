//! Published directory snapshot and the store readers query.
//!
//! The store holds an `Arc` to an immutable snapshot behind a reader/writer
//! lock. Readers clone the `Arc` (or look up one entry) under the read lock;
//! the synchronizer swaps the whole `Arc` under the write lock. A reader
//! therefore observes either the previous snapshot or the next one in full.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::ResolvedUser;

/// Immutable mapping from local username to resolved directory record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySnapshot {
    users: HashMap<String, ResolvedUser>,
}

impl DirectorySnapshot {
    /// Build a snapshot from resolved users keyed by username.
    #[must_use]
    pub fn new(users: HashMap<String, ResolvedUser>) -> Self {
        Self { users }
    }

    /// Look up one user.
    #[must_use]
    pub fn get(&self, username: &str) -> Option<&ResolvedUser> {
        self.users.get(username)
    }

    /// Number of published users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the snapshot holds no users.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Iterate over `(username, record)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ResolvedUser)> {
        self.users.iter()
    }
}

impl FromIterator<ResolvedUser> for DirectorySnapshot {
    fn from_iter<T: IntoIterator<Item = ResolvedUser>>(iter: T) -> Self {
        Self::new(
            iter.into_iter()
                .map(|user| (user.username.clone(), user))
                .collect(),
        )
    }
}

/// Owner of the currently published snapshot.
///
/// Starts empty, so every lookup misses until the first successful refresh.
///
/// # Examples
/// ```
/// use org_directory::domain::{DirectorySnapshot, SnapshotStore};
///
/// let store = SnapshotStore::new();
/// assert!(store.lookup("alice").is_none());
/// store.publish(DirectorySnapshot::default());
/// assert!(store.current().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Arc<DirectorySnapshot>>,
}

impl SnapshotStore {
    /// Create a store holding an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the user published under `username`, if any.
    #[must_use]
    pub fn lookup(&self, username: &str) -> Option<ResolvedUser> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(username)
            .cloned()
    }

    /// Return a handle to the whole current snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<DirectorySnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the current snapshot in one step.
    pub fn publish(&self, snapshot: DirectorySnapshot) {
        let next = Arc::new(snapshot);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}
