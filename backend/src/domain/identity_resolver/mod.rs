//! Reconciles directory records with local identities.
//!
//! Both sides are keyed by [`NormalizedEmail`]. A key claimed twice on either
//! side makes the join ambiguous and fails the cycle; a directory record with
//! no local counterpart is simply left out. Manager and department references
//! are foreign keys resolved here, and a miss on either only blanks that field.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::{debug, info};

use super::directory_client::DepartmentCache;
use super::ports::{IdentitySource, LocalIdentity};
use super::{
    AmbiguitySide, DirectoryRecord, DirectorySnapshot, NormalizedEmail, OrgInfo, ResolvedUser,
    SyncError, UNKNOWN_DEPARTMENT,
};

const LIST_IDENTITIES: &str = "identity listing";

/// Local usernames keyed by normalized email.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalIdentityIndex {
    by_email: HashMap<NormalizedEmail, String>,
}

impl LocalIdentityIndex {
    /// Index already-fetched identities.
    ///
    /// Identities whose email normalizes to nothing are skipped. The same
    /// username listed twice under one key is tolerated.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Ambiguous`] when two usernames share a key.
    pub fn from_identities(
        identities: impl IntoIterator<Item = LocalIdentity>,
    ) -> Result<Self, SyncError> {
        let mut index = Self::default();
        for identity in identities {
            index.insert(identity)?;
        }
        Ok(index)
    }

    /// Page through `source` and index every identity.
    ///
    /// # Errors
    ///
    /// Propagates source failures and ambiguous keys.
    pub async fn fetch(source: &dyn IdentitySource, page_size: u32) -> Result<Self, SyncError> {
        let mut index = Self::default();
        let mut page = 0_u32;
        loop {
            let response = source
                .list_identities(page, page_size)
                .await
                .map_err(|source| SyncError::Identity {
                    operation: LIST_IDENTITIES,
                    source,
                })?;
            let exhausted = !response.has_more || response.identities.is_empty();
            for identity in response.identities {
                index.insert(identity)?;
            }
            if exhausted {
                break;
            }
            page = page.saturating_add(1);
        }
        info!(identities = index.len(), "indexed local identities");
        Ok(index)
    }

    fn insert(&mut self, identity: LocalIdentity) -> Result<(), SyncError> {
        let key = NormalizedEmail::new(&identity.email);
        if key.is_empty() {
            debug!(username = %identity.username, "local identity has no usable email");
            return Ok(());
        }
        match self.by_email.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(identity.username);
                Ok(())
            }
            Entry::Occupied(existing) if *existing.get() == identity.username => Ok(()),
            Entry::Occupied(existing) => Err(SyncError::Ambiguous {
                side: AmbiguitySide::Local,
                email: existing.key().clone(),
                first: existing.get().clone(),
                second: identity.username,
            }),
        }
    }

    /// Local username for `email`, if any.
    #[must_use]
    pub fn username_for(&self, email: &NormalizedEmail) -> Option<&str> {
        self.by_email.get(email).map(String::as_str)
    }

    /// Number of indexed identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_email.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty()
    }
}

/// Cycle-wide inputs needed to build published records.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    /// Organization the records belong to.
    pub organization: &'a OrgInfo,
    /// Domain profile links are built under.
    pub profile_domain: &'a str,
    /// Department names resolved for this cycle.
    pub departments: &'a DepartmentCache,
}

/// Join `records` to `index` and build the next snapshot.
///
/// # Errors
///
/// Returns [`SyncError::Ambiguous`] when two records share a normalized email.
pub fn resolve(
    records: &[DirectoryRecord],
    index: &LocalIdentityIndex,
    context: &ResolveContext<'_>,
) -> Result<DirectorySnapshot, SyncError> {
    let keyed = key_records(records)?;
    let by_id = records
        .iter()
        .map(|record| (record.id.as_str(), record))
        .collect::<HashMap<_, _>>();

    let mut resolved = Vec::new();
    for (key, record) in keyed {
        let Some(username) = index.username_for(&key) else {
            debug!(record_id = %record.id, email = %key, "no local identity for directory record");
            continue;
        };
        if !record.start_date.is_known() {
            debug!(record_id = %record.id, "directory record has no parsable start date");
        }
        resolved.push(ResolvedUser {
            username: username.to_owned(),
            id: record.id.clone(),
            email: record.email.clone(),
            url: context
                .organization
                .profile_url(context.profile_domain, &record.id),
            start_year: record.start_date.year,
            start_month: record.start_date.month,
            start_day: record.start_date.day,
            phone: record.phone.clone(),
            job_title: record.job_title.clone(),
            department: department_name(record, context.departments),
            manager: manager_username(record, &by_id, index),
        });
    }

    info!(
        directory_users = records.len(),
        matched = resolved.len(),
        "resolved directory users"
    );
    Ok(resolved.into_iter().collect())
}

fn key_records(
    records: &[DirectoryRecord],
) -> Result<Vec<(NormalizedEmail, &DirectoryRecord)>, SyncError> {
    let mut seen: HashMap<NormalizedEmail, &str> = HashMap::new();
    let mut keyed = Vec::with_capacity(records.len());
    for record in records {
        let key = NormalizedEmail::new(&record.email);
        if key.is_empty() {
            debug!(record_id = %record.id, "directory record has no usable email");
            continue;
        }
        if let Some(first) = seen.insert(key.clone(), record.id.as_str()) {
            return Err(SyncError::Ambiguous {
                side: AmbiguitySide::Directory,
                email: key,
                first: first.to_owned(),
                second: record.id.clone(),
            });
        }
        keyed.push((key, record));
    }
    Ok(keyed)
}

fn department_name(record: &DirectoryRecord, departments: &DepartmentCache) -> String {
    record
        .department_id
        .as_deref()
        .and_then(|id| departments.get(id))
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_DEPARTMENT)
        .to_owned()
}

fn manager_username(
    record: &DirectoryRecord,
    by_id: &HashMap<&str, &DirectoryRecord>,
    index: &LocalIdentityIndex,
) -> String {
    let Some(manager_id) = record.manager_id.as_deref() else {
        return String::new();
    };
    let Some(manager) = by_id.get(manager_id) else {
        debug!(record_id = %record.id, manager_id, "manager not in directory");
        return String::new();
    };
    match index.username_for(&NormalizedEmail::new(&manager.email)) {
        Some(username) => username.to_owned(),
        None => {
            debug!(record_id = %record.id, manager_id, "manager has no local identity");
            String::new()
        }
    }
}
