//! Dedup and commit coordination shared by every source

use std::collections::HashSet;
use std::hash::Hash;

use crate::model::NewEntry;
use crate::ports::{EntryStore, StoreError};

/// How an entry's timestamp is treated on insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateMode {
    /// Store the timestamp as given
    Exact,
    /// Advance the timestamp by the number of same-day entries of the feed,
    /// for sources that only publish day-granularity dates
    OffsetBySameDay,
}

/// Outcome of committing a single entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Inserted(i64),
    /// The store already holds this guid (a concurrent run won the insert)
    AlreadyStored,
}

/// Drop repeated items, keeping the first occurrence and the original order
pub fn dedup_first_seen<T, K, F>(items: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(key(item)))
        .collect()
}

/// Insert one entry, tolerating a uniqueness rejection as a benign duplicate
pub async fn commit_entry<St>(
    store: &St,
    entry: &NewEntry,
    mode: DateMode,
) -> Result<CommitOutcome, StoreError>
where
    St: EntryStore + ?Sized,
{
    let result = match mode {
        DateMode::Exact => store.insert_entry(entry).await,
        DateMode::OffsetBySameDay => store
            .insert_entry_with_date_offset(entry)
            .await
            .map(|committed| committed.id),
    };

    match result {
        Ok(id) => {
            tracing::debug!(guid = %entry.guid, id, "Committed entry");
            Ok(CommitOutcome::Inserted(id))
        }
        Err(StoreError::Duplicate(_)) => {
            tracing::debug!(guid = %entry.guid, "Entry already stored by a concurrent run");
            Ok(CommitOutcome::AlreadyStored)
        }
        Err(e) => Err(e),
    }
}

/// What to do with one page of a newest-first paginated listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePlan {
    /// Indices (in page order) of items that are not stored yet
    pub fresh: Vec<usize>,
    /// Whether pagination should stop after this page
    pub stop: bool,
}

impl PagePlan {
    /// Classify a page against the guids already stored.
    ///
    /// Stop when every item is stored, or when the stored items form a pure
    /// suffix of the page: once the first stored item is reached, nothing after
    /// it is new. A stored item followed by a new one keeps paginating.
    pub fn classify<S: AsRef<str>>(guids: &[S], existing: &HashSet<String>) -> Self {
        let mut fresh = Vec::with_capacity(guids.len());
        let mut has_duplicate = false;
        let mut pure_duplicate_suffix = true;

        for (idx, guid) in guids.iter().enumerate() {
            if existing.contains(guid.as_ref()) {
                has_duplicate = true;
                continue;
            }
            if has_duplicate {
                pure_duplicate_suffix = false;
            }
            fresh.push(idx);
        }

        let stop = fresh.is_empty() || (has_duplicate && pure_duplicate_suffix);
        Self { fresh, stop }
    }
}
