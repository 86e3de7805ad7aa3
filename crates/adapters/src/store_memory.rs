//! In-memory entry store for testing and offline mode

use async_trait::async_trait;
use onion_reader_domain::{
    CommittedEntry, EntryStore, FeedSpec, NewEntry, StoreError, StoredEntry,
};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use time::{Duration, OffsetDateTime};

#[derive(Default)]
struct MemoryState {
    last_id: i64,
    categories: HashMap<String, i64>,
    feeds: HashMap<String, (i64, FeedSpec, i64)>,
    entries: Vec<StoredEntry>,
    /// (feed_id, guid) natural keys of `entries`
    keys: HashSet<(i64, String)>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn insert(&mut self, entry: &NewEntry) -> Result<i64, StoreError> {
        if !self.keys.insert((entry.feed_id, entry.guid.clone())) {
            return Err(StoreError::Duplicate(entry.guid.clone()));
        }
        let id = self.next_id();
        self.entries.push(StoredEntry {
            id,
            entry: entry.clone(),
        });
        Ok(id)
    }

    fn count_on_day(&self, feed_id: i64, day_start: OffsetDateTime) -> u64 {
        let day_end = day_start + Duration::seconds(86_399);
        self.entries
            .iter()
            .filter(|e| e.entry.feed_id == feed_id)
            .filter(|e| e.entry.date >= day_start && e.entry.date <= day_end)
            .count() as u64
    }
}

/// In-memory entry store implementation
pub struct InMemoryEntryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryEntryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
        }
    }

    /// All stored entries, in insertion order
    pub fn entries(&self) -> Vec<StoredEntry> {
        self.state
            .read()
            .map(|state| state.entries.clone())
            .unwrap_or_default()
    }
}

impl Default for InMemoryEntryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned(e: impl std::fmt::Display) -> StoreError {
    StoreError::Database(e.to_string())
}

#[async_trait]
impl EntryStore for InMemoryEntryStore {
    async fn existing_guids(&self, guids: &[String]) -> Result<HashSet<String>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        let wanted: HashSet<&str> = guids.iter().map(String::as_str).collect();
        Ok(state
            .keys
            .iter()
            .filter(|(_, guid)| wanted.contains(guid.as_str()))
            .map(|(_, guid)| guid.clone())
            .collect())
    }

    async fn insert_entry(&self, entry: &NewEntry) -> Result<i64, StoreError> {
        self.state.write().map_err(poisoned)?.insert(entry)
    }

    async fn insert_entry_with_date_offset(
        &self,
        entry: &NewEntry,
    ) -> Result<CommittedEntry, StoreError> {
        let mut state = self.state.write().map_err(poisoned)?;
        let count = state.count_on_day(entry.feed_id, entry.date);

        let mut shifted = entry.clone();
        shifted.date += Duration::seconds(count as i64);
        let id = state.insert(&shifted)?;

        Ok(CommittedEntry {
            id,
            date: shifted.date,
        })
    }

    async fn count_entries_for_feed_on_day(
        &self,
        feed_id: i64,
        day_start: OffsetDateTime,
    ) -> Result<u64, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.count_on_day(feed_id, day_start))
    }

    async fn category_id_for_name(&self, name: &str) -> Result<Option<i64>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.categories.get(name).copied())
    }

    async fn insert_category(&self, name: &str) -> Result<i64, StoreError> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.categories.contains_key(name) {
            return Err(StoreError::Duplicate(name.to_string()));
        }
        let id = state.next_id();
        state.categories.insert(name.to_string(), id);
        Ok(id)
    }

    async fn feed_id_for_url(&self, url: &str) -> Result<Option<i64>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.feeds.get(url).map(|(id, _, _)| *id))
    }

    async fn insert_feed(&self, feed: &FeedSpec, category_id: i64) -> Result<i64, StoreError> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.feeds.contains_key(&feed.url) {
            return Err(StoreError::Duplicate(feed.url.clone()));
        }
        let id = state.next_id();
        state
            .feeds
            .insert(feed.url.clone(), (id, feed.clone(), category_id));
        Ok(id)
    }
}
