//! Fake port implementations shared by the use case tests

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};

use crate::model::{CommittedEntry, FeedSpec, NewEntry, StoredEntry};
use crate::ports::{EntryStore, StoreError};

#[derive(Default)]
struct FakeState {
    next_id: i64,
    categories: Vec<(i64, String)>,
    feeds: Vec<(i64, FeedSpec, i64)>,
    entries: Vec<StoredEntry>,
    /// Entries another writer commits right as ours tries to
    racing_guids: HashSet<String>,
    /// Categories another writer creates between our lookup and our insert
    racing_categories: HashSet<String>,
    existing_queries: usize,
}

impl FakeState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn insert(&mut self, entry: &NewEntry) -> Result<i64, StoreError> {
        if self.racing_guids.remove(&entry.guid)
            || self
                .entries
                .iter()
                .any(|e| e.entry.feed_id == entry.feed_id && e.entry.guid == entry.guid)
        {
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
        let end = day_start + Duration::seconds(86_399);
        self.entries
            .iter()
            .filter(|e| e.entry.feed_id == feed_id)
            .filter(|e| e.entry.date >= day_start && e.entry.date <= end)
            .count() as u64
    }
}

pub(crate) struct FakeStore {
    state: Mutex<FakeState>,
}

impl FakeStore {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Pretend `guid` was stored by an earlier cycle
    pub(crate) fn seed(&self, feed_id: i64, guid: &str, date: OffsetDateTime) {
        let entry = NewEntry {
            guid: guid.to_string(),
            link: guid.to_string(),
            title: format!("seeded {}", guid),
            author: String::new(),
            content: String::new(),
            date,
            favorite: false,
            read: false,
            feed_id,
        };
        self.state.lock().unwrap().insert(&entry).unwrap();
    }

    pub(crate) fn race_entry(&self, guid: &str) {
        self.state
            .lock()
            .unwrap()
            .racing_guids
            .insert(guid.to_string());
    }

    pub(crate) fn race_category(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .racing_categories
            .insert(name.to_string());
    }

    pub(crate) fn entries(&self) -> Vec<StoredEntry> {
        self.state.lock().unwrap().entries.clone()
    }

    pub(crate) fn guids(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.entry.guid).collect()
    }

    pub(crate) fn feed_count(&self) -> usize {
        self.state.lock().unwrap().feeds.len()
    }

    pub(crate) fn category_count(&self) -> usize {
        self.state.lock().unwrap().categories.len()
    }

    pub(crate) fn existing_queries(&self) -> usize {
        self.state.lock().unwrap().existing_queries
    }
}

#[async_trait]
impl EntryStore for FakeStore {
    async fn existing_guids(&self, guids: &[String]) -> Result<HashSet<String>, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.existing_queries += 1;
        Ok(guids
            .iter()
            .filter(|g| state.entries.iter().any(|e| &e.entry.guid == *g))
            .cloned()
            .collect())
    }

    async fn insert_entry(&self, entry: &NewEntry) -> Result<i64, StoreError> {
        self.state.lock().unwrap().insert(entry)
    }

    async fn insert_entry_with_date_offset(
        &self,
        entry: &NewEntry,
    ) -> Result<CommittedEntry, StoreError> {
        let mut state = self.state.lock().unwrap();
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
        Ok(self.state.lock().unwrap().count_on_day(feed_id, day_start))
    }

    async fn category_id_for_name(&self, name: &str) -> Result<Option<i64>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .categories
            .iter()
            .find(|(_, n)| n == name)
            .map(|(id, _)| *id))
    }

    async fn insert_category(&self, name: &str) -> Result<i64, StoreError> {
        let mut state = self.state.lock().unwrap();
        let raced = state.racing_categories.remove(name);
        if raced || state.categories.iter().any(|(_, n)| n == name) {
            if raced {
                let id = state.next_id();
                state.categories.push((id, name.to_string()));
            }
            return Err(StoreError::Duplicate(name.to_string()));
        }
        let id = state.next_id();
        state.categories.push((id, name.to_string()));
        Ok(id)
    }

    async fn feed_id_for_url(&self, url: &str) -> Result<Option<i64>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .feeds
            .iter()
            .find(|(_, f, _)| f.url == url)
            .map(|(id, _, _)| *id))
    }

    async fn insert_feed(&self, feed: &FeedSpec, category_id: i64) -> Result<i64, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.feeds.iter().any(|(_, f, _)| f.url == feed.url) {
            return Err(StoreError::Duplicate(feed.url.clone()));
        }
        let id = state.next_id();
        state.feeds.push((id, feed.clone(), category_id));
        Ok(id)
    }
}

pub(crate) fn games_feed(url: &str) -> FeedSpec {
    FeedSpec {
        name: "Test Feed".to_string(),
        priority: crate::model::PRIORITY_MAIN_STREAM,
        url: url.to_string(),
        website: url.to_string(),
        category: crate::model::GAMES_CATEGORY.to_string(),
    }
}
