//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the ingestion core and the
//! outside world. Adapters implement them for real HTTP sources and stores.

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{
    CommittedEntry, EntryDraft, FeedSpec, IngestReport, NewEntry, PagedItem, RawListItem,
};

/// Error type for store gateway operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    /// A natural-key uniqueness constraint rejected the write
    #[error("Duplicate key: {0}")]
    Duplicate(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Port for the persistent entry store
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Return the subset of `guids` that is already persisted
    async fn existing_guids(&self, guids: &[String]) -> Result<HashSet<String>, StoreError>;

    /// Insert an entry as-is, returning its assigned id
    async fn insert_entry(&self, entry: &NewEntry) -> Result<i64, StoreError>;

    /// Atomically count the feed's entries on the entry's day and insert the
    /// entry with its date advanced by that many seconds
    async fn insert_entry_with_date_offset(
        &self,
        entry: &NewEntry,
    ) -> Result<CommittedEntry, StoreError>;

    /// Count entries of a feed dated within `[day_start, day_start + 23:59:59]`
    async fn count_entries_for_feed_on_day(
        &self,
        feed_id: i64,
        day_start: OffsetDateTime,
    ) -> Result<u64, StoreError>;

    async fn category_id_for_name(&self, name: &str) -> Result<Option<i64>, StoreError>;

    async fn insert_category(&self, name: &str) -> Result<i64, StoreError>;

    async fn feed_id_for_url(&self, url: &str) -> Result<Option<i64>, StoreError>;

    async fn insert_feed(&self, feed: &FeedSpec, category_id: i64) -> Result<i64, StoreError>;
}

/// Error type for upstream source operations
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },
    #[error("Decode error: {0}")]
    Decode(String),
    /// The upstream markup or payload no longer has the expected shape
    #[error("Invalid content format: {0}")]
    Format(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
}

/// Port for a source that publishes one listing page plus a detail page per item
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Feed this source fills
    fn feed(&self) -> &FeedSpec;

    /// Stable identifier of a listing item
    fn guid_for(&self, item: &RawListItem) -> String;

    /// Scrape the listing, newest first
    async fn fetch_listing(&self) -> Result<Vec<RawListItem>, SourceError>;

    /// Fetch the item's detail page and build the full article
    async fn resolve(&self, item: &RawListItem) -> Result<EntryDraft, SourceError>;
}

/// Port for a source that publishes a paginated listing, newest first
#[async_trait]
pub trait PagedSource: Send + Sync {
    /// Feed this source fills
    fn feed(&self) -> &FeedSpec;

    /// Number of items requested per page
    fn page_size(&self) -> u32;

    /// Fetch one page (1-based); an empty page means the listing is exhausted
    async fn fetch_page(&self, page_num: u32) -> Result<Vec<PagedItem>, SourceError>;

    /// Fetch the rendered body of an item
    async fn fetch_content(&self, item: &PagedItem) -> Result<String, SourceError>;
}

/// Error type for a whole ingest cycle
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

/// One schedulable ingest job (one per source)
#[async_trait]
pub trait Ingest: Send + Sync {
    /// Name used in logs and reports
    fn name(&self) -> &str;

    /// Run one full fetch-and-commit cycle
    async fn run(&self) -> Result<IngestReport, IngestError>;
}
