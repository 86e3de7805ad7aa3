//! Ingest cycle for listing + detail page sources

use std::sync::Arc;

use async_trait::async_trait;

use crate::model::{IngestReport, NewEntry};
use crate::ports::{EntryStore, Ingest, IngestError, ListingSource};
use crate::usecases::commit::{CommitOutcome, DateMode, commit_entry, dedup_first_seen};
use crate::usecases::registration::ensure_feed;

/// Fetches a newest-first listing, resolves the items not stored yet and
/// commits them oldest first with same-day date offsets.
pub struct ListingIngest<S, St>
where
    S: ListingSource + ?Sized,
    St: EntryStore + ?Sized,
{
    source: Arc<S>,
    store: Arc<St>,
}

impl<S, St> ListingIngest<S, St>
where
    S: ListingSource + ?Sized,
    St: EntryStore + ?Sized,
{
    pub fn new(source: Arc<S>, store: Arc<St>) -> Self {
        Self { source, store }
    }

    /// Run one cycle.
    ///
    /// Every candidate is resolved before anything is committed, so a detail
    /// page in an unexpected format aborts the cycle with nothing written.
    pub async fn ingest(&self) -> Result<IngestReport, IngestError> {
        let feed = self.source.feed();
        let feed_id = ensure_feed(self.store.as_ref(), feed).await?;

        tracing::info!(feed = %feed.name, "Fetch");

        let items = self.source.fetch_listing().await?;
        let items = dedup_first_seen(items, |item| item.id.clone());

        let mut report = IngestReport {
            pages: 1,
            seen: items.len(),
            ..IngestReport::default()
        };

        if items.is_empty() {
            return Ok(report);
        }

        let guids: Vec<String> = items.iter().map(|i| self.source.guid_for(i)).collect();
        let existing = self.store.existing_guids(&guids).await?;
        report.skipped = existing.len();

        if existing.len() == guids.len() {
            tracing::debug!(feed = %feed.name, "Listing fully ingested");
            return Ok(report);
        }

        let mut pending: Vec<NewEntry> = Vec::with_capacity(guids.len() - existing.len());
        for (item, guid) in items.iter().zip(&guids).rev() {
            if existing.contains(guid) {
                continue;
            }
            let draft = self.source.resolve(item).await?;
            pending.push(draft.into_entry(feed_id));
        }

        for entry in &pending {
            match commit_entry(self.store.as_ref(), entry, DateMode::OffsetBySameDay).await? {
                CommitOutcome::Inserted(_) => report.inserted += 1,
                CommitOutcome::AlreadyStored => report.skipped += 1,
            }
        }

        tracing::info!(
            feed = %feed.name,
            inserted = report.inserted,
            skipped = report.skipped,
            "Fetch complete"
        );

        Ok(report)
    }
}

#[async_trait]
impl<S, St> Ingest for ListingIngest<S, St>
where
    S: ListingSource + ?Sized,
    St: EntryStore + ?Sized,
{
    fn name(&self) -> &str {
        &self.source.feed().name
    }

    async fn run(&self) -> Result<IngestReport, IngestError> {
        self.ingest().await
    }
}
