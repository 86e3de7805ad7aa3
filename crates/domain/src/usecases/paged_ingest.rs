//! Ingest cycle for paginated, newest-first sources

use std::sync::Arc;

use async_trait::async_trait;

use crate::model::IngestReport;
use crate::ports::{EntryStore, Ingest, IngestError, PagedSource};
use crate::usecases::commit::{CommitOutcome, DateMode, PagePlan, commit_entry, dedup_first_seen};
use crate::usecases::registration::ensure_feed;

/// Walks pages from the newest until it reaches content that is already
/// stored, committing new items in page order.
pub struct PagedIngest<S, St>
where
    S: PagedSource + ?Sized,
    St: EntryStore + ?Sized,
{
    source: Arc<S>,
    store: Arc<St>,
    max_pages: Option<u32>,
}

impl<S, St> PagedIngest<S, St>
where
    S: PagedSource + ?Sized,
    St: EntryStore + ?Sized,
{
    pub fn new(source: Arc<S>, store: Arc<St>) -> Self {
        Self {
            source,
            store,
            max_pages: None,
        }
    }

    /// Stop after `max_pages` pages even if no stop condition was reached
    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub async fn ingest(&self) -> Result<IngestReport, IngestError> {
        let feed = self.source.feed();
        let feed_id = ensure_feed(self.store.as_ref(), feed).await?;
        let page_size = self.source.page_size();

        let mut report = IngestReport::default();
        let mut page_num = 1;

        loop {
            if self.max_pages.is_some_and(|max| page_num > max) {
                tracing::warn!(feed = %feed.name, pages = report.pages, "Page limit reached");
                break;
            }

            tracing::info!(feed = %feed.name, page = page_num, size = page_size, "Fetch");

            let items = self.source.fetch_page(page_num).await?;
            report.pages += 1;
            if items.is_empty() {
                break;
            }

            let items = dedup_first_seen(items, |item| item.guid.clone());
            report.seen += items.len();

            let guids: Vec<String> = items.iter().map(|i| i.guid.clone()).collect();
            let existing = self.store.existing_guids(&guids).await?;
            let plan = PagePlan::classify(&guids, &existing);
            report.skipped += items.len() - plan.fresh.len();

            for idx in plan.fresh {
                let item = &items[idx];
                let content = self.source.fetch_content(item).await?;
                let entry = item.clone().with_content(content).into_entry(feed_id);
                match commit_entry(self.store.as_ref(), &entry, DateMode::Exact).await? {
                    CommitOutcome::Inserted(_) => report.inserted += 1,
                    CommitOutcome::AlreadyStored => report.skipped += 1,
                }
            }

            if plan.stop {
                break;
            }
            page_num += 1;
        }

        tracing::info!(
            feed = %feed.name,
            pages = report.pages,
            inserted = report.inserted,
            skipped = report.skipped,
            "Fetch complete"
        );

        Ok(report)
    }
}

#[async_trait]
impl<S, St> Ingest for PagedIngest<S, St>
where
    S: PagedSource + ?Sized,
    St: EntryStore + ?Sized,
{
    fn name(&self) -> &str {
        &self.source.feed().name
    }

    async fn run(&self) -> Result<IngestReport, IngestError> {
        self.ingest().await
    }
}
