//! Lazy get-or-create registration of categories and feeds

use crate::model::FeedSpec;
use crate::ports::{EntryStore, StoreError};

/// Look up a category by name, creating it if absent.
///
/// A concurrent writer may create the same category between the lookup and the
/// insert; the resulting uniqueness violation is resolved by re-reading.
pub async fn ensure_category<St>(store: &St, name: &str) -> Result<i64, StoreError>
where
    St: EntryStore + ?Sized,
{
    if let Some(id) = store.category_id_for_name(name).await? {
        return Ok(id);
    }

    match store.insert_category(name).await {
        Ok(id) => {
            tracing::info!(category = %name, id, "Registered category");
            Ok(id)
        }
        Err(StoreError::Duplicate(_)) => {
            tracing::debug!(category = %name, "Category created concurrently, re-reading");
            store
                .category_id_for_name(name)
                .await?
                .ok_or_else(|| StoreError::Database(format!("category {} vanished", name)))
        }
        Err(e) => Err(e),
    }
}

/// Look up a feed by URL, creating it (and its category) if absent
pub async fn ensure_feed<St>(store: &St, feed: &FeedSpec) -> Result<i64, StoreError>
where
    St: EntryStore + ?Sized,
{
    let category_id = ensure_category(store, &feed.category).await?;

    if let Some(id) = store.feed_id_for_url(&feed.url).await? {
        return Ok(id);
    }

    match store.insert_feed(feed, category_id).await {
        Ok(id) => {
            tracing::info!(feed = %feed.name, url = %feed.url, id, "Registered feed");
            Ok(id)
        }
        Err(StoreError::Duplicate(_)) => store
            .feed_id_for_url(&feed.url)
            .await?
            .ok_or_else(|| StoreError::Database(format!("feed {} vanished", feed.url))),
        Err(e) => Err(e),
    }
}
