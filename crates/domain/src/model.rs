//! Domain models and value objects

use time::OffsetDateTime;

/// Feed priority reading clients rank main-stream feeds with
pub const PRIORITY_MAIN_STREAM: i8 = 10;

/// Category every bundled game news feed is filed under
pub const GAMES_CATEGORY: &str = "Games";

/// Description of a feed, registered lazily the first time its source runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSpec {
    /// Display name
    pub name: String,
    /// Ranking priority (see `PRIORITY_MAIN_STREAM`)
    pub priority: i8,
    /// Source URL, the natural key of a feed
    pub url: String,
    /// Human-facing website
    pub website: String,
    /// Category name, the natural key of a category
    pub category: String,
}

/// Fields scraped from one listing item before its detail page is resolved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawListItem {
    /// Source-local article identifier taken from the item link
    pub id: String,
    /// Date exactly as printed on the listing
    pub date: String,
    /// Category/tag label as printed on the listing
    pub category: String,
    /// Article title
    pub title: String,
}

/// One item of a paginated listing; content is resolved separately
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedItem {
    pub guid: String,
    pub link: String,
    pub title: String,
    pub author: String,
    pub date: OffsetDateTime,
}

impl PagedItem {
    pub fn with_content(self, content: String) -> EntryDraft {
        EntryDraft {
            guid: self.guid,
            link: self.link,
            title: self.title,
            author: self.author,
            content,
            date: self.date,
        }
    }
}

/// A fully resolved article that is not yet attached to a feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    pub guid: String,
    pub link: String,
    pub title: String,
    pub author: String,
    /// Rendered body, markup preserved
    pub content: String,
    /// Publication time, normalized to UTC
    pub date: OffsetDateTime,
}

impl EntryDraft {
    /// Attach the draft to its owning feed, producing the canonical entry
    pub fn into_entry(self, feed_id: i64) -> NewEntry {
        NewEntry {
            guid: self.guid,
            link: self.link,
            title: self.title,
            author: self.author,
            content: self.content,
            date: self.date,
            favorite: false,
            read: false,
            feed_id,
        }
    }
}

/// Canonical entry as submitted to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    /// Stable source-derived identifier, the idempotency key
    pub guid: String,
    pub link: String,
    pub title: String,
    pub author: String,
    pub content: String,
    pub date: OffsetDateTime,
    pub favorite: bool,
    pub read: bool,
    pub feed_id: i64,
}

/// Canonical entry as persisted, with its storage-assigned id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub id: i64,
    pub entry: NewEntry,
}

/// Result of a committed insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommittedEntry {
    pub id: i64,
    /// Timestamp actually stored, after any same-day offset
    pub date: OffsetDateTime,
}

/// Summary of one ingest cycle for a single source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Listing pages requested
    pub pages: u32,
    /// Items seen on the listing(s), after local dedup
    pub seen: usize,
    /// Entries newly committed
    pub inserted: usize,
    /// Items skipped because they were already stored
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_into_entry_starts_unread_and_unfavorited() {
        let draft = EntryDraft {
            guid: "g".to_string(),
            link: "l".to_string(),
            title: "t".to_string(),
            author: "a".to_string(),
            content: "<p>c</p>".to_string(),
            date: datetime!(2021-03-01 0:00 UTC),
        };

        let entry = draft.into_entry(7);

        assert_eq!(entry.feed_id, 7);
        assert!(!entry.read);
        assert!(!entry.favorite);
        assert_eq!(entry.content, "<p>c</p>");
    }

    #[test]
    fn test_paged_item_with_content_keeps_identity() {
        let item = PagedItem {
            guid: "https://example.com/news/1".to_string(),
            link: "https://example.com/news/1".to_string(),
            title: "Patch notes".to_string(),
            author: "staff".to_string(),
            date: datetime!(2021-03-01 10:00 UTC),
        };

        let draft = item.clone().with_content("body".to_string());

        assert_eq!(draft.guid, item.guid);
        assert_eq!(draft.date, item.date);
        assert_eq!(draft.content, "body");
    }
}
