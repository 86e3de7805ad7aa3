//! SQLite entry store implementation

use async_trait::async_trait;
use onion_reader_domain::{
    CommittedEntry, EntryStore, FeedSpec, NewEntry, StoreError, StoredEntry,
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::collections::HashSet;
use std::path::Path;
use time::OffsetDateTime;

/// Seconds from a day's start to its last second
const DAY_SPAN_SECS: i64 = 86_399;

/// Bound on placeholders per `IN (...)` lookup
const GUID_CHUNK: usize = 500;

type EntryRow = (i64, i64, String, String, String, String, String, i64, bool, bool);

/// SQLite-backed entry store
pub struct SqliteEntryStore {
    pool: SqlitePool,
}

impl SqliteEntryStore {
    /// Open (or create) the database at `db_path` and run migrations
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Database(format!("Failed to create directory: {}", e)))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(map_db_error)?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub async fn in_memory() -> Result<Self, StoreError> {
        // The database lives as long as its only connection
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(map_db_error)?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feeds (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                priority INTEGER NOT NULL,
                url TEXT NOT NULL UNIQUE,
                website TEXT NOT NULL,
                category_id INTEGER NOT NULL REFERENCES categories(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                feed_id INTEGER NOT NULL REFERENCES feeds(id),
                guid TEXT NOT NULL,
                link TEXT NOT NULL,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                content TEXT NOT NULL,
                date INTEGER NOT NULL,
                favorite INTEGER NOT NULL DEFAULT 0,
                read INTEGER NOT NULL DEFAULT 0,
                UNIQUE(feed_id, guid)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_feed_date ON entries(feed_id, date)")
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_guid ON entries(guid)")
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(())
    }

    /// Entries of one feed, in insertion order
    pub async fn entries_for_feed(&self, feed_id: i64) -> Result<Vec<StoredEntry>, StoreError> {
        let rows: Vec<EntryRow> = sqlx::query_as(
            r#"
            SELECT id, feed_id, guid, link, title, author, content, date, favorite, read
            FROM entries
            WHERE feed_id = ?
            ORDER BY id
            "#,
        )
        .bind(feed_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(stored_entry_from_row).collect()
    }
}

fn map_db_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Duplicate(db.message().to_string())
        }
        _ => StoreError::Database(e.to_string()),
    }
}

fn from_unix(secs: i64) -> Result<OffsetDateTime, StoreError> {
    OffsetDateTime::from_unix_timestamp(secs).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn stored_entry_from_row(row: EntryRow) -> Result<StoredEntry, StoreError> {
    let (id, feed_id, guid, link, title, author, content, date, favorite, read) = row;
    Ok(StoredEntry {
        id,
        entry: NewEntry {
            guid,
            link,
            title,
            author,
            content,
            date: from_unix(date)?,
            favorite,
            read,
            feed_id,
        },
    })
}

#[async_trait]
impl EntryStore for SqliteEntryStore {
    async fn existing_guids(&self, guids: &[String]) -> Result<HashSet<String>, StoreError> {
        let mut existing = HashSet::new();

        for chunk in guids.chunks(GUID_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT DISTINCT guid FROM entries WHERE guid IN ({})",
                placeholders
            );

            let mut query = sqlx::query_as::<_, (String,)>(&sql);
            for guid in chunk {
                query = query.bind(guid);
            }

            let rows = query.fetch_all(&self.pool).await.map_err(map_db_error)?;
            existing.extend(rows.into_iter().map(|(guid,)| guid));
        }

        Ok(existing)
    }

    async fn insert_entry(&self, entry: &NewEntry) -> Result<i64, StoreError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO entries
            (feed_id, guid, link, title, author, content, date, favorite, read)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(entry.feed_id)
        .bind(&entry.guid)
        .bind(&entry.link)
        .bind(&entry.title)
        .bind(&entry.author)
        .bind(&entry.content)
        .bind(entry.date.unix_timestamp())
        .bind(entry.favorite)
        .bind(entry.read)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(id)
    }

    async fn insert_entry_with_date_offset(
        &self,
        entry: &NewEntry,
    ) -> Result<CommittedEntry, StoreError> {
        let day_start = entry.date.unix_timestamp();

        // Count and insert run as one statement, so concurrent writers of the
        // same feed and day serialize on the database write lock.
        let (id, date): (i64, i64) = sqlx::query_as(
            r#"
            INSERT INTO entries
            (feed_id, guid, link, title, author, content, date, favorite, read)
            SELECT ?, ?, ?, ?, ?, ?,
                ? + (SELECT COUNT(*) FROM entries
                     WHERE feed_id = ? AND date BETWEEN ? AND ?),
                ?, ?
            RETURNING id, date
            "#,
        )
        .bind(entry.feed_id)
        .bind(&entry.guid)
        .bind(&entry.link)
        .bind(&entry.title)
        .bind(&entry.author)
        .bind(&entry.content)
        .bind(day_start)
        .bind(entry.feed_id)
        .bind(day_start)
        .bind(day_start + DAY_SPAN_SECS)
        .bind(entry.favorite)
        .bind(entry.read)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(CommittedEntry {
            id,
            date: from_unix(date)?,
        })
    }

    async fn count_entries_for_feed_on_day(
        &self,
        feed_id: i64,
        day_start: OffsetDateTime,
    ) -> Result<u64, StoreError> {
        let start = day_start.unix_timestamp();
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM entries WHERE feed_id = ? AND date BETWEEN ? AND ?",
        )
        .bind(feed_id)
        .bind(start)
        .bind(start + DAY_SPAN_SECS)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(count as u64)
    }

    async fn category_id_for_name(&self, name: &str) -> Result<Option<i64>, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM categories WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(row.map(|(id,)| id))
    }

    async fn insert_category(&self, name: &str) -> Result<i64, StoreError> {
        let (id,): (i64,) = sqlx::query_as("INSERT INTO categories (name) VALUES (?) RETURNING id")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(id)
    }

    async fn feed_id_for_url(&self, url: &str) -> Result<Option<i64>, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM feeds WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(row.map(|(id,)| id))
    }

    async fn insert_feed(&self, feed: &FeedSpec, category_id: i64) -> Result<i64, StoreError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO feeds (name, priority, url, website, category_id)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&feed.name)
        .bind(feed.priority)
        .bind(&feed.url)
        .bind(&feed.website)
        .bind(category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(id)
    }
}
