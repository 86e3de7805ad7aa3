//! onion-reader adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `sources`: the bundled upstream news sources (HTML and JSON)
//! - `store`: SQLite and in-memory entry stores
//! - `extract`: helpers for article bodies embedded in inline scripts

mod embedded;
mod html_tokens;
mod http;
mod store_memory;
mod store_sqlite;

pub mod sources;

/// Re-exports for store adapters
pub mod store {
    pub use crate::store_memory::InMemoryEntryStore;
    pub use crate::store_sqlite::SqliteEntryStore;
}

/// Re-exports for content extraction helpers
pub mod extract {
    pub use crate::embedded::{extract_embedded_content, unescape_unicode};
}
