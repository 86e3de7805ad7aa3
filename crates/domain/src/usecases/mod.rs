//! Application use cases / business logic

pub mod commit;
pub mod listing_ingest;
pub mod paged_ingest;
pub mod registration;
pub mod supervisor;

pub use commit::{CommitOutcome, DateMode, PagePlan, commit_entry, dedup_first_seen};
pub use listing_ingest::ListingIngest;
pub use paged_ingest::PagedIngest;
pub use registration::{ensure_category, ensure_feed};
pub use supervisor::{CycleOutcome, CycleReport, Supervisor, SupervisorConfig};
