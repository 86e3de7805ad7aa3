//! onion-reader domain crate
//!
//! This crate contains the core ingestion logic following hexagonal architecture:
//! - `model`: Canonical entries, feed descriptions and transient list items
//! - `ports`: Trait definitions for the store gateway and the upstream sources
//! - `usecases`: Registration, dedup/commit, the two ingest algorithms and the supervisor

pub mod model;
pub mod ports;
pub mod usecases;

#[cfg(test)]
pub(crate) mod fakes;

pub use model::*;
pub use ports::*;
