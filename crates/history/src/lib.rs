//! Persistent scan-history store: past scans and fingerprint
//! first-sightings, backed by a single SQLite file.

mod error;
mod store;

pub use error::HistoryError;
pub use store::{HistoryStats, HistoryStore};
