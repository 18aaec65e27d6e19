//! Storage abstractions for draw result persistence.
//!
//! The store owns two tables:
//!
//! ```text
//! draw_results   one row per (game_type, draw_date), latest values win
//! meta           key/value markers ("seeded")
//! ```
//!
//! The most recent stored draw date doubles as the incremental sync cursor.

pub mod seed;
pub mod sqlite;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

use crate::error::StoreError;
use crate::models::DrawRecord;

// Re-export for convenience
pub use sqlite::SqliteStore;

/// Result alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Per-batch write counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertStats {
    /// Records whose key was new
    pub inserted: usize,
    /// Records that overwrote an existing key
    pub updated: usize,
    /// Records whose statement failed; the rest of the batch still committed
    pub skipped: usize,
}

impl UpsertStats {
    pub fn written(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Outcome of a gated bulk seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Seeded(UpsertStats),
    AlreadySeeded,
}

/// Filter for result listings. Both date bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFilter {
    pub game_type: Option<String>,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Trait for draw result storage backends.
#[async_trait]
pub trait DrawStore: Send + Sync {
    /// Most recent stored draw date, `None` when the store is empty.
    async fn latest_draw_date(&self) -> StoreResult<Option<NaiveDate>>;

    /// Insert new keys and overwrite existing ones in a single transaction.
    ///
    /// A failing record is logged and counted as skipped. Only a failure to
    /// open or commit the transaction aborts the batch.
    async fn upsert_batch(&self, records: Vec<DrawRecord>) -> StoreResult<UpsertStats>;

    /// Same as [`upsert_batch`](Self::upsert_batch), but only ever applied
    /// once; the seeded marker commits with the records.
    async fn seed_from_bulk_source(&self, records: Vec<DrawRecord>) -> StoreResult<SeedOutcome>;

    /// Whether the bulk seed has been applied.
    async fn is_seeded(&self) -> StoreResult<bool>;

    /// Stored draws matching the filter, newest first.
    async fn list_results(&self, filter: &ResultFilter) -> StoreResult<Vec<DrawRecord>>;

    /// Occurrence count of each drawn number for one game over a date window.
    async fn number_frequency(
        &self,
        game_type: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<BTreeMap<u32, u64>>;

    /// Game types with more than `min_draws` stored draws, sorted.
    async fn game_types(&self, min_draws: u32) -> StoreResult<Vec<String>>;
}
