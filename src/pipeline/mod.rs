//! Pipeline entry points for ingestion.
//!
//! - `SyncCoordinator`: one fetch → parse → persist run at a time
//! - `SyncScheduler`: startup and cron triggers for the coordinator
//! - `seed_store`: one-time bulk load from the export file

pub mod schedule;
pub mod sync;

use std::path::Path;

use crate::error::Result;
use crate::storage::{DrawStore, SeedOutcome, seed};

pub use schedule::{CronTrigger, SyncScheduler};
pub use sync::{FetchMode, LastRun, SyncCoordinator, SyncOutcome, SyncReport, SyncStage, SyncState};

/// Seed the store from the export file unless it has already been seeded.
///
/// The file is not read at all once the store is marked as seeded.
pub async fn seed_store(store: &dyn DrawStore, path: &Path) -> Result<SeedOutcome> {
    if store.is_seeded().await? {
        log::info!("Store already seeded; skipping {}", path.display());
        return Ok(SeedOutcome::AlreadySeeded);
    }

    let (records, _rejected) = seed::load_seed_records(path)?;
    let outcome = store.seed_from_bulk_source(records).await?;
    if let SeedOutcome::Seeded(stats) = outcome {
        log::info!(
            "Seeded store: {} inserted, {} updated, {} skipped",
            stats.inserted,
            stats.updated,
            stats.skipped
        );
    }
    Ok(outcome)
}
