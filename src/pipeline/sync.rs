// src/pipeline/sync.rs

//! Sync coordinator.
//!
//! One run walks `Deciding → Fetching → Parsing → Persisting` and returns to
//! `Idle`. A failing stage passes through `Failed` on the way back, and a run
//! dropped mid-stage is reset to `Idle` as well. Only the final upsert writes
//! anything, so a run that fails before it leaves the store as it was.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::models::ScheduleConfig;
use crate::services::{DrawSource, parser};
use crate::storage::{DrawStore, UpsertStats};

/// Retrieval mode chosen from the store's latest draw date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FetchMode {
    /// Store is empty; nothing is fetched until it has been seeded.
    AwaitingSeed,
    /// Store is current; re-read today's page to pick up late results.
    LatestDay,
    /// Store is behind; fetch `from..=to`.
    Range { from: NaiveDate, to: NaiveDate },
}

impl FetchMode {
    pub fn decide(latest: Option<NaiveDate>, today: NaiveDate) -> Self {
        match latest {
            None => Self::AwaitingSeed,
            Some(latest) if latest >= today => Self::LatestDay,
            // The latest stored day is fetched again to pick up corrections.
            Some(latest) => Self::Range {
                from: latest,
                to: today,
            },
        }
    }
}

/// Coordinator state, exposed for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Deciding,
    Fetching,
    Parsing,
    Persisting,
    Failed,
}

/// Stage at which a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    Deciding,
    Fetching,
    Persisting,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Deciding => "deciding",
            Self::Fetching => "fetching",
            Self::Persisting => "persisting",
        };
        f.write_str(name)
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    #[serde(flatten)]
    pub mode: FetchMode,
    pub rows_fetched: usize,
    pub rows_rejected: usize,
    #[serde(flatten)]
    pub stats: UpsertStats,
}

/// Result of a single trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    Completed(SyncReport),
    AwaitingSeed,
    /// Another run was already in flight; this trigger was dropped.
    Busy,
    Failed { stage: SyncStage, error: String },
}

/// The most recent finished run.
#[derive(Debug, Clone, Serialize)]
pub struct LastRun {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub today: NaiveDate,
    pub outcome: SyncOutcome,
}

/// Runs the fetch → parse → persist pipeline, one run at a time.
pub struct SyncCoordinator {
    store: Arc<dyn DrawStore>,
    source: Arc<dyn DrawSource>,
    schedule: ScheduleConfig,
    run_lock: tokio::sync::Mutex<()>,
    state: Mutex<SyncState>,
    last_run: Mutex<Option<LastRun>>,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn DrawStore>,
        source: Arc<dyn DrawSource>,
        schedule: ScheduleConfig,
    ) -> Self {
        Self {
            store,
            source,
            schedule,
            run_lock: tokio::sync::Mutex::new(()),
            state: Mutex::new(SyncState::Idle),
            last_run: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SyncState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn last_run(&self) -> Option<LastRun> {
        self.last_run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run once for the current date on the remote system's calendar.
    pub async fn run(&self) -> SyncOutcome {
        self.run_on(self.schedule.today()).await
    }

    /// Run once, treating `today` as the current date.
    pub async fn run_on(&self, today: NaiveDate) -> SyncOutcome {
        let Ok(_guard) = self.run_lock.try_lock() else {
            log::warn!("Sync already in progress; trigger dropped");
            return SyncOutcome::Busy;
        };

        let started_at = Utc::now();
        let mut run = RunGuard {
            coordinator: self,
            finished: false,
        };
        let outcome = self.execute(today).await;
        run.finished = true;
        drop(run);

        match &outcome {
            SyncOutcome::Completed(report) => log::info!(
                "Sync complete: {} rows fetched, {} rejected, {} inserted, {} updated, {} skipped",
                report.rows_fetched,
                report.rows_rejected,
                report.stats.inserted,
                report.stats.updated,
                report.stats.skipped
            ),
            SyncOutcome::AwaitingSeed => {
                log::warn!("Store is empty; seed it before syncing")
            }
            SyncOutcome::Failed { stage, error } => {
                log::error!("Sync failed while {stage}: {error}")
            }
            SyncOutcome::Busy => {}
        }

        *self.last_run.lock().unwrap_or_else(PoisonError::into_inner) = Some(LastRun {
            started_at,
            finished_at: Utc::now(),
            today,
            outcome: outcome.clone(),
        });
        outcome
    }

    async fn execute(&self, today: NaiveDate) -> SyncOutcome {
        self.set_state(SyncState::Deciding);
        let latest = match self.store.latest_draw_date().await {
            Ok(latest) => latest,
            Err(e) => return self.fail(SyncStage::Deciding, e),
        };

        let mode = FetchMode::decide(latest, today);
        log::info!("Latest stored draw {latest:?}, today {today}: {mode:?}");

        let fetched = match mode {
            FetchMode::AwaitingSeed => return SyncOutcome::AwaitingSeed,
            FetchMode::LatestDay => {
                self.set_state(SyncState::Fetching);
                self.source.fetch_latest_day().await
            }
            FetchMode::Range { from, to } => {
                self.set_state(SyncState::Fetching);
                self.source.fetch_range(from, to).await
            }
        };
        let rows = match fetched {
            Ok(rows) => rows,
            Err(e) => return self.fail(SyncStage::Fetching, e),
        };

        self.set_state(SyncState::Parsing);
        let (records, rows_rejected) = parser::parse_all(&rows);

        self.set_state(SyncState::Persisting);
        let stats = match self.store.upsert_batch(records).await {
            Ok(stats) => stats,
            Err(e) => return self.fail(SyncStage::Persisting, e),
        };

        SyncOutcome::Completed(SyncReport {
            mode,
            rows_fetched: rows.len(),
            rows_rejected,
            stats,
        })
    }

    fn fail(&self, stage: SyncStage, error: impl fmt::Display) -> SyncOutcome {
        self.set_state(SyncState::Failed);
        SyncOutcome::Failed {
            stage,
            error: error.to_string(),
        }
    }

    fn set_state(&self, next: SyncState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != next {
            log::debug!("Sync state {:?} -> {:?}", *state, next);
            *state = next;
        }
    }
}

/// Puts the coordinator back to `Idle` when a run ends, including a run whose
/// future is dropped part-way through a stage.
struct RunGuard<'a> {
    coordinator: &'a SyncCoordinator,
    finished: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!(
                "Sync run abandoned while {:?}",
                self.coordinator.state()
            );
        }
        self.coordinator.set_state(SyncState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use tokio::sync::Notify;

    use super::*;
    use crate::error::{FetchError, StoreError};
    use crate::models::{DrawRecord, RawRow};
    use crate::storage::{ResultFilter, SeedOutcome, SqliteStore, StoreResult};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[derive(Default)]
    struct FakeSource {
        rows: Vec<RawRow>,
        fail: bool,
        calls: Mutex<Vec<String>>,
        gate: Option<(Notify, Notify)>,
    }

    impl FakeSource {
        fn with_rows(rows: Vec<RawRow>) -> Self {
            Self {
                rows,
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        async fn respond(&self, call: String) -> Result<Vec<RawRow>, FetchError> {
            self.calls.lock().unwrap().push(call);
            if let Some((entered, release)) = &self.gate {
                entered.notify_one();
                release.notified().await;
            }
            if self.fail {
                return Err(FetchError::Unavailable("connection reset".into()));
            }
            Ok(self.rows.clone())
        }
    }

    #[async_trait]
    impl DrawSource for FakeSource {
        async fn fetch_latest_day(&self) -> Result<Vec<RawRow>, FetchError> {
            self.respond("latest".into()).await
        }

        async fn fetch_range(
            &self,
            from: NaiveDate,
            to: NaiveDate,
        ) -> Result<Vec<RawRow>, FetchError> {
            self.respond(format!("range {from}..={to}")).await
        }
    }

    fn valid_row(game: &str, date: &str) -> RawRow {
        RawRow::new([game, "1-2-3-4-5-6", date, "1,000,000.00", "0"])
    }

    async fn store_with_latest(date: NaiveDate) -> Arc<SqliteStore> {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        store
            .upsert_batch(vec![DrawRecord {
                game_type: "6/49".into(),
                draw_date: date,
                jackpot: Decimal::ONE,
                winners: 0,
                numbers: [Some(1), Some(2), Some(3), Some(4), Some(5), Some(6)],
            }])
            .await
            .unwrap();
        store
    }

    /// Store whose cursor read or batch write fails on demand.
    struct BrokenStore {
        latest: Option<NaiveDate>,
        fail_reads: bool,
        writes: Mutex<usize>,
    }

    impl BrokenStore {
        fn failing_writes(latest: NaiveDate) -> Self {
            Self {
                latest: Some(latest),
                fail_reads: false,
                writes: Mutex::new(0),
            }
        }

        fn failing_reads() -> Self {
            Self {
                latest: None,
                fail_reads: true,
                writes: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl DrawStore for BrokenStore {
        async fn latest_draw_date(&self) -> StoreResult<Option<NaiveDate>> {
            if self.fail_reads {
                return Err(StoreError::query("database is locked"));
            }
            Ok(self.latest)
        }

        async fn upsert_batch(&self, _records: Vec<DrawRecord>) -> StoreResult<UpsertStats> {
            *self.writes.lock().unwrap() += 1;
            Err(StoreError::transaction("disk I/O error"))
        }

        async fn seed_from_bulk_source(
            &self,
            _records: Vec<DrawRecord>,
        ) -> StoreResult<SeedOutcome> {
            Ok(SeedOutcome::AlreadySeeded)
        }

        async fn is_seeded(&self) -> StoreResult<bool> {
            Ok(true)
        }

        async fn list_results(&self, _filter: &ResultFilter) -> StoreResult<Vec<DrawRecord>> {
            Ok(Vec::new())
        }

        async fn number_frequency(
            &self,
            _game_type: &str,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> StoreResult<std::collections::BTreeMap<u32, u64>> {
            Ok(Default::default())
        }

        async fn game_types(&self, _min_draws: u32) -> StoreResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn coordinator(store: Arc<dyn DrawStore>, source: Arc<FakeSource>) -> SyncCoordinator {
        SyncCoordinator::new(store, source, ScheduleConfig::default())
    }

    async fn stored_count(store: &SqliteStore) -> usize {
        let filter = ResultFilter {
            game_type: None,
            from: ymd(2000, 1, 1),
            to: ymd(2100, 1, 1),
        };
        store.list_results(&filter).await.unwrap().len()
    }

    #[test]
    fn test_fetch_mode_decision() {
        let today = ymd(2024, 1, 10);
        assert_eq!(FetchMode::decide(None, today), FetchMode::AwaitingSeed);
        assert_eq!(FetchMode::decide(Some(today), today), FetchMode::LatestDay);
        assert_eq!(
            FetchMode::decide(Some(ymd(2024, 1, 11)), today),
            FetchMode::LatestDay
        );
        assert_eq!(
            FetchMode::decide(Some(ymd(2024, 1, 5)), today),
            FetchMode::Range {
                from: ymd(2024, 1, 5),
                to: today
            }
        );
    }

    #[tokio::test]
    async fn test_empty_store_awaits_seed_without_fetching() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let source = Arc::new(FakeSource::default());
        let sync = coordinator(store, Arc::clone(&source));

        assert_eq!(sync.run_on(ymd(2024, 1, 10)).await, SyncOutcome::AwaitingSeed);
        assert!(source.calls().is_empty());
        assert_eq!(sync.state(), SyncState::Idle);
        assert_eq!(sync.last_run().unwrap().outcome, SyncOutcome::AwaitingSeed);
    }

    #[tokio::test]
    async fn test_awaiting_seed_never_enters_fetching() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let source = Arc::new(FakeSource::default());
        let sync = coordinator(store, Arc::clone(&source));

        let outcome = sync.execute(ymd(2024, 1, 10)).await;

        assert_eq!(outcome, SyncOutcome::AwaitingSeed);
        assert_eq!(sync.state(), SyncState::Deciding);
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_current_store_fetches_latest_day() {
        let today = ymd(2024, 1, 10);
        let store = store_with_latest(today).await;
        let source = Arc::new(FakeSource::with_rows(vec![valid_row("6/42", "01/10/2024")]));
        let sync = coordinator(store.clone(), Arc::clone(&source));

        let outcome = sync.run_on(today).await;

        assert_eq!(source.calls(), vec!["latest"]);
        assert!(matches!(outcome, SyncOutcome::Completed(r) if r.stats.inserted == 1));
        assert_eq!(stored_count(&store).await, 2);
    }

    #[tokio::test]
    async fn test_stale_store_fetches_inclusive_range() {
        let store = store_with_latest(ymd(2024, 1, 5)).await;
        let source = Arc::new(FakeSource::with_rows(vec![
            valid_row("6/49", "01/05/2024"),
            valid_row("6/49", "01/08/2024"),
        ]));
        let sync = coordinator(store.clone(), Arc::clone(&source));

        let outcome = sync.run_on(ymd(2024, 1, 10)).await;

        assert_eq!(source.calls(), vec!["range 2024-01-05..=2024-01-10"]);
        let SyncOutcome::Completed(report) = outcome else {
            panic!("expected completed run, got {outcome:?}");
        };
        assert_eq!(report.stats.updated, 1);
        assert_eq!(report.stats.inserted, 1);
        assert_eq!(
            store.latest_draw_date().await.unwrap(),
            Some(ymd(2024, 1, 8))
        );
    }

    #[tokio::test]
    async fn test_malformed_rows_are_isolated() {
        let store = store_with_latest(ymd(2024, 1, 1)).await;
        let mut rows: Vec<RawRow> = (1..=9)
            .map(|d| valid_row("6/42", &format!("01/{d:02}/2024")))
            .collect();
        rows.insert(4, RawRow::new(["6/42", "1-2-3", "01/02/2024", "100"]));
        let source = Arc::new(FakeSource::with_rows(rows));
        let sync = coordinator(store.clone(), source);

        let SyncOutcome::Completed(report) = sync.run_on(ymd(2024, 1, 10)).await else {
            panic!("expected completed run");
        };

        assert_eq!(report.rows_fetched, 10);
        assert_eq!(report.rows_rejected, 1);
        assert_eq!(report.stats.inserted, 9);
        assert_eq!(stored_count(&store).await, 10);
    }

    #[tokio::test]
    async fn test_fetch_failure_writes_nothing() {
        let store = store_with_latest(ymd(2024, 1, 5)).await;
        let source = Arc::new(FakeSource {
            rows: vec![valid_row("6/42", "01/06/2024")],
            fail: true,
            ..FakeSource::default()
        });
        let sync = coordinator(store.clone(), source);

        let outcome = sync.run_on(ymd(2024, 1, 10)).await;

        assert!(matches!(
            outcome,
            SyncOutcome::Failed {
                stage: SyncStage::Fetching,
                ..
            }
        ));
        assert_eq!(sync.state(), SyncState::Idle);
        assert_eq!(stored_count(&store).await, 1);
        assert_eq!(sync.last_run().unwrap().outcome, outcome);
    }

    #[tokio::test]
    async fn test_overlapping_run_is_dropped() {
        let today = ymd(2024, 1, 10);
        let store = store_with_latest(today).await;
        let source = Arc::new(FakeSource {
            gate: Some((Notify::new(), Notify::new())),
            ..FakeSource::default()
        });
        let sync = Arc::new(coordinator(store, Arc::clone(&source)));

        let first = {
            let sync = Arc::clone(&sync);
            tokio::spawn(async move { sync.run_on(today).await })
        };
        let (entered, release) = source.gate.as_ref().unwrap();
        entered.notified().await;

        assert_eq!(sync.state(), SyncState::Fetching);
        assert_eq!(sync.run_on(today).await, SyncOutcome::Busy);

        release.notify_one();
        assert!(matches!(
            first.await.unwrap(),
            SyncOutcome::Completed(_)
        ));
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_run_returns_to_idle() {
        let today = ymd(2024, 1, 10);
        let store = store_with_latest(today).await;
        let source = Arc::new(FakeSource {
            gate: Some((Notify::new(), Notify::new())),
            ..FakeSource::default()
        });
        let sync = Arc::new(coordinator(store, Arc::clone(&source)));

        let stuck = {
            let sync = Arc::clone(&sync);
            tokio::spawn(async move { sync.run_on(today).await })
        };
        let (entered, release) = source.gate.as_ref().unwrap();
        entered.notified().await;
        assert_eq!(sync.state(), SyncState::Fetching);

        stuck.abort();
        assert!(stuck.await.unwrap_err().is_cancelled());

        assert_eq!(sync.state(), SyncState::Idle);
        assert!(sync.last_run().is_none());

        // The run lock went with the dropped run.
        release.notify_one();
        assert!(matches!(
            sync.run_on(today).await,
            SyncOutcome::Completed(_)
        ));
        assert_eq!(sync.state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn test_persist_failure_is_reported_and_resets() {
        let store = Arc::new(BrokenStore::failing_writes(ymd(2024, 1, 5)));
        let source = Arc::new(FakeSource::with_rows(vec![valid_row("6/42", "01/08/2024")]));
        let sync = coordinator(store.clone(), Arc::clone(&source));

        let outcome = sync.run_on(ymd(2024, 1, 10)).await;

        let SyncOutcome::Failed { stage, error } = &outcome else {
            panic!("expected failed run, got {outcome:?}");
        };
        assert_eq!(*stage, SyncStage::Persisting);
        assert!(error.contains("disk I/O error"));
        assert_eq!(*store.writes.lock().unwrap(), 1);
        assert_eq!(source.calls(), vec!["range 2024-01-05..=2024-01-10"]);
        assert_eq!(sync.state(), SyncState::Idle);
        assert_eq!(sync.last_run().unwrap().outcome, outcome);
    }

    #[tokio::test]
    async fn test_cursor_read_failure_fails_while_deciding() {
        let store = Arc::new(BrokenStore::failing_reads());
        let source = Arc::new(FakeSource::default());
        let sync = coordinator(store.clone(), Arc::clone(&source));

        let outcome = sync.run_on(ymd(2024, 1, 10)).await;

        assert!(matches!(
            &outcome,
            SyncOutcome::Failed {
                stage: SyncStage::Deciding,
                error,
            } if error.contains("database is locked")
        ));
        assert!(source.calls().is_empty());
        assert_eq!(*store.writes.lock().unwrap(), 0);
        assert_eq!(sync.state(), SyncState::Idle);
        assert_eq!(sync.last_run().unwrap().outcome, outcome);
    }
}
