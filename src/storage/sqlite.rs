// src/storage/sqlite.rs

//! SQLite-backed draw store.
//!
//! The connection sits behind a blocking mutex and every operation runs on
//! the blocking thread pool, so no lock is ever held across an await.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use crate::error::{ParseError, StoreError};
use crate::models::{DrawRecord, number_frequency};
use crate::storage::{DrawStore, ResultFilter, SeedOutcome, StoreResult, UpsertStats};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS draw_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    game_type TEXT NOT NULL CHECK (game_type <> ''),
    draw_date TEXT NOT NULL,
    jackpot NUMERIC NOT NULL,
    winners INTEGER NOT NULL,
    number1 INTEGER,
    number2 INTEGER,
    number3 INTEGER,
    number4 INTEGER,
    number5 INTEGER,
    number6 INTEGER,
    UNIQUE (game_type, draw_date)
);
CREATE INDEX IF NOT EXISTS idx_draw_results_date ON draw_results (draw_date);
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT
);
";

const UPSERT: &str = "
INSERT INTO draw_results
    (game_type, draw_date, jackpot, winners, number1, number2, number3, number4, number5, number6)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
ON CONFLICT (game_type, draw_date) DO UPDATE SET
    jackpot = excluded.jackpot,
    winners = excluded.winners,
    number1 = excluded.number1,
    number2 = excluded.number2,
    number3 = excluded.number3,
    number4 = excluded.number4,
    number5 = excluded.number5,
    number6 = excluded.number6
";

const SELECT_RESULTS: &str = "
SELECT game_type, draw_date, jackpot, winners, number1, number2, number3, number4, number5, number6
FROM draw_results
WHERE draw_date BETWEEN ?1 AND ?2 AND (?3 IS NULL OR game_type = ?3)
ORDER BY draw_date DESC, game_type
";

const SEEDED_KEY: &str = "seeded";

/// Draw store on a single SQLite connection.
#[derive(Clone)]
pub struct SqliteStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (creating if needed) a database file.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> StoreResult<Self> {
        let path = path.as_ref();
        let connection = Connection::open(path)
            .map_err(|e| StoreError::query(format!("cannot open {}: {e}", path.display())))?;
        connection.execute_batch("PRAGMA journal_mode = WAL;")?;
        connection.busy_timeout(busy_timeout)?;
        Self::init(connection)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(connection: Connection) -> StoreResult<Self> {
        connection.execute_batch(SCHEMA)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    async fn blocking<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let mut guard = connection
                .lock()
                .map_err(|_| StoreError::query("connection mutex poisoned"))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::query(format!("store task failed: {e}")))?
    }
}

#[async_trait]
impl DrawStore for SqliteStore {
    async fn latest_draw_date(&self) -> StoreResult<Option<NaiveDate>> {
        self.blocking(|conn| {
            let latest = conn.query_row("SELECT MAX(draw_date) FROM draw_results", [], |row| {
                row.get::<_, Option<NaiveDate>>(0)
            })?;
            Ok(latest)
        })
        .await
    }

    async fn upsert_batch(&self, records: Vec<DrawRecord>) -> StoreResult<UpsertStats> {
        self.blocking(move |conn| {
            let tx = conn.transaction().map_err(StoreError::transaction)?;
            let stats = write_records(&tx, &records);
            tx.commit().map_err(StoreError::transaction)?;
            Ok(stats)
        })
        .await
    }

    async fn seed_from_bulk_source(&self, records: Vec<DrawRecord>) -> StoreResult<SeedOutcome> {
        self.blocking(move |conn| {
            let tx = conn.transaction().map_err(StoreError::transaction)?;
            if read_seeded(&tx)? {
                return Ok(SeedOutcome::AlreadySeeded);
            }

            let stats = write_records(&tx, &records);
            tx.execute(
                "INSERT INTO meta (key, value) VALUES (?1, 'true')
                 ON CONFLICT (key) DO UPDATE SET value = excluded.value",
                [SEEDED_KEY],
            )
            .map_err(StoreError::transaction)?;
            tx.commit().map_err(StoreError::transaction)?;
            Ok(SeedOutcome::Seeded(stats))
        })
        .await
    }

    async fn is_seeded(&self) -> StoreResult<bool> {
        self.blocking(|conn| read_seeded(conn)).await
    }

    async fn list_results(&self, filter: &ResultFilter) -> StoreResult<Vec<DrawRecord>> {
        let filter = filter.clone();
        self.blocking(move |conn| select_records(conn, &filter)).await
    }

    async fn number_frequency(
        &self,
        game_type: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<BTreeMap<u32, u64>> {
        let filter = ResultFilter {
            game_type: Some(game_type.to_string()),
            from,
            to,
        };
        self.blocking(move |conn| {
            let records = select_records(conn, &filter)?;
            Ok(number_frequency(&records))
        })
        .await
    }

    async fn game_types(&self, min_draws: u32) -> StoreResult<Vec<String>> {
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT game_type FROM draw_results
                 GROUP BY game_type HAVING COUNT(*) > ?1
                 ORDER BY game_type",
            )?;
            let games = stmt
                .query_map([min_draws], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(games)
        })
        .await
    }
}

fn write_records(tx: &Transaction<'_>, records: &[DrawRecord]) -> UpsertStats {
    let mut stats = UpsertStats::default();
    for record in records {
        match upsert_record(tx, record) {
            Ok(true) => stats.inserted += 1,
            Ok(false) => stats.updated += 1,
            Err(e) => {
                stats.skipped += 1;
                log::warn!(
                    "Skipped {} {}: {}",
                    record.game_type,
                    record.draw_date,
                    e
                );
            }
        }
    }
    log::debug!(
        "Batch of {}: {} inserted, {} updated, {} skipped",
        records.len(),
        stats.inserted,
        stats.updated,
        stats.skipped
    );
    stats
}

/// Returns `true` when the key was new.
fn upsert_record(tx: &Transaction<'_>, record: &DrawRecord) -> rusqlite::Result<bool> {
    let jackpot = record.jackpot.to_f64().ok_or_else(|| {
        rusqlite::Error::ToSqlConversionFailure(Box::new(ParseError::InvalidJackpot(
            record.jackpot.to_string(),
        )))
    })?;

    let exists: bool = tx.query_row(
        "SELECT EXISTS (SELECT 1 FROM draw_results WHERE game_type = ?1 AND draw_date = ?2)",
        params![record.game_type, record.draw_date],
        |row| row.get(0),
    )?;

    let [n1, n2, n3, n4, n5, n6] = record.numbers;
    tx.execute(
        UPSERT,
        params![
            record.game_type,
            record.draw_date,
            jackpot,
            record.winners,
            n1,
            n2,
            n3,
            n4,
            n5,
            n6
        ],
    )?;
    Ok(!exists)
}

fn read_seeded(conn: &Connection) -> StoreResult<bool> {
    let value = conn
        .query_row("SELECT value FROM meta WHERE key = ?1", [SEEDED_KEY], |row| {
            row.get::<_, Option<String>>(0)
        })
        .optional()?
        .flatten();
    Ok(value.as_deref() == Some("true"))
}

fn select_records(conn: &Connection, filter: &ResultFilter) -> StoreResult<Vec<DrawRecord>> {
    let mut stmt = conn.prepare_cached(SELECT_RESULTS)?;
    let records = stmt
        .query_map(
            params![filter.from, filter.to, filter.game_type],
            |row| {
                let stored: f64 = row.get(2)?;
                let jackpot = Decimal::from_f64(stored).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        Type::Real,
                        Box::new(ParseError::InvalidJackpot(stored.to_string())),
                    )
                })?;
                Ok(DrawRecord {
                    game_type: row.get(0)?,
                    draw_date: row.get(1)?,
                    jackpot,
                    winners: row.get(3)?,
                    numbers: [
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                        row.get(9)?,
                    ],
                })
            },
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}
