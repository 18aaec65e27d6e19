// src/pipeline/schedule.rs

//! Time trigger for the sync coordinator.
//!
//! Fires one run shortly after start, then evaluates the configured cron
//! expressions on a fixed tick and fires whenever one of them has an instant
//! inside the window since the previous tick.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use cron::Schedule;
use tokio::time::MissedTickBehavior;

use crate::error::{AppError, Result};
use crate::models::ScheduleConfig;
use crate::pipeline::sync::{SyncCoordinator, SyncOutcome};

/// Cron expressions evaluated on the remote system's clock.
#[derive(Debug, Clone)]
pub struct CronTrigger {
    schedules: Vec<Schedule>,
    offset: FixedOffset,
}

impl CronTrigger {
    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        let schedules = config
            .cron
            .iter()
            .map(|expr| {
                Schedule::from_str(expr).map_err(|e| {
                    AppError::config(format!("invalid cron expression '{expr}': {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            schedules,
            offset: config.offset(),
        })
    }

    /// Whether any expression has an instant in `(since, now]`.
    pub fn due_between(&self, since: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let since = since.with_timezone(&self.offset);
        self.schedules.iter().any(|schedule| {
            schedule
                .after(&since)
                .take(1)
                .any(|next| next.with_timezone(&Utc) <= now)
        })
    }
}

/// Background task that triggers sync runs.
pub struct SyncScheduler {
    coordinator: Arc<SyncCoordinator>,
    trigger: CronTrigger,
    startup_delay: Duration,
    tick: Duration,
}

impl SyncScheduler {
    pub fn new(coordinator: Arc<SyncCoordinator>, config: &ScheduleConfig) -> Result<Self> {
        Ok(Self {
            coordinator,
            trigger: CronTrigger::from_config(config)?,
            startup_delay: Duration::from_secs(config.startup_delay_secs),
            tick: Duration::from_secs(config.tick_secs.max(1)),
        })
    }

    /// Start the scheduler loop on a tokio task. It runs until the task is dropped.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            log::info!(
                "Sync scheduler started: startup run in {}s, checking every {}s",
                self.startup_delay.as_secs(),
                self.tick.as_secs()
            );

            tokio::time::sleep(self.startup_delay).await;
            self.fire("startup");

            let mut interval = tokio::time::interval(self.tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval.tick().await;

            let mut last_check = Utc::now();
            loop {
                interval.tick().await;
                let now = Utc::now();
                if self.trigger.due_between(last_check, now) {
                    self.fire("cron");
                }
                last_check = now;
            }
        })
    }

    /// Run the coordinator on its own task so a long run never delays the
    /// next check. An overlapping trigger is dropped by the coordinator.
    fn fire(&self, reason: &'static str) {
        let coordinator = Arc::clone(&self.coordinator);
        tokio::spawn(async move {
            log::info!("Triggering sync ({reason})");
            if let SyncOutcome::Busy = coordinator.run().await {
                log::debug!("Skipped {reason} sync; previous run still in flight");
            }
        });
    }
}
