//! Daily reconciliation scheduler
//!
//! Runs the engine once per day at a configured UTC time, reconciling
//! the previous day's transactions. A failed run is logged and the
//! schedule continues.

use crate::{engine::ReconciliationEngine, Error, Result};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Daily run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Time of day (UTC) when the daily run starts, e.g. "02:00"
    pub run_time: String,

    /// Enable the scheduled run
    pub enabled: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            run_time: "02:00".to_string(),
            enabled: true,
        }
    }
}

impl ScheduleConfig {
    fn parse_run_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.run_time, "%H:%M")
            .map_err(|e| Error::Config(format!("Invalid time format '{}': {}", self.run_time, e)))
    }

    /// Calculate the next run time from `now`
    pub fn next_run_time(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let run_time = self.parse_run_time()?;

        if now.time() < run_time {
            now.date_naive()
                .and_time(run_time)
                .and_local_timezone(Utc)
                .single()
                .ok_or_else(|| Error::Config("Invalid timezone conversion".to_string()))
        } else {
            (now + Duration::days(1))
                .date_naive()
                .and_time(run_time)
                .and_local_timezone(Utc)
                .single()
                .ok_or_else(|| Error::Config("Invalid timezone conversion".to_string()))
        }
    }
}

/// Recurring daily scheduler
pub struct ReconciliationScheduler {
    config: ScheduleConfig,
    engine: Arc<ReconciliationEngine>,
}

impl ReconciliationScheduler {
    /// Create new scheduler
    pub fn new(config: ScheduleConfig, engine: Arc<ReconciliationEngine>) -> Self {
        Self { config, engine }
    }

    /// Run the schedule loop until the task is dropped
    pub async fn start(self) -> Result<()> {
        if !self.config.enabled {
            info!("Reconciliation scheduler disabled");
            return Ok(());
        }

        info!(run_time = %self.config.run_time, "Starting reconciliation scheduler");

        loop {
            let now = Utc::now();
            let next = self.config.next_run_time(now)?;
            let wait = (next - now)
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);

            info!(next_run = %next.to_rfc3339(), "Next reconciliation run scheduled");
            tokio::time::sleep(wait).await;

            self.engine.run_daily().await;
        }
    }

    /// Trigger a run outside the schedule
    pub async fn trigger_now(&self, date: chrono::NaiveDate) {
        info!(date = %date, "Ad-hoc reconciliation triggered");
        if let Err(e) = self.engine.generate_report(date).await {
            warn!(date = %date, "Ad-hoc reconciliation failed: {}", e);
        }
    }
}
