//! Daily recompute job.
//!
//! ```text
//! loop
//!   ├── sleep until next run_at (UTC)      ← shutdown wakes it early
//!   └── recompute_all(today)
//!         └── on error or failures: retry up to max_retries, retry_delay apart
//! ```
//!
//! Snapshot writes are upserts, so a retried day overwrites instead of
//! duplicating.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use mdi_core::{DebtEngine, batch::CancelFlag, store::DebtStore};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::SchedulerConfig;

pub struct Scheduler<S> {
  engine:      DebtEngine<S>,
  run_at:      NaiveTime,
  max_retries: u32,
  retry_delay: Duration,
  cancel:      CancelFlag,
}

impl<S: DebtStore + 'static> Scheduler<S> {
  pub fn new(
    engine: DebtEngine<S>,
    config: &SchedulerConfig,
    cancel: CancelFlag,
  ) -> anyhow::Result<Self> {
    Ok(Self {
      engine,
      run_at: config.run_at_time()?,
      max_retries: config.max_retries,
      retry_delay: Duration::from_secs(config.retry_delay_secs),
      cancel,
    })
  }

  /// Run until `shutdown` flips or the cancel flag is set.
  pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
    info!(run_at = %self.run_at, "recompute scheduler started");
    loop {
      let wait = until_next(Utc::now(), self.run_at);
      tokio::select! {
        _ = tokio::time::sleep(wait) => {}
        _ = shutdown.changed() => break,
      }
      if self.cancel.is_cancelled() {
        break;
      }
      let today = Utc::now().date_naive();
      if !self.run_day(today, &mut shutdown).await {
        break;
      }
    }
    info!("recompute scheduler stopped");
  }

  /// One scheduled day including retries. Returns `false` on shutdown.
  async fn run_day(
    &self,
    date: NaiveDate,
    shutdown: &mut watch::Receiver<bool>,
  ) -> bool {
    for attempt in 0..=self.max_retries {
      if attempt > 0 {
        tokio::select! {
          _ = tokio::time::sleep(self.retry_delay) => {}
          _ = shutdown.changed() => return false,
        }
      }

      match self.engine.recompute_all(date, &self.cancel).await {
        Ok(report) if report.cancelled => return false,
        Ok(report) if report.is_complete() => {
          info!(
            %date,
            attempt,
            snapshots = report.snapshots_written,
            "scheduled recompute done"
          );
          return true;
        }
        Ok(report) => warn!(
          %date,
          attempt,
          failures = report.failures.len(),
          "scheduled recompute incomplete"
        ),
        Err(e) => {
          error!(%date, attempt, error = %e, "scheduled recompute failed")
        }
      }
    }
    error!(
      %date,
      retries = self.max_retries,
      "giving up on scheduled recompute"
    );
    true
  }
}

/// Time from `now` until the next `at` on the UTC clock; a run time equal to
/// `now` is scheduled for the following day.
pub fn until_next(now: DateTime<Utc>, at: NaiveTime) -> Duration {
  let today_at = now.date_naive().and_time(at).and_utc();
  let next = if today_at > now {
    today_at
  } else {
    today_at + chrono::TimeDelta::days(1)
  };
  (next - now).to_std().unwrap_or_default()
}
