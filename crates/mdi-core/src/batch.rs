//! Daily recompute over every entity.
//!
//! One failing entity never aborts the run: its error is recorded in the
//! report and the batch moves on. Cancellation is honoured between entities,
//! so a cancelled run leaves no half-written entity behind.

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
  DebtEngine, Error, Result,
  entity::{Asset, EntityRef},
  store::DebtStore,
};

/// Cooperative cancellation signal shared between a batch and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
  pub fn new() -> Self { Self::default() }

  pub fn cancel(&self) { self.0.store(true, Ordering::SeqCst); }

  pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::SeqCst) }
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityFailure {
  pub entity: EntityRef,
  pub error:  String,
}

/// Outcome of one [`DebtEngine::recompute_all`] run.
#[derive(Debug, Clone, Serialize)]
pub struct RecomputeReport {
  pub date:              NaiveDate,
  pub assets_processed:  usize,
  pub issues_refreshed:  usize,
  pub snapshots_written: usize,
  pub failures:          Vec<EntityFailure>,
  pub cancelled:         bool,
}

impl RecomputeReport {
  fn new(date: NaiveDate) -> Self {
    Self {
      date,
      assets_processed: 0,
      issues_refreshed: 0,
      snapshots_written: 0,
      failures: Vec::new(),
      cancelled: false,
    }
  }

  fn fail(&mut self, entity: EntityRef, error: Error) {
    tracing::warn!(%entity, %error, "skipping entity");
    self.failures.push(EntityFailure { entity, error: error.to_string() });
  }

  /// Whether every entity was processed without error.
  pub fn is_complete(&self) -> bool {
    !self.cancelled && self.failures.is_empty()
  }
}

impl<S: DebtStore> DebtEngine<S> {
  /// Refresh cached issue tracking and write the snapshot of every active
  /// asset, every area and the city for `date`.
  ///
  /// Assets go first so area and city snapshots see fresh tracking. Only a
  /// failure to list the entities fails the whole call.
  pub async fn recompute_all(
    &self,
    date: NaiveDate,
    cancel: &CancelFlag,
  ) -> Result<RecomputeReport> {
    let assets = self.call(self.store().list_active_assets(None)).await?;
    let areas = self.call(self.store().list_areas()).await?;
    tracing::info!(
      %date,
      assets = assets.len(),
      areas = areas.len(),
      "recompute started"
    );

    let mut report = RecomputeReport::new(date);

    for asset in &assets {
      if cancel.is_cancelled() {
        report.cancelled = true;
        break;
      }
      match self.recompute_asset(asset, date).await {
        Ok(refreshed) => {
          report.assets_processed += 1;
          report.issues_refreshed += refreshed;
          report.snapshots_written += 1;
        }
        Err(e) => report.fail(EntityRef::Asset(asset.asset_id), e),
      }
    }

    if !report.cancelled {
      let rollups = areas
        .iter()
        .map(|a| EntityRef::Area(a.area_id))
        .chain([EntityRef::City]);
      for entity in rollups {
        if cancel.is_cancelled() {
          report.cancelled = true;
          break;
        }
        match self.save_snapshot(entity, date).await {
          Ok(_) => report.snapshots_written += 1,
          Err(e) => report.fail(entity, e),
        }
      }
    }

    if report.cancelled {
      tracing::warn!(
        %date,
        snapshots = report.snapshots_written,
        "recompute cancelled"
      );
    } else {
      tracing::info!(
        %date,
        assets = report.assets_processed,
        issues = report.issues_refreshed,
        snapshots = report.snapshots_written,
        failures = report.failures.len(),
        "recompute finished"
      );
    }
    Ok(report)
  }

  async fn recompute_asset(
    &self,
    asset: &Asset,
    date: NaiveDate,
  ) -> Result<usize> {
    let refreshed = self.refresh_open_issues(asset, date).await?;
    self.save_snapshot(EntityRef::Asset(asset.asset_id), date).await?;
    Ok(refreshed)
  }
}
