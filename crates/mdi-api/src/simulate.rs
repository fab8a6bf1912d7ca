//! `POST /simulate`
//!
//! Body selects what to project, in order of precedence:
//!
//! - `{"issue_id": "..."}`: an existing issue with its own cost and dates.
//! - `{"asset_id": "...", "severity": "high"}`: a new issue on the asset.
//! - `{"base_cost": 5000, "category": "drain", ...}`: ad-hoc parameters.
//!
//! `future_days` defaults to 30; `start` defaults to today.

use axum::{Json, extract::State};
use chrono::NaiveDate;
use mdi_core::{
  aggregate::{Simulation, SimulationParams},
  decay::BaseCost,
  engine::SimulationTarget,
  entity::{AssetCategory, Severity},
  store::DebtStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError, today};

#[derive(Debug, Deserialize)]
pub struct SimulateBody {
  pub issue_id:          Option<Uuid>,
  pub asset_id:          Option<Uuid>,
  pub base_cost:         Option<f64>,
  pub reported_on:       Option<NaiveDate>,
  /// Decoded leniently; defaults to `road`.
  pub category:          Option<String>,
  /// Decoded leniently; defaults to `medium`.
  pub severity:          Option<String>,
  pub sla_days_override: Option<u32>,
  #[serde(default = "default_future_days")]
  pub future_days:       i64,
  pub start:             Option<NaiveDate>,
}

fn default_future_days() -> i64 { 30 }

impl SimulateBody {
  fn target(&self, start: NaiveDate) -> Result<SimulationTarget, ApiError> {
    let severity = self.severity.as_deref().map(Severity::decode);

    if let Some(issue_id) = self.issue_id {
      return Ok(SimulationTarget::Issue { issue_id });
    }
    if let Some(asset_id) = self.asset_id {
      return Ok(SimulationTarget::Asset { asset_id, severity });
    }

    let cost = self.base_cost.ok_or_else(|| {
      ApiError::BadRequest(
        "one of issue_id, asset_id or base_cost is required".into(),
      )
    })?;
    Ok(SimulationTarget::Custom(SimulationParams {
      base_cost:         BaseCost::new(cost)?,
      reported_on:       self.reported_on.unwrap_or(start),
      category:          self
        .category
        .as_deref()
        .map_or(AssetCategory::Road, AssetCategory::decode),
      severity:          severity.unwrap_or_default(),
      sla_days_override: self.sla_days_override,
    }))
  }
}

pub async fn handler<S: DebtStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<SimulateBody>,
) -> Result<Json<Simulation>, ApiError> {
  let start = body.start.unwrap_or_else(today);
  let target = body.target(start)?;
  Ok(Json(state.engine.simulate(target, start, body.future_days).await?))
}
