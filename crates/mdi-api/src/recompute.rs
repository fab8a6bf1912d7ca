//! `POST /recompute[?date=YYYY-MM-DD]`
//!
//! Runs the batch synchronously and returns its report. Entity failures are
//! part of the report, not an error status.

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::NaiveDate;
use mdi_core::{batch::RecomputeReport, store::DebtStore};
use serde::Deserialize;

use crate::{ApiState, error::ApiError, today};

#[derive(Debug, Deserialize)]
pub struct RecomputeParams {
  pub date: Option<NaiveDate>,
}

pub async fn handler<S: DebtStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<RecomputeParams>,
) -> Result<Json<RecomputeReport>, ApiError> {
  let date = params.date.unwrap_or_else(today);
  let report = state.engine.recompute_all(date, &state.cancel).await?;
  Ok(Json(report))
}
