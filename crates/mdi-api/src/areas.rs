//! `GET /areas/scores[?as_of=&sort_by=score|debt|name&order=asc|desc]`
//! `GET /areas/{id}/score[?as_of=YYYY-MM-DD]`

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::NaiveDate;
use mdi_core::{
  engine::{AreaListing, AreaScore},
  rollup::{AreaSortKey, SortOrder},
  store::DebtStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, AsOfParams, error::ApiError, today};

/// Query of the all-area listing. Defaults to healthiest first.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub as_of:   Option<NaiveDate>,
  #[serde(default)]
  pub sort_by: AreaSortKey,
  #[serde(default)]
  pub order:   SortOrder,
}

pub async fn list<S: DebtStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<AreaListing>, ApiError> {
  let as_of = params.as_of.unwrap_or_else(today);
  let listing = state
    .engine
    .area_rankings(as_of, params.sort_by, params.order)
    .await?;
  Ok(Json(listing))
}

pub async fn score<S: DebtStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<AsOfParams>,
) -> Result<Json<AreaScore>, ApiError> {
  Ok(Json(state.engine.area_score(id, params.date()).await?))
}
