//! `GET /city/score[?as_of=YYYY-MM-DD]`
//!
//! City totals, category distribution, top and bottom areas, and trend.

use axum::{
  Json,
  extract::{Query, State},
};
use mdi_core::{engine::CityScore, store::DebtStore};

use crate::{ApiState, AsOfParams, error::ApiError};

pub async fn score<S: DebtStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<AsOfParams>,
) -> Result<Json<CityScore>, ApiError> {
  Ok(Json(state.engine.city_score(params.date()).await?))
}
