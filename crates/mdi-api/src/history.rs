//! `GET /history/{level}/{id}[?days=N]`
//!
//! `level` is `asset`, `area` or `city`; the id segment is ignored for the
//! city (use e.g. `/history/city/city`).

use axum::{
  Json,
  extract::{Path, Query, State},
};
use mdi_core::{
  entity::{EntityLevel, EntityRef},
  snapshot::History,
  store::DebtStore,
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError, today};

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  #[serde(default = "default_days")]
  pub days: u32,
}

fn default_days() -> u32 { 30 }

pub async fn handler<S: DebtStore>(
  State(state): State<ApiState<S>>,
  Path((level, id)): Path<(EntityLevel, String)>,
  Query(params): Query<HistoryParams>,
) -> Result<Json<History>, ApiError> {
  let entity = EntityRef::from_parts(level, &id)
    .map_err(|e| {
      ApiError::BadRequest(format!("invalid {level} id {id:?}: {e}"))
    })?;
  Ok(Json(state.engine.history(entity, params.days, today()).await?))
}
