//! Handlers for `/assets` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/assets/{id}/debt` | Optional `?as_of=YYYY-MM-DD` |
//! | `GET`  | `/assets/{id}/score` | Score plus 7/30-day trend |
//! | `POST` | `/assets/{id}/refresh` | Rewrites tracking and today's snapshot |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use mdi_core::{
  aggregate::AssetDebt,
  engine::AssetScore,
  entity::EntityRef,
  snapshot::Snapshot,
  store::DebtStore,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{ApiState, AsOfParams, error::ApiError};

/// `GET /assets/{id}/debt`
pub async fn debt<S: DebtStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<AsOfParams>,
) -> Result<Json<AssetDebt>, ApiError> {
  Ok(Json(state.engine.asset_debt(id, params.date()).await?))
}

/// `GET /assets/{id}/score`
pub async fn score<S: DebtStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<AsOfParams>,
) -> Result<Json<AssetScore>, ApiError> {
  Ok(Json(state.engine.asset_score(id, params.date()).await?))
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
  pub issues_refreshed: usize,
  pub snapshot:         Snapshot,
}

/// `POST /assets/{id}/refresh`
pub async fn refresh<S: DebtStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<AsOfParams>,
) -> Result<Json<RefreshResponse>, ApiError> {
  let as_of = params.date();
  let issues_refreshed = state.engine.refresh_asset_tracking(id, as_of).await?;
  let snapshot = state.engine.save_snapshot(EntityRef::Asset(id), as_of).await?;
  Ok(Json(RefreshResponse { issues_refreshed, snapshot }))
}
