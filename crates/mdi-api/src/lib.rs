//! JSON REST API for the Maintenance Debt Index.
//!
//! Exposes an axum [`Router`] backed by a [`DebtEngine`] over any
//! [`mdi_core::store::DebtStore`]. Transport concerns (TLS, auth, tracing
//! layers) are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", mdi_api::api_router(engine.clone(), cancel.clone()))
//! ```

pub mod areas;
pub mod assets;
pub mod city;
pub mod error;
pub mod history;
pub mod recompute;
pub mod simulate;

use axum::{
  Router,
  routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use mdi_core::{DebtEngine, batch::CancelFlag, store::DebtStore};
use serde::Deserialize;

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub engine: DebtEngine<S>,
  /// Honoured by recompute runs started over HTTP.
  pub cancel: CancelFlag,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { engine: self.engine.clone(), cancel: self.cancel.clone() }
  }
}

/// `?as_of=YYYY-MM-DD`; absent means today (UTC).
#[derive(Debug, Default, Deserialize)]
pub struct AsOfParams {
  pub as_of: Option<NaiveDate>,
}

impl AsOfParams {
  pub fn date(&self) -> NaiveDate { self.as_of.unwrap_or_else(today) }
}

/// Today's UTC calendar date.
pub fn today() -> NaiveDate { Utc::now().date_naive() }

/// Routes for every engine operation, with the state already applied so the
/// server can nest them under a prefix.
pub fn api_router<S>(engine: DebtEngine<S>, cancel: CancelFlag) -> Router<()>
where
  S: DebtStore + 'static,
{
  Router::new()
    // Assets
    .route("/assets/{id}/debt", get(assets::debt::<S>))
    .route("/assets/{id}/score", get(assets::score::<S>))
    .route("/assets/{id}/refresh", post(assets::refresh::<S>))
    // Areas and city
    .route("/areas/scores", get(areas::list::<S>))
    .route("/areas/{id}/score", get(areas::score::<S>))
    .route("/city/score", get(city::score::<S>))
    // History and simulation
    .route("/history/{level}/{id}", get(history::handler::<S>))
    .route("/simulate", post(simulate::handler::<S>))
    // Batch
    .route("/recompute", post(recompute::handler::<S>))
    .with_state(ApiState { engine, cancel })
}
