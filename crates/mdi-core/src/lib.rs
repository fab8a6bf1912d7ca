//! Core types, formulas and the rollup engine for the Maintenance Debt Index.
//!
//! No HTTP or SQL lives here. The cost-decay and scoring math is pure; the
//! only effectful code is in [`engine`] and [`batch`], which reach storage
//! through the [`store::DebtStore`] trait.

pub mod aggregate;
pub mod batch;
pub mod config;
pub mod decay;
pub mod engine;
pub mod entity;
pub mod error;
pub mod rollup;
pub mod score;
pub mod snapshot;
pub mod store;

pub use config::EngineConfig;
pub use engine::DebtEngine;
pub use error::{Error, Result};
