//! SQLite backend for the Maintenance Debt Index.
//!
//! Holds the entity facts (areas, assets, issues), the cached issue tracking
//! fields and the dated snapshot history. All database access runs through
//! [`tokio_rusqlite`] on a dedicated thread.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
