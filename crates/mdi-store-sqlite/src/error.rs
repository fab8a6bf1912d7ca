//! Error type for `mdi-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date parse error: {0}")]
  DateParse(String),

  /// A stored enum column holds a value this build does not know.
  #[error("unknown {column} value: {value:?}")]
  Decode { column: &'static str, value: String },

  #[error("area not found: {0}")]
  AreaNotFound(uuid::Uuid),

  #[error("asset not found: {0}")]
  AssetNotFound(uuid::Uuid),

  #[error("issue not found: {0}")]
  IssueNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
