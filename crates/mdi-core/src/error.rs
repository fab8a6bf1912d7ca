//! Error types for `mdi-core`.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("asset not found: {0}")]
  AssetNotFound(Uuid),

  #[error("issue not found: {0}")]
  IssueNotFound(Uuid),

  #[error("area not found: {0}")]
  AreaNotFound(Uuid),

  /// Rejected at the boundary before any value reaches the decay formula.
  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("store call timed out after {0:?}")]
  Timeout(Duration),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  /// Whether this error names a missing entity.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::AssetNotFound(_) | Self::IssueNotFound(_) | Self::AreaNotFound(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
