//! Error types for `silverwatch-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown severity tier: {0:?}")]
  UnknownTier(String),

  #[error("unknown operation type: {0:?}")]
  UnknownOperation(String),

  #[error("unknown chat role: {0:?}")]
  UnknownRole(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
