//! Error type for the notification server.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The change feed could not be opened at startup.
  #[error("change feed unavailable: {0}")]
  FeedUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("encoding error: {0}")]
  Encode(#[from] silverwatch_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
