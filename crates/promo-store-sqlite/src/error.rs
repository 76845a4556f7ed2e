//! Error type for `promo-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] promo_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// The stored partner version moved on since the aggregate was read.
  #[error("partner {0} was modified concurrently")]
  Conflict(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
