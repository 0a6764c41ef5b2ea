//! Error type for `gridfact-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] gridfact_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown enum encoding: {0}")]
  UnknownEncoding(String),

  /// A run with this id was already persisted; runs are append-only.
  #[error("run {0} already persisted")]
  DuplicateRun(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
