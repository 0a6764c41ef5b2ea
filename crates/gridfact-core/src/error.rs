//! Error types for `gridfact-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown fact code: {0:?}")]
  UnknownFactCode(String),

  #[error("duplicate fact code in catalog: {0:?}")]
  DuplicateFactCode(String),

  #[error("module weights must sum to 100, got {total}")]
  WeightSum { total: u16 },

  #[error("contract schema validation failed: {0}")]
  SchemaValidation(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
