//! Error types for `concierge-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid store path {path:?}: {reason}")]
  InvalidPath { path: String, reason: &'static str },

  #[error("{entity} record violates its schema at `{field}`: {reason}")]
  SchemaViolation {
    entity: &'static str,
    field:  String,
    reason: String,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
