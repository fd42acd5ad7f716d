//! Error types for `watchlog-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// An active (non-deleted) anime with this exact title already exists.
  #[error("an anime titled {0:?} already exists")]
  DuplicateTitle(String),

  /// An active (non-deleted) series with this exact name already exists.
  #[error("a series named {0:?} already exists")]
  DuplicateName(String),

  /// A list query was constructed with an invalid parameter combination.
  /// This indicates a caller bug, not a runtime condition to recover from.
  #[error("invalid query: {0}")]
  InvalidQuery(#[from] InvalidQuery),

  #[error("unknown watch status: {0:?}")]
  UnknownStatus(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

/// Malformed query parameters, rejected before any store access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidQuery {
  #[error("scope is ByStatus but no status was supplied")]
  MissingStatus,

  #[error("limit must be greater than zero")]
  ZeroLimit,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
