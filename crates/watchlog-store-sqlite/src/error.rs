//! Error type for `watchlog-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] watchlog_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

impl Error {
  /// True when this is a duplicate-title/name rejection — a recoverable,
  /// user-facing condition (prompt to rename), not a defect.
  pub fn is_duplicate(&self) -> bool {
    matches!(
      self,
      Self::Core(
        watchlog_core::Error::DuplicateTitle(_)
          | watchlog_core::Error::DuplicateName(_)
      )
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
