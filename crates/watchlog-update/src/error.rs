//! Error type for `watchlog-update`.

use thiserror::Error;

use crate::verify::VerifyError;

#[derive(Debug, Error)]
pub enum Error {
  /// The version check could not complete. Callers degrade to "no update
  /// this session" rather than surfacing this to the user.
  #[error("network failure: {0}")]
  Network(#[from] reqwest::Error),

  #[error("version endpoint returned status {0}")]
  UnexpectedStatus(u16),

  #[error(transparent)]
  Verify(#[from] VerifyError),

  /// A second download was requested while one is outstanding.
  #[error("download {0} is already in flight")]
  DownloadInFlight(u64),

  /// An event was fed to the update flow in a state that does not accept
  /// it. Always a caller bug, never a runtime condition.
  #[error("event `{event}` is not valid in state `{state}`")]
  InvalidTransition {
    state: &'static str,
    event: &'static str,
  },

  /// The downloader or installer seam reported a failure.
  #[error("platform facility failed: {0}")]
  Platform(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
