//! App-version bookkeeping — a singleton row updated on every launch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single `app_version` row. Created on first launch, updated on every
/// launch, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppVersion {
  /// Currently installed version code; compared against the remote
  /// descriptor to decide whether an update exists.
  pub version_code:         i64,
  pub version_name:         String,
  /// Version code seen on the previous launch. `last_version_code <
  /// version_code` means this is the first launch after an upgrade.
  pub last_version_code:    i64,
  pub last_launch_at:       DateTime<Utc>,
  /// Whether non-forced updates are surfaced to the user at all.
  pub show_optional_update: bool,
  pub extra:                serde_json::Value,
}

/// What kind of launch `init_on_launch` observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchKind {
  /// No singleton row existed yet; one was created.
  First,
  /// The installed code is newer than the previously recorded one.
  Upgraded { from: i64 },
  Normal,
}
