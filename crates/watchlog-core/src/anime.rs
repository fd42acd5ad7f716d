//! Anime — the primary record of the tracker.
//!
//! An anime row carries a denormalised `status` pointer for fast list
//! filtering; the authoritative history of transitions lives in the
//! append-only status-event timeline (see [`crate::event`]).

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

/// Placeholder shown when an anime is created without a synopsis.
pub const DEFAULT_DESCRIPTION: &str = "No synopsis yet.";

// ─── WatchStatus ─────────────────────────────────────────────────────────────

/// Where an anime currently sits in the user's watch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchStatus {
  Plan,
  Watching,
  Completed,
  Dropped,
}

impl WatchStatus {
  /// The string stored in the `status` column and on status events.
  /// Must match the `rename_all = "lowercase"` serde tags above.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Plan => "plan",
      Self::Watching => "watching",
      Self::Completed => "completed",
      Self::Dropped => "dropped",
    }
  }
}

impl fmt::Display for WatchStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for WatchStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Error> {
    match s {
      "plan" => Ok(Self::Plan),
      "watching" => Ok(Self::Watching),
      "completed" => Ok(Self::Completed),
      "dropped" => Ok(Self::Dropped),
      other => Err(Error::UnknownStatus(other.to_owned())),
    }
  }
}

// ─── Anime ───────────────────────────────────────────────────────────────────

/// A tracked anime. "Deletion" is always the soft-delete flag pair; no
/// operation in the core ever removes the row physically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anime {
  pub id:          Uuid,
  /// Display title. Unique among non-deleted rows, compared byte-exact.
  pub title:       String,
  pub description: String,
  /// Denormalised current status; every change appends a status event.
  pub status:      WatchStatus,
  pub tags:        Vec<String>,
  /// Advisory reference to a series; never enforced by the store.
  pub series_id:   Option<Uuid>,
  pub created_at:  DateTime<Utc>,
  /// Last episode the user reported watching.
  pub episode:     i64,
  pub deleted:     bool,
  pub deleted_at:  Option<DateTime<Utc>>,
  /// Open-ended extension payload carried through export/import.
  pub extra:       serde_json::Value,
}

// ─── NewAnime ────────────────────────────────────────────────────────────────

/// Input to [`crate::store::AnimeRepo::create_anime`].
/// The id is always generated by the store; it is not accepted from callers.
#[derive(Debug, Clone)]
pub struct NewAnime {
  pub title:       String,
  /// Blank or absent falls back to [`DEFAULT_DESCRIPTION`].
  pub description: Option<String>,
  pub status:      WatchStatus,
  pub tags:        Vec<String>,
  pub series_id:   Option<Uuid>,
  /// Defaults to "now" when absent.
  pub created_at:  Option<DateTime<Utc>>,
}

impl NewAnime {
  /// Convenience constructor with all optional fields set to their defaults.
  pub fn new(title: impl Into<String>, status: WatchStatus) -> Self {
    Self {
      title: title.into(),
      description: None,
      status,
      tags: Vec::new(),
      series_id: None,
      created_at: None,
    }
  }
}
