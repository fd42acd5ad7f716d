//! Free-text entries attached to an anime.
//!
//! Unlike status events, text entries are mutable: an edit overwrites the
//! content in place, flips `edited`, and replaces `time_at` with the edit
//! timestamp. The original creation time is not retained.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A note, review, or quote recorded against an anime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextEntry {
  pub id:         Uuid,
  /// Owning anime. Advisory; never validated against the anime table.
  pub anime_id:   Uuid,
  pub content:    String,
  /// Creation time initially; overwritten with the edit time on each edit.
  pub time_at:    DateTime<Utc>,
  pub edited:     bool,
  pub deleted:    bool,
  pub deleted_at: Option<DateTime<Utc>>,
  pub extra:      serde_json::Value,
}
