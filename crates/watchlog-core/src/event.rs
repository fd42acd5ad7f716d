//! Status events — the append-only timeline of watch-status transitions.
//!
//! Events are immutable once written. There is no update or delete
//! operation anywhere in the system; the repository deliberately exposes
//! none. An anime's `status` field is a denormalised pointer kept in sync
//! with the newest event in the same transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::anime::WatchStatus;

/// One recorded status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
  pub id:         Uuid,
  /// Owning anime. Advisory; never validated against the anime table.
  pub anime_id:   Uuid,
  pub status:     WatchStatus,
  pub changed_at: DateTime<Utc>,
  pub extra:      serde_json::Value,
}
