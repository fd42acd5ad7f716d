//! Series — a named grouping that anime rows may reference.
//!
//! The reference is advisory: deleting a series does not cascade to its
//! anime, and the store never validates that a `series_id` resolves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A series. Name uniqueness is enforced only among non-deleted rows,
/// compared byte-exact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
  pub id:         Uuid,
  pub name:       String,
  pub deleted:    bool,
  pub deleted_at: Option<DateTime<Utc>>,
  pub extra:      serde_json::Value,
}
