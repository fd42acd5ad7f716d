//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Tags and the extension
//! payload are stored as compact JSON. UUIDs are stored as hyphenated
//! lowercase strings. Booleans are INTEGER 0/1.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use watchlog_core::{
  anime::{Anime, WatchStatus},
  event::StatusEvent,
  series::Series,
  text::TextEntry,
  version::AppVersion,
};

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── WatchStatus ─────────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<WatchStatus> {
  s.parse().map_err(Error::Core)
}

// ─── Tags / extra ────────────────────────────────────────────────────────────

pub fn encode_tags(tags: &[String]) -> Result<String> {
  Ok(serde_json::to_string(tags)?)
}

pub fn decode_tags(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_extra(extra: &serde_json::Value) -> Result<String> {
  Ok(serde_json::to_string(extra)?)
}

pub fn decode_extra(s: &str) -> Result<serde_json::Value> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `anime` row.
pub struct RawAnime {
  pub anime_id:    String,
  pub title:       String,
  pub description: String,
  pub status:      String,
  pub tags:        String,
  pub series_id:   Option<String>,
  pub created_at:  String,
  pub episode:     i64,
  pub deleted:     bool,
  pub deleted_at:  Option<String>,
  pub extra:       String,
}

impl RawAnime {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      anime_id:    row.get(0)?,
      title:       row.get(1)?,
      description: row.get(2)?,
      status:      row.get(3)?,
      tags:        row.get(4)?,
      series_id:   row.get(5)?,
      created_at:  row.get(6)?,
      episode:     row.get(7)?,
      deleted:     row.get(8)?,
      deleted_at:  row.get(9)?,
      extra:       row.get(10)?,
    })
  }

  pub fn into_anime(self) -> Result<Anime> {
    Ok(Anime {
      id:          decode_uuid(&self.anime_id)?,
      title:       self.title,
      description: self.description,
      status:      decode_status(&self.status)?,
      tags:        decode_tags(&self.tags)?,
      series_id:   self.series_id.as_deref().map(decode_uuid).transpose()?,
      created_at:  decode_dt(&self.created_at)?,
      episode:     self.episode,
      deleted:     self.deleted,
      deleted_at:  self.deleted_at.as_deref().map(decode_dt).transpose()?,
      extra:       decode_extra(&self.extra)?,
    })
  }
}

/// Raw strings read directly from an `anime_series` row.
pub struct RawSeries {
  pub series_id:  String,
  pub name:       String,
  pub deleted:    bool,
  pub deleted_at: Option<String>,
  pub extra:      String,
}

impl RawSeries {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      series_id:  row.get(0)?,
      name:       row.get(1)?,
      deleted:    row.get(2)?,
      deleted_at: row.get(3)?,
      extra:      row.get(4)?,
    })
  }

  pub fn into_series(self) -> Result<Series> {
    Ok(Series {
      id:         decode_uuid(&self.series_id)?,
      name:       self.name,
      deleted:    self.deleted,
      deleted_at: self.deleted_at.as_deref().map(decode_dt).transpose()?,
      extra:      decode_extra(&self.extra)?,
    })
  }
}

/// Raw strings read directly from an `anime_status_event` row.
pub struct RawEvent {
  pub event_id:   String,
  pub anime_id:   String,
  pub status:     String,
  pub changed_at: String,
  pub extra:      String,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:   row.get(0)?,
      anime_id:   row.get(1)?,
      status:     row.get(2)?,
      changed_at: row.get(3)?,
      extra:      row.get(4)?,
    })
  }

  pub fn into_event(self) -> Result<StatusEvent> {
    Ok(StatusEvent {
      id:         decode_uuid(&self.event_id)?,
      anime_id:   decode_uuid(&self.anime_id)?,
      status:     decode_status(&self.status)?,
      changed_at: decode_dt(&self.changed_at)?,
      extra:      decode_extra(&self.extra)?,
    })
  }
}

/// Raw strings read directly from an `anime_text_entry` row.
pub struct RawText {
  pub text_id:    String,
  pub anime_id:   String,
  pub content:    String,
  pub time_at:    String,
  pub edited:     bool,
  pub deleted:    bool,
  pub deleted_at: Option<String>,
  pub extra:      String,
}

impl RawText {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      text_id:    row.get(0)?,
      anime_id:   row.get(1)?,
      content:    row.get(2)?,
      time_at:    row.get(3)?,
      edited:     row.get(4)?,
      deleted:    row.get(5)?,
      deleted_at: row.get(6)?,
      extra:      row.get(7)?,
    })
  }

  pub fn into_text(self) -> Result<TextEntry> {
    Ok(TextEntry {
      id:         decode_uuid(&self.text_id)?,
      anime_id:   decode_uuid(&self.anime_id)?,
      content:    self.content,
      time_at:    decode_dt(&self.time_at)?,
      edited:     self.edited,
      deleted:    self.deleted,
      deleted_at: self.deleted_at.as_deref().map(decode_dt).transpose()?,
      extra:      decode_extra(&self.extra)?,
    })
  }
}

/// Raw strings read directly from the `app_version` row.
pub struct RawVersion {
  pub version_code:         i64,
  pub version_name:         String,
  pub last_version_code:    i64,
  pub last_launch_at:       String,
  pub show_optional_update: bool,
  pub extra:                String,
}

impl RawVersion {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      version_code:         row.get(0)?,
      version_name:         row.get(1)?,
      last_version_code:    row.get(2)?,
      last_launch_at:       row.get(3)?,
      show_optional_update: row.get(4)?,
      extra:                row.get(5)?,
    })
  }

  pub fn into_version(self) -> Result<AppVersion> {
    Ok(AppVersion {
      version_code:         self.version_code,
      version_name:         self.version_name,
      last_version_code:    self.last_version_code,
      last_launch_at:       decode_dt(&self.last_launch_at)?,
      show_optional_update: self.show_optional_update,
      extra:                decode_extra(&self.extra)?,
    })
  }
}
