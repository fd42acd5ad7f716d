//! [`SqliteStore`] — the SQLite implementation of the repository traits.
//!
//! The store is constructed once at process start and handed to callers
//! by reference (or cheap clone); there is no global instance.

use std::{future::Future, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use watchlog_core::{
  anime::{Anime, DEFAULT_DESCRIPTION, NewAnime, WatchStatus},
  event::StatusEvent,
  query::{AnimeQuery, SortDirection, SortField},
  series::Series,
  store::{AnimeRepo, EventRepo, SeriesRepo, TextRepo, VersionRepo},
  text::TextEntry,
  version::{AppVersion, LaunchKind},
};

use crate::{
  Error, Result,
  encode::{
    RawAnime, RawEvent, RawSeries, RawText, RawVersion, encode_dt,
    encode_extra, encode_tags, encode_uuid,
  },
  query::{ANIME_COLUMNS, build_anime_list_query},
  schema::SCHEMA,
};

const SERIES_COLUMNS: &str = "series_id, name, deleted, deleted_at, extra";
const EVENT_COLUMNS: &str = "event_id, anime_id, status, changed_at, extra";
const TEXT_COLUMNS: &str =
  "text_id, anime_id, content, time_at, edited, deleted, deleted_at, extra";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A watchlog store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("schema initialised");
    Ok(())
  }

  async fn get_anime_where(
    &self,
    active_only: bool,
    id: Uuid,
  ) -> Result<Option<Anime>> {
    let id_str = encode_uuid(id);
    let sql = if active_only {
      format!("SELECT {ANIME_COLUMNS} FROM anime WHERE anime_id = ?1 AND deleted = 0")
    } else {
      format!("SELECT {ANIME_COLUMNS} FROM anime WHERE anime_id = ?1")
    };

    let raw: Option<RawAnime> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawAnime::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAnime::into_anime).transpose()
  }

  async fn get_series_where(
    &self,
    active_only: bool,
    id: Uuid,
  ) -> Result<Option<Series>> {
    let id_str = encode_uuid(id);
    let sql = if active_only {
      format!(
        "SELECT {SERIES_COLUMNS} FROM anime_series WHERE series_id = ?1 AND deleted = 0"
      )
    } else {
      format!("SELECT {SERIES_COLUMNS} FROM anime_series WHERE series_id = ?1")
    };

    let raw: Option<RawSeries> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawSeries::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSeries::into_series).transpose()
  }

  async fn get_text_where(
    &self,
    active_only: bool,
    id: Uuid,
  ) -> Result<Option<TextEntry>> {
    let id_str = encode_uuid(id);
    let sql = if active_only {
      format!(
        "SELECT {TEXT_COLUMNS} FROM anime_text_entry WHERE text_id = ?1 AND deleted = 0"
      )
    } else {
      format!("SELECT {TEXT_COLUMNS} FROM anime_text_entry WHERE text_id = ?1")
    };

    let raw: Option<RawText> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawText::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawText::into_text).transpose()
  }

  async fn run_anime_query(
    &self,
    sql: String,
    args: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<Anime>> {
    let raws: Vec<RawAnime> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(args), RawAnime::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAnime::into_anime).collect()
  }

  async fn events_ordered(
    &self,
    anime_id: Uuid,
    newest_first: bool,
  ) -> Result<Vec<StatusEvent>> {
    let id_str = encode_uuid(anime_id);
    let dir = if newest_first { "DESC" } else { "ASC" };
    let sql = format!(
      "SELECT {EVENT_COLUMNS} FROM anime_status_event
       WHERE anime_id = ?1 ORDER BY changed_at {dir}"
    );

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }
}

/// Outcome of the status-change transaction, reported out of the closure.
enum StatusChange {
  Missing,
  Unchanged,
  Changed,
}

// ─── AnimeRepo ───────────────────────────────────────────────────────────────

impl AnimeRepo for SqliteStore {
  type Error = Error;

  fn list_anime(
    &self,
    query: &AnimeQuery,
    limit: Option<u32>,
    offset: Option<u32>,
  ) -> impl Future<Output = Result<Vec<Anime>>> + Send + '_ {
    let query = query.clone();
    async move {
      // Parameter validation happens here, before any store access.
      let list_query = build_anime_list_query(&query, limit, offset)?;
      self.run_anime_query(list_query.sql, list_query.args).await
    }
  }

  async fn list_anime_by_series(
    &self,
    series_id: Uuid,
    sort_field: SortField,
    sort_direction: SortDirection,
  ) -> Result<Vec<Anime>> {
    // Same whitelist mapping as the list builder, fixed series predicate.
    let column = match sort_field {
      SortField::CreatedAt => "created_at",
      SortField::Title => "title COLLATE NOCASE",
    };
    let dir = match sort_direction {
      SortDirection::Asc => "ASC",
      SortDirection::Desc => "DESC",
    };
    let sql = format!(
      "SELECT {ANIME_COLUMNS} FROM anime
       WHERE deleted = 0 AND series_id = ? ORDER BY {column} {dir}"
    );
    let args = vec![rusqlite::types::Value::Text(encode_uuid(series_id))];
    self.run_anime_query(sql, args).await
  }

  async fn get_anime(&self, id: Uuid) -> Result<Option<Anime>> {
    self.get_anime_where(false, id).await
  }

  async fn get_active_anime(&self, id: Uuid) -> Result<Option<Anime>> {
    self.get_anime_where(true, id).await
  }

  fn exists_exact_title(
    &self,
    title: &str,
  ) -> impl Future<Output = Result<bool>> + Send + '_ {
    let title = title.to_owned();
    async move {
      let count: i64 = self
        .conn
        .call(move |conn| {
          Ok(conn.query_row(
            "SELECT COUNT(1) FROM anime WHERE deleted = 0 AND title = ?1",
            rusqlite::params![title],
            |row| row.get(0),
          )?)
        })
        .await?;
      Ok(count > 0)
    }
  }

  async fn create_anime(&self, input: NewAnime) -> Result<Anime> {
    let description = match input.description {
      Some(d) if !d.trim().is_empty() => d,
      _ => DEFAULT_DESCRIPTION.to_owned(),
    };
    let anime = Anime {
      id: Uuid::new_v4(),
      title: input.title,
      description,
      status: input.status,
      tags: input.tags,
      series_id: input.series_id,
      created_at: input.created_at.unwrap_or_else(Utc::now),
      episode: 0,
      deleted: false,
      deleted_at: None,
      extra: serde_json::Value::Object(serde_json::Map::new()),
    };

    let id_str = encode_uuid(anime.id);
    let title = anime.title.clone();
    let title_for_err = anime.title.clone();
    let description = anime.description.clone();
    let status = anime.status.as_str().to_owned();
    let tags = encode_tags(&anime.tags)?;
    let series_id = anime.series_id.map(encode_uuid);
    let created_at = encode_dt(anime.created_at);
    let extra = encode_extra(&anime.extra)?;

    // Duplicate check and insert commit together: two concurrent creates
    // with the same title cannot both pass.
    let inserted: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let duplicates: i64 = tx.query_row(
          "SELECT COUNT(1) FROM anime WHERE deleted = 0 AND title = ?1",
          rusqlite::params![title],
          |row| row.get(0),
        )?;
        if duplicates > 0 {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO anime (
             anime_id, title, description, status, tags, series_id,
             created_at, episode, deleted, deleted_at, extra
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 0, NULL, ?8)",
          rusqlite::params![
            id_str,
            title,
            description,
            status,
            tags,
            series_id,
            created_at,
            extra,
          ],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(watchlog_core::Error::DuplicateTitle(title_for_err).into());
    }
    Ok(anime)
  }

  async fn change_status(
    &self,
    id: Uuid,
    status: WatchStatus,
    at: Option<DateTime<Utc>>,
  ) -> Result<bool> {
    let id_str = encode_uuid(id);
    let status_str = status.as_str().to_owned();
    let event_id = encode_uuid(Uuid::new_v4());
    let changed_at = encode_dt(at.unwrap_or_else(Utc::now));

    let outcome: StatusChange = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let current: Option<String> = tx
          .query_row(
            "SELECT status FROM anime WHERE anime_id = ?1 AND deleted = 0",
            rusqlite::params![id_str],
            |row| row.get(0),
          )
          .optional()?;

        let current = match current {
          None => return Ok(StatusChange::Missing),
          Some(c) => c,
        };
        // Same status: no write, so the timeline never records a
        // redundant transition.
        if current == status_str {
          return Ok(StatusChange::Unchanged);
        }

        tx.execute(
          "UPDATE anime SET status = ?2 WHERE anime_id = ?1",
          rusqlite::params![id_str, status_str],
        )?;
        tx.execute(
          "INSERT INTO anime_status_event (event_id, anime_id, status, changed_at, extra)
           VALUES (?1, ?2, ?3, ?4, '{}')",
          rusqlite::params![event_id, id_str, status_str, changed_at],
        )?;
        tx.commit()?;
        Ok(StatusChange::Changed)
      })
      .await?;

    match outcome {
      StatusChange::Missing => Ok(false),
      StatusChange::Unchanged | StatusChange::Changed => Ok(true),
    }
  }

  async fn change_episode(&self, id: Uuid, episode: i64) -> Result<bool> {
    let id_str = encode_uuid(id);
    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE anime SET episode = ?2 WHERE anime_id = ?1 AND deleted = 0",
          rusqlite::params![id_str, episode],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  fn update_anime(
    &self,
    anime: &Anime,
  ) -> impl Future<Output = Result<()>> + Send + '_ {
    let anime = anime.clone();
    async move {
      let id_str = encode_uuid(anime.id);
      let title = anime.title.clone();
      let description = anime.description.clone();
      let status = anime.status.as_str().to_owned();
      let tags = encode_tags(&anime.tags)?;
      let series_id = anime.series_id.map(encode_uuid);
      let created_at = encode_dt(anime.created_at);
      let episode = anime.episode;
      let extra = encode_extra(&anime.extra)?;

      self
        .conn
        .call(move |conn| {
          conn.execute(
            "UPDATE anime SET
               title = ?2, description = ?3, status = ?4, tags = ?5,
               series_id = ?6, created_at = ?7, episode = ?8, extra = ?9
             WHERE anime_id = ?1",
            rusqlite::params![
              id_str,
              title,
              description,
              status,
              tags,
              series_id,
              created_at,
              episode,
              extra,
            ],
          )?;
          Ok(())
        })
        .await?;
      Ok(())
    }
  }

  async fn soft_delete_anime(
    &self,
    id: Uuid,
    at: Option<DateTime<Utc>>,
  ) -> Result<()> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(at.unwrap_or_else(Utc::now));
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE anime SET deleted = 1, deleted_at = ?2 WHERE anime_id = ?1",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn restore_anime(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE anime SET deleted = 0, deleted_at = NULL WHERE anime_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── SeriesRepo ──────────────────────────────────────────────────────────────

impl SeriesRepo for SqliteStore {
  type Error = Error;

  fn create_series(
    &self,
    name: &str,
  ) -> impl Future<Output = Result<Series>> + Send + '_ {
    let name = name.to_owned();
    async move {
      let series = Series {
        id: Uuid::new_v4(),
        name,
        deleted: false,
        deleted_at: None,
        extra: serde_json::Value::Object(serde_json::Map::new()),
      };

      let id_str = encode_uuid(series.id);
      let name = series.name.clone();
      let name_for_err = series.name.clone();
      let extra = encode_extra(&series.extra)?;

      let inserted: bool = self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          let duplicates: i64 = tx.query_row(
            "SELECT COUNT(1) FROM anime_series WHERE deleted = 0 AND name = ?1",
            rusqlite::params![name],
            |row| row.get(0),
          )?;
          if duplicates > 0 {
            return Ok(false);
          }
          tx.execute(
            "INSERT INTO anime_series (series_id, name, deleted, deleted_at, extra)
             VALUES (?1, ?2, 0, NULL, ?3)",
            rusqlite::params![id_str, name, extra],
          )?;
          tx.commit()?;
          Ok(true)
        })
        .await?;

      if !inserted {
        return Err(watchlog_core::Error::DuplicateName(name_for_err).into());
      }
      Ok(series)
    }
  }

  fn rename_series(
    &self,
    id: Uuid,
    new_name: &str,
  ) -> impl Future<Output = Result<bool>> + Send + '_ {
    let new_name = new_name.to_owned();
    async move {
      let id_str = encode_uuid(id);
      let changed: usize = self
        .conn
        .call(move |conn| {
          Ok(conn.execute(
            "UPDATE anime_series SET name = ?2 WHERE series_id = ?1",
            rusqlite::params![id_str, new_name],
          )?)
        })
        .await?;
      Ok(changed > 0)
    }
  }

  async fn list_series_by_name(
    &self,
    direction: SortDirection,
  ) -> Result<Vec<Series>> {
    let dir = match direction {
      SortDirection::Asc => "ASC",
      SortDirection::Desc => "DESC",
    };
    let sql = format!(
      "SELECT {SERIES_COLUMNS} FROM anime_series
       WHERE deleted = 0 ORDER BY name COLLATE NOCASE {dir}"
    );

    let raws: Vec<RawSeries> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawSeries::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSeries::into_series).collect()
  }

  async fn get_series(&self, id: Uuid) -> Result<Option<Series>> {
    self.get_series_where(false, id).await
  }

  async fn get_active_series(&self, id: Uuid) -> Result<Option<Series>> {
    self.get_series_where(true, id).await
  }

  fn exists_exact_name(
    &self,
    name: &str,
  ) -> impl Future<Output = Result<bool>> + Send + '_ {
    let name = name.to_owned();
    async move {
      let count: i64 = self
        .conn
        .call(move |conn| {
          Ok(conn.query_row(
            "SELECT COUNT(1) FROM anime_series WHERE deleted = 0 AND name = ?1",
            rusqlite::params![name],
            |row| row.get(0),
          )?)
        })
        .await?;
      Ok(count > 0)
    }
  }

  async fn soft_delete_series(
    &self,
    id: Uuid,
    at: Option<DateTime<Utc>>,
  ) -> Result<()> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(at.unwrap_or_else(Utc::now));
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE anime_series SET deleted = 1, deleted_at = ?2 WHERE series_id = ?1",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn restore_series(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE anime_series SET deleted = 0, deleted_at = NULL WHERE series_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── EventRepo ───────────────────────────────────────────────────────────────

impl EventRepo for SqliteStore {
  type Error = Error;

  async fn add_event(
    &self,
    anime_id: Uuid,
    status: WatchStatus,
    at: Option<DateTime<Utc>>,
  ) -> Result<StatusEvent> {
    let event = StatusEvent {
      id: Uuid::new_v4(),
      anime_id,
      status,
      changed_at: at.unwrap_or_else(Utc::now),
      extra: serde_json::Value::Object(serde_json::Map::new()),
    };

    let id_str = encode_uuid(event.id);
    let anime_id_str = encode_uuid(event.anime_id);
    let status_str = event.status.as_str().to_owned();
    let changed_at = encode_dt(event.changed_at);
    let extra = encode_extra(&event.extra)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO anime_status_event (event_id, anime_id, status, changed_at, extra)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, anime_id_str, status_str, changed_at, extra],
        )?;
        Ok(())
      })
      .await?;

    Ok(event)
  }

  async fn timeline_asc(&self, anime_id: Uuid) -> Result<Vec<StatusEvent>> {
    self.events_ordered(anime_id, false).await
  }

  async fn timeline_desc(&self, anime_id: Uuid) -> Result<Vec<StatusEvent>> {
    self.events_ordered(anime_id, true).await
  }

  async fn latest_event(&self, anime_id: Uuid) -> Result<Option<StatusEvent>> {
    let id_str = encode_uuid(anime_id);
    let sql = format!(
      "SELECT {EVENT_COLUMNS} FROM anime_status_event
       WHERE anime_id = ?1 ORDER BY changed_at DESC LIMIT 1"
    );

    let raw: Option<RawEvent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawEvent::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEvent::into_event).transpose()
  }

  async fn event_count(&self, anime_id: Uuid) -> Result<u64> {
    let id_str = encode_uuid(anime_id);
    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(1) FROM anime_status_event WHERE anime_id = ?1",
          rusqlite::params![id_str],
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(count as u64)
  }
}

// ─── TextRepo ────────────────────────────────────────────────────────────────

impl TextRepo for SqliteStore {
  type Error = Error;

  fn add_text(
    &self,
    anime_id: Uuid,
    content: &str,
    at: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<TextEntry>> + Send + '_ {
    let content = content.to_owned();
    async move {
      let entry = TextEntry {
        id: Uuid::new_v4(),
        anime_id,
        content,
        time_at: at.unwrap_or_else(Utc::now),
        edited: false,
        deleted: false,
        deleted_at: None,
        extra: serde_json::Value::Object(serde_json::Map::new()),
      };

      let id_str = encode_uuid(entry.id);
      let anime_id_str = encode_uuid(entry.anime_id);
      let content = entry.content.clone();
      let time_at = encode_dt(entry.time_at);
      let extra = encode_extra(&entry.extra)?;

      self
        .conn
        .call(move |conn| {
          conn.execute(
            "INSERT INTO anime_text_entry (
               text_id, anime_id, content, time_at, edited, deleted, deleted_at, extra
             ) VALUES (?1, ?2, ?3, ?4, 0, 0, NULL, ?5)",
            rusqlite::params![id_str, anime_id_str, content, time_at, extra],
          )?;
          Ok(())
        })
        .await?;

      Ok(entry)
    }
  }

  fn edit_text(
    &self,
    id: Uuid,
    new_content: &str,
    at: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<bool>> + Send + '_ {
    let new_content = new_content.to_owned();
    async move {
      let id_str = encode_uuid(id);
      let time_at = encode_dt(at.unwrap_or_else(Utc::now));

      // The edit applies regardless of the delete state; time_at becomes the
      // edit time (the creation time is deliberately not retained).
      let changed: usize = self
        .conn
        .call(move |conn| {
          Ok(conn.execute(
            "UPDATE anime_text_entry SET content = ?2, time_at = ?3, edited = 1
             WHERE text_id = ?1",
            rusqlite::params![id_str, new_content, time_at],
          )?)
        })
        .await?;
      Ok(changed > 0)
    }
  }

  async fn get_text(&self, id: Uuid) -> Result<Option<TextEntry>> {
    self.get_text_where(false, id).await
  }

  async fn get_active_text(&self, id: Uuid) -> Result<Option<TextEntry>> {
    self.get_text_where(true, id).await
  }

  async fn texts_for_anime(
    &self,
    anime_id: Uuid,
    direction: SortDirection,
  ) -> Result<Vec<TextEntry>> {
    let id_str = encode_uuid(anime_id);
    let dir = match direction {
      SortDirection::Asc => "ASC",
      SortDirection::Desc => "DESC",
    };
    let sql = format!(
      "SELECT {TEXT_COLUMNS} FROM anime_text_entry
       WHERE anime_id = ?1 AND deleted = 0 ORDER BY time_at {dir}"
    );

    let raws: Vec<RawText> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawText::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawText::into_text).collect()
  }

  async fn all_texts(&self, direction: SortDirection) -> Result<Vec<TextEntry>> {
    let dir = match direction {
      SortDirection::Asc => "ASC",
      SortDirection::Desc => "DESC",
    };
    let sql = format!(
      "SELECT {TEXT_COLUMNS} FROM anime_text_entry
       WHERE deleted = 0 ORDER BY time_at {dir}"
    );

    let raws: Vec<RawText> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawText::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawText::into_text).collect()
  }

  async fn soft_delete_text(
    &self,
    id: Uuid,
    at: Option<DateTime<Utc>>,
  ) -> Result<()> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(at.unwrap_or_else(Utc::now));
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE anime_text_entry SET deleted = 1, deleted_at = ?2 WHERE text_id = ?1",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn restore_text(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE anime_text_entry SET deleted = 0, deleted_at = NULL WHERE text_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn soft_delete_texts_for_anime(
    &self,
    anime_id: Uuid,
    at: Option<DateTime<Utc>>,
  ) -> Result<u64> {
    let id_str = encode_uuid(anime_id);
    let at_str = encode_dt(at.unwrap_or_else(Utc::now));
    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE anime_text_entry SET deleted = 1, deleted_at = ?2
           WHERE anime_id = ?1 AND deleted = 0",
          rusqlite::params![id_str, at_str],
        )?)
      })
      .await?;
    Ok(changed as u64)
  }
}

// ─── VersionRepo ─────────────────────────────────────────────────────────────

const VERSION_COLUMNS: &str = "version_code, version_name, last_version_code, \
   last_launch_at, show_optional_update, extra";

impl VersionRepo for SqliteStore {
  type Error = Error;

  async fn app_version(&self) -> Result<Option<AppVersion>> {
    let sql = format!("SELECT {VERSION_COLUMNS} FROM app_version WHERE id = 1");
    let raw: Option<RawVersion> = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&sql, [], RawVersion::from_row).optional()?)
      })
      .await?;
    raw.map(RawVersion::into_version).transpose()
  }

  fn init_on_launch(
    &self,
    version_code: i64,
    version_name: &str,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<LaunchKind>> + Send + '_ {
    let version_name = version_name.to_owned();
    async move {
      let now_str = encode_dt(now);

      let previous: Option<i64> = self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          let existing: Option<i64> = tx
            .query_row("SELECT version_code FROM app_version WHERE id = 1", [], |row| {
              row.get(0)
            })
            .optional()?;

          match existing {
            None => {
              // First launch: last_version_code equals the installed code,
              // meaning "no previous version".
              tx.execute(
                "INSERT INTO app_version (
                   id, version_code, version_name, last_version_code,
                   last_launch_at, show_optional_update, extra
                 ) VALUES (1, ?1, ?2, ?1, ?3, 1, '{}')",
                rusqlite::params![version_code, version_name, now_str],
              )?;
            }
            Some(_) => {
              // Roll the previously installed code into last_version_code.
              tx.execute(
                "UPDATE app_version SET
                   last_version_code = version_code,
                   version_code = ?1, version_name = ?2, last_launch_at = ?3
                 WHERE id = 1",
                rusqlite::params![version_code, version_name, now_str],
              )?;
            }
          }
          tx.commit()?;
          Ok(existing)
        })
        .await?;

      Ok(match previous {
        None => LaunchKind::First,
        Some(prev) if prev < version_code => LaunchKind::Upgraded { from: prev },
        Some(_) => LaunchKind::Normal,
      })
    }
  }

  async fn set_show_optional_update(&self, show: bool) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE app_version SET show_optional_update = ?1 WHERE id = 1",
          rusqlite::params![show],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
