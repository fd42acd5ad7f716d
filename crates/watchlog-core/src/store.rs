//! Repository traits implemented by storage backends
//! (e.g. `watchlog-store-sqlite`).
//!
//! Higher layers depend on these abstractions, not on any concrete
//! backend. Keyed operations that target a missing or deleted-where-active-
//! required row report absence as `Ok(false)` / `Ok(None)` — callers handle
//! absence as routine, never as an error.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  anime::{Anime, NewAnime, WatchStatus},
  event::StatusEvent,
  query::{AnimeQuery, SortDirection, SortField},
  series::Series,
  text::TextEntry,
  version::{AppVersion, LaunchKind},
};

// ─── Anime ───────────────────────────────────────────────────────────────────

/// Transactional operations on the anime table.
pub trait AnimeRepo: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Run a whitelisted list query. An empty result is valid, not an error.
  fn list_anime(
    &self,
    query: &AnimeQuery,
    limit: Option<u32>,
    offset: Option<u32>,
  ) -> impl Future<Output = Result<Vec<Anime>, Self::Error>> + Send + '_;

  /// All active anime referencing `series_id`, with the usual ordering rules.
  fn list_anime_by_series(
    &self,
    series_id: Uuid,
    sort_field: SortField,
    sort_direction: SortDirection,
  ) -> impl Future<Output = Result<Vec<Anime>, Self::Error>> + Send + '_;

  /// Point lookup, ignoring the delete flag (trash views, debugging).
  fn get_anime(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Anime>, Self::Error>> + Send + '_;

  /// Point lookup restricted to non-deleted rows.
  fn get_active_anime(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Anime>, Self::Error>> + Send + '_;

  /// True iff a non-deleted row has this byte-exact title. A pre-flight for
  /// surfacing a duplicate warning; `create_anime` re-checks atomically.
  fn exists_exact_title(
    &self,
    title: &str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Create one anime row with a generated id. The duplicate-title check
  /// runs inside the same transaction as the insert; a byte-exact active
  /// duplicate fails with `DuplicateTitle`. Does not write a status event.
  fn create_anime(
    &self,
    input: NewAnime,
  ) -> impl Future<Output = Result<Anime, Self::Error>> + Send + '_;

  /// Update the denormalised status and append one timeline event, in a
  /// single transaction. Returns `false` when no active row exists. Equal
  /// status is an idempotent no-op: success, no event appended.
  fn change_status(
    &self,
    id: Uuid,
    status: WatchStatus,
    at: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Update the episode counter. Returns `false` when no active row exists.
  /// No event is written.
  fn change_episode(
    &self,
    id: Uuid,
    episode: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Full-row overwrite (title/description/tags/series/…). Soft-delete
  /// fields are not touched. Updating a missing id changes nothing.
  fn update_anime(
    &self,
    anime: &Anime,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn soft_delete_anime(
    &self,
    id: Uuid,
    at: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn restore_anime(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Series ──────────────────────────────────────────────────────────────────

/// Operations on the series table. Mirrors [`AnimeRepo`] at smaller scope.
pub trait SeriesRepo: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create one series with a generated id. Duplicate-name check runs
  /// inside the insert transaction; a byte-exact active duplicate fails
  /// with `DuplicateName`.
  fn create_series(
    &self,
    name: &str,
  ) -> impl Future<Output = Result<Series, Self::Error>> + Send + '_;

  /// Returns `false` when the id does not exist.
  fn rename_series(
    &self,
    id: Uuid,
    new_name: &str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// All active series, sorted by name case-insensitively.
  fn list_series_by_name(
    &self,
    direction: SortDirection,
  ) -> impl Future<Output = Result<Vec<Series>, Self::Error>> + Send + '_;

  fn get_series(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Series>, Self::Error>> + Send + '_;

  fn get_active_series(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Series>, Self::Error>> + Send + '_;

  fn exists_exact_name(
    &self,
    name: &str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn soft_delete_series(
    &self,
    id: Uuid,
    at: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn restore_series(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Status events ───────────────────────────────────────────────────────────

/// Append-only timeline access. There is deliberately no update or delete
/// here — the timeline is the audit record.
pub trait EventRepo: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Pure insert. `anime_id` is not validated against the anime table.
  fn add_event(
    &self,
    anime_id: Uuid,
    status: WatchStatus,
    at: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<StatusEvent, Self::Error>> + Send + '_;

  /// Timeline ordered by change time, oldest first.
  fn timeline_asc(
    &self,
    anime_id: Uuid,
  ) -> impl Future<Output = Result<Vec<StatusEvent>, Self::Error>> + Send + '_;

  /// Timeline ordered by change time, newest first.
  fn timeline_desc(
    &self,
    anime_id: Uuid,
  ) -> impl Future<Output = Result<Vec<StatusEvent>, Self::Error>> + Send + '_;

  /// The most recent event, or `None` if the anime has no timeline yet.
  fn latest_event(
    &self,
    anime_id: Uuid,
  ) -> impl Future<Output = Result<Option<StatusEvent>, Self::Error>> + Send + '_;

  fn event_count(
    &self,
    anime_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

// ─── Text entries ────────────────────────────────────────────────────────────

/// Operations on free-text entries.
pub trait TextRepo: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert with `edited == false` and `time_at` set to the creation time.
  fn add_text(
    &self,
    anime_id: Uuid,
    content: &str,
    at: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<TextEntry, Self::Error>> + Send + '_;

  /// Overwrite the content, set `time_at` to the edit time (the creation
  /// time is not retained) and flip `edited`. Reads the row regardless of
  /// its delete state; returns `false` when the id does not exist.
  fn edit_text(
    &self,
    id: Uuid,
    new_content: &str,
    at: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn get_text(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<TextEntry>, Self::Error>> + Send + '_;

  fn get_active_text(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<TextEntry>, Self::Error>> + Send + '_;

  /// Active entries of one anime ordered by `time_at`.
  fn texts_for_anime(
    &self,
    anime_id: Uuid,
    direction: SortDirection,
  ) -> impl Future<Output = Result<Vec<TextEntry>, Self::Error>> + Send + '_;

  /// Active entries across all anime ordered by `time_at`.
  fn all_texts(
    &self,
    direction: SortDirection,
  ) -> impl Future<Output = Result<Vec<TextEntry>, Self::Error>> + Send + '_;

  fn soft_delete_text(
    &self,
    id: Uuid,
    at: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn restore_text(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Batch soft-delete for an explicit "hide the notes with the anime"
  /// cascade policy. Never invoked automatically by the store.
  fn soft_delete_texts_for_anime(
    &self,
    anime_id: Uuid,
    at: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

// ─── App version ─────────────────────────────────────────────────────────────

/// The launch-bookkeeping singleton.
pub trait VersionRepo: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn app_version(
    &self,
  ) -> impl Future<Output = Result<Option<AppVersion>, Self::Error>> + Send + '_;

  /// Create or roll the singleton row for this launch and classify it.
  fn init_on_launch(
    &self,
    version_code: i64,
    version_name: &str,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<LaunchKind, Self::Error>> + Send + '_;

  /// Toggle whether non-forced updates are surfaced.
  fn set_show_optional_update(
    &self,
    show: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
