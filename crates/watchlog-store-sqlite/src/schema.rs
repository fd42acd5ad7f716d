//! SQL schema for the watchlog SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated
//! on `PRAGMA user_version`.
//!
//! References between tables (`anime.series_id`, `*.anime_id`) are
//! advisory: they carry no constraint, so events can be recorded for an
//! anime that was imported out of order and a series deletion never
//! cascades.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Launch bookkeeping. A singleton: the CHECK pins the only row to id 1.
CREATE TABLE IF NOT EXISTS app_version (
    id                   INTEGER PRIMARY KEY CHECK (id = 1),
    version_code         INTEGER NOT NULL,
    version_name         TEXT NOT NULL,
    last_version_code    INTEGER NOT NULL,
    last_launch_at       TEXT NOT NULL,    -- ISO 8601 UTC
    show_optional_update INTEGER NOT NULL DEFAULT 1,
    extra                TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS anime_series (
    series_id  TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    deleted    INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT,
    extra      TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS anime (
    anime_id    TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    status      TEXT NOT NULL,   -- 'plan' | 'watching' | 'completed' | 'dropped'
    tags        TEXT NOT NULL DEFAULT '[]',  -- JSON array of strings
    series_id   TEXT,            -- advisory reference to anime_series
    created_at  TEXT NOT NULL,
    episode     INTEGER NOT NULL DEFAULT 0,
    deleted     INTEGER NOT NULL DEFAULT 0,
    deleted_at  TEXT,
    extra       TEXT NOT NULL DEFAULT '{}'
);

-- Status events are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS anime_status_event (
    event_id   TEXT PRIMARY KEY,
    anime_id   TEXT NOT NULL,    -- advisory reference to anime
    status     TEXT NOT NULL,
    changed_at TEXT NOT NULL,
    extra      TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS anime_text_entry (
    text_id    TEXT PRIMARY KEY,
    anime_id   TEXT NOT NULL,    -- advisory reference to anime
    content    TEXT NOT NULL,
    time_at    TEXT NOT NULL,    -- creation time; overwritten on edit
    edited     INTEGER NOT NULL DEFAULT 0,
    deleted    INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT,
    extra      TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS anime_title_idx    ON anime(title);
CREATE INDEX IF NOT EXISTS anime_created_idx  ON anime(created_at);
CREATE INDEX IF NOT EXISTS anime_status_idx   ON anime(status);
CREATE INDEX IF NOT EXISTS series_name_idx    ON anime_series(name);
CREATE INDEX IF NOT EXISTS event_timeline_idx ON anime_status_event(anime_id, changed_at);
CREATE INDEX IF NOT EXISTS text_timeline_idx  ON anime_text_entry(anime_id, time_at);

PRAGMA user_version = 1;
";
