//! Query parameter types for anime list queries.
//!
//! Every field is a closed enum or a bound value; nothing here can reach a
//! clause position of the generated SQL. The backend maps these through a
//! fixed whitelist (see `watchlog-store-sqlite`'s query builder).

use crate::anime::WatchStatus;

/// Whether a list query spans all active records or one status bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
  #[default]
  All,
  /// Requires [`AnimeQuery::status`] to be set; constructing the query
  /// without it fails fast with `InvalidQuery::MissingStatus`.
  ByStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
  #[default]
  CreatedAt,
  /// Case-insensitive.
  Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
  Asc,
  #[default]
  Desc,
}

/// Parameters for [`crate::store::AnimeRepo::list_anime`].
#[derive(Debug, Clone, Default)]
pub struct AnimeQuery {
  pub scope:          Scope,
  /// Only consulted when `scope` is [`Scope::ByStatus`].
  pub status:         Option<WatchStatus>,
  pub sort_field:     SortField,
  pub sort_direction: SortDirection,
  /// Case-insensitive substring match on the title. Blank is treated as
  /// absent; wildcard wrapping is applied by the builder, never the caller.
  pub keyword:        Option<String>,
}

impl AnimeQuery {
  pub fn by_status(status: WatchStatus) -> Self {
    Self {
      scope: Scope::ByStatus,
      status: Some(status),
      ..Self::default()
    }
  }
}
