//! The safe list-query builder.
//!
//! Translates the closed [`AnimeQuery`] parameter object into SQL text
//! plus ordered bound parameters. User-supplied text (the keyword) only
//! ever reaches a bound-parameter position; the ORDER BY clause is mapped
//! through a fixed enum table, so injection is impossible by construction.

use rusqlite::types::Value;
use watchlog_core::{
  error::InvalidQuery,
  query::{AnimeQuery, Scope, SortDirection, SortField},
};

use crate::Result;

/// Column list shared by every anime SELECT; order matches
/// [`crate::encode::RawAnime::from_row`].
pub(crate) const ANIME_COLUMNS: &str = "anime_id, title, description, status, \
   tags, series_id, created_at, episode, deleted, deleted_at, extra";

/// An executable list query: SQL text plus ordered bound parameters.
/// Never a raw interpolated string.
#[derive(Debug, Clone)]
pub struct ListQuery {
  pub sql:  String,
  pub args: Vec<Value>,
}

/// Map the sort enums through the fixed whitelist. The only strings that
/// can ever appear in clause position live in this function.
fn order_clause(field: SortField, direction: SortDirection) -> String {
  let column = match field {
    SortField::CreatedAt => "created_at",
    SortField::Title => "title COLLATE NOCASE",
  };
  let dir = match direction {
    SortDirection::Asc => "ASC",
    SortDirection::Desc => "DESC",
  };
  format!(" ORDER BY {column} {dir}")
}

/// Build the anime list query.
///
/// Always restricts to non-deleted rows. Fails with
/// [`InvalidQuery::MissingStatus`] when `scope` is `ByStatus` without a
/// status, and [`InvalidQuery::ZeroLimit`] for `limit == Some(0)`, before
/// any store access. `offset` is only meaningful together with `limit`.
pub fn build_anime_list_query(
  params: &AnimeQuery,
  limit: Option<u32>,
  offset: Option<u32>,
) -> Result<ListQuery> {
  let mut sql = format!("SELECT {ANIME_COLUMNS} FROM anime WHERE deleted = 0");
  let mut args: Vec<Value> = Vec::new();

  if params.scope == Scope::ByStatus {
    let status = params
      .status
      .ok_or(watchlog_core::Error::InvalidQuery(InvalidQuery::MissingStatus))?;
    sql.push_str(" AND status = ?");
    args.push(Value::Text(status.as_str().to_owned()));
  }

  // Blank keyword is treated as absent; wildcard wrapping happens here,
  // never in the caller.
  if let Some(keyword) = params.keyword.as_deref().map(str::trim)
    && !keyword.is_empty()
  {
    sql.push_str(" AND title LIKE ? COLLATE NOCASE");
    args.push(Value::Text(format!("%{keyword}%")));
  }

  sql.push_str(&order_clause(params.sort_field, params.sort_direction));

  if let Some(limit) = limit {
    if limit == 0 {
      return Err(watchlog_core::Error::InvalidQuery(InvalidQuery::ZeroLimit).into());
    }
    sql.push_str(" LIMIT ?");
    args.push(Value::Integer(i64::from(limit)));
    if let Some(offset) = offset {
      sql.push_str(" OFFSET ?");
      args.push(Value::Integer(i64::from(offset)));
    }
  }

  Ok(ListQuery { sql, args })
}

#[cfg(test)]
mod tests {
  use watchlog_core::anime::WatchStatus;

  use super::*;
  use crate::Error;

  #[test]
  fn default_query_filters_deleted_and_sorts_created_desc() {
    let q = build_anime_list_query(&AnimeQuery::default(), None, None).unwrap();
    assert!(q.sql.contains("WHERE deleted = 0"));
    assert!(q.sql.ends_with("ORDER BY created_at DESC"));
    assert!(q.args.is_empty());
  }

  #[test]
  fn by_status_binds_a_parameter() {
    let q = build_anime_list_query(
      &AnimeQuery::by_status(WatchStatus::Watching),
      None,
      None,
    )
    .unwrap();
    assert!(q.sql.contains("AND status = ?"));
    assert!(!q.sql.contains("watching"));
    assert_eq!(q.args, vec![Value::Text("watching".into())]);
  }

  #[test]
  fn by_status_without_status_fails_fast() {
    let params = AnimeQuery { scope: Scope::ByStatus, ..AnimeQuery::default() };
    let err = build_anime_list_query(&params, None, None).unwrap_err();
    assert!(matches!(
      err,
      Error::Core(watchlog_core::Error::InvalidQuery(
        InvalidQuery::MissingStatus
      ))
    ));
  }

  #[test]
  fn keyword_is_wildcard_wrapped_and_bound() {
    let params = AnimeQuery {
      keyword: Some("  Frieren ".into()),
      ..AnimeQuery::default()
    };
    let q = build_anime_list_query(&params, None, None).unwrap();
    assert!(q.sql.contains("title LIKE ? COLLATE NOCASE"));
    assert_eq!(q.args, vec![Value::Text("%Frieren%".into())]);
  }

  #[test]
  fn blank_keyword_is_absent() {
    let params =
      AnimeQuery { keyword: Some("   ".into()), ..AnimeQuery::default() };
    let q = build_anime_list_query(&params, None, None).unwrap();
    assert!(!q.sql.contains("LIKE"));
    assert!(q.args.is_empty());
  }

  #[test]
  fn sort_clause_is_one_of_exactly_four_combinations() {
    let fields = [SortField::CreatedAt, SortField::Title];
    let dirs = [SortDirection::Asc, SortDirection::Desc];
    let allowed = [
      "ORDER BY created_at ASC",
      "ORDER BY created_at DESC",
      "ORDER BY title COLLATE NOCASE ASC",
      "ORDER BY title COLLATE NOCASE DESC",
    ];

    for field in fields {
      for dir in dirs {
        let params = AnimeQuery {
          sort_field: field,
          sort_direction: dir,
          ..AnimeQuery::default()
        };
        let q = build_anime_list_query(&params, None, None).unwrap();
        assert!(allowed.iter().any(|a| q.sql.ends_with(a)), "sql: {}", q.sql);
      }
    }
  }

  #[test]
  fn zero_limit_is_rejected() {
    let err =
      build_anime_list_query(&AnimeQuery::default(), Some(0), None).unwrap_err();
    assert!(matches!(
      err,
      Error::Core(watchlog_core::Error::InvalidQuery(InvalidQuery::ZeroLimit))
    ));
  }

  #[test]
  fn offset_requires_limit() {
    let q =
      build_anime_list_query(&AnimeQuery::default(), None, Some(10)).unwrap();
    assert!(!q.sql.contains("OFFSET"));

    let q =
      build_anime_list_query(&AnimeQuery::default(), Some(20), Some(10)).unwrap();
    assert!(q.sql.ends_with("LIMIT ? OFFSET ?"));
    assert_eq!(
      q.args,
      vec![Value::Integer(20), Value::Integer(10)]
    );
  }
}
