//! Folded list view — merging anime that share a series into one item.
//!
//! A pure function from the flat query result to the displayed list, so
//! the behaviour is testable without any store or rendering concern.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::anime::Anime;

/// Shown in place of a series name that cannot be resolved.
pub const UNNAMED_SERIES: &str = "(unnamed series)";

/// One item of the home list: either a single anime or a collapsed series
/// group.
#[derive(Debug, Clone)]
pub enum ListItem {
  Anime(Anime),
  SeriesGroup {
    series_id:         Uuid,
    name:              String,
    /// Number of anime collapsed into this group.
    count:             usize,
    /// Newest `created_at` among the members; used for interleaving.
    latest_created_at: DateTime<Utc>,
  },
}

impl ListItem {
  fn created_at(&self) -> DateTime<Utc> {
    match self {
      Self::Anime(a) => a.created_at,
      Self::SeriesGroup { latest_created_at, .. } => *latest_created_at,
    }
  }
}

/// Build the displayed list from a flat anime list.
///
/// With `folded == false` every row maps to [`ListItem::Anime`] in input
/// order. With `folded == true`, rows sharing a `series_id` merge into one
/// [`ListItem::SeriesGroup`]; groups and ungrouped anime are interleaved
/// sorted by (latest) creation time, newest first.
pub fn group_by_series(
  anime: Vec<Anime>,
  folded: bool,
  series_names: &HashMap<Uuid, String>,
) -> Vec<ListItem> {
  if !folded {
    return anime.into_iter().map(ListItem::Anime).collect();
  }

  let mut groups: HashMap<Uuid, (usize, DateTime<Utc>)> = HashMap::new();
  let mut singles: Vec<Anime> = Vec::new();

  for a in anime {
    match a.series_id {
      Some(sid) => {
        let entry = groups.entry(sid).or_insert((0, a.created_at));
        entry.0 += 1;
        if a.created_at > entry.1 {
          entry.1 = a.created_at;
        }
      }
      None => singles.push(a),
    }
  }

  let mut items: Vec<ListItem> = groups
    .into_iter()
    .map(|(series_id, (count, latest_created_at))| ListItem::SeriesGroup {
      series_id,
      name: series_names
        .get(&series_id)
        .cloned()
        .unwrap_or_else(|| UNNAMED_SERIES.to_owned()),
      count,
      latest_created_at,
    })
    .chain(singles.into_iter().map(ListItem::Anime))
    .collect();

  items.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
  items
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::anime::WatchStatus;

  fn anime(title: &str, series_id: Option<Uuid>, created_min: u32) -> Anime {
    Anime {
      id: Uuid::new_v4(),
      title: title.to_owned(),
      description: String::new(),
      status: WatchStatus::Plan,
      tags: Vec::new(),
      series_id,
      created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, created_min, 0).unwrap(),
      episode: 0,
      deleted: false,
      deleted_at: None,
      extra: serde_json::json!({}),
    }
  }

  #[test]
  fn unfolded_preserves_input_order() {
    let sid = Uuid::new_v4();
    let list = vec![anime("b", Some(sid), 2), anime("a", None, 1)];

    let items = group_by_series(list, false, &HashMap::new());
    assert_eq!(items.len(), 2);
    assert!(matches!(&items[0], ListItem::Anime(a) if a.title == "b"));
    assert!(matches!(&items[1], ListItem::Anime(a) if a.title == "a"));
  }

  #[test]
  fn folded_merges_series_and_interleaves_by_created_at() {
    let sid = Uuid::new_v4();
    let names = HashMap::from([(sid, "Frieren".to_owned())]);

    // Two series members (newest at minute 5) and one single at minute 3.
    let list = vec![
      anime("s1", Some(sid), 5),
      anime("solo", None, 3),
      anime("s2", Some(sid), 1),
    ];

    let items = group_by_series(list, true, &names);
    assert_eq!(items.len(), 2);

    match &items[0] {
      ListItem::SeriesGroup { name, count, latest_created_at, .. } => {
        assert_eq!(name, "Frieren");
        assert_eq!(*count, 2);
        assert_eq!(latest_created_at.timestamp() % 3600, 5 * 60);
      }
      other => panic!("expected series group first, got {other:?}"),
    }
    assert!(matches!(&items[1], ListItem::Anime(a) if a.title == "solo"));
  }

  #[test]
  fn folded_unknown_series_name_falls_back() {
    let sid = Uuid::new_v4();
    let items =
      group_by_series(vec![anime("x", Some(sid), 1)], true, &HashMap::new());

    assert_eq!(items.len(), 1);
    assert!(
      matches!(&items[0], ListItem::SeriesGroup { name, .. } if name == UNNAMED_SERIES)
    );
  }
}
