//! Result shaping: column maps, per-table row nesting, and count introspection.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::engine::RawResult;
use crate::handle::EngineHandle;
use crate::results::{ColumnIndex, ColumnOwner, DbRow, FetchedRow, NestedRow, column_index};
use crate::statement::{Statement, StatementKind};
use crate::types::{FetchMode, RowValues, SqlVerb};

/// Where one flat result field belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapEntry {
    pub owner: ColumnOwner,
    pub column: String,
}

impl ColumnMapEntry {
    #[must_use]
    pub fn new(owner: ColumnOwner, column: impl Into<String>) -> Self {
        Self {
            owner,
            column: column.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct GroupLayout {
    names: Arc<Vec<String>>,
    index: ColumnIndex,
    positions: Vec<usize>,
}

/// Per-statement list of [`ColumnMapEntry`], one per result column, plus the
/// grouping used to rebuild nested rows without name lookups.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    entries: Vec<ColumnMapEntry>,
    groups: IndexMap<ColumnOwner, GroupLayout>,
}

impl ColumnMap {
    #[must_use]
    pub fn from_entries(entries: Vec<ColumnMapEntry>) -> Self {
        let mut grouped: IndexMap<ColumnOwner, (Vec<String>, Vec<usize>)> = IndexMap::new();
        for (position, entry) in entries.iter().enumerate() {
            let group = grouped.entry(entry.owner.clone()).or_default();
            group.0.push(entry.column.clone());
            group.1.push(position);
        }
        let groups = grouped
            .into_iter()
            .map(|(owner, (names, positions))| {
                let index = column_index(&names);
                (
                    owner,
                    GroupLayout {
                        names: Arc::new(names),
                        index,
                        positions,
                    },
                )
            })
            .collect();
        Self { entries, groups }
    }

    #[must_use]
    pub fn entries(&self) -> &[ColumnMapEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct owners in order of first appearance.
    pub fn owners(&self) -> impl Iterator<Item = &ColumnOwner> {
        self.groups.keys()
    }

    /// Place each value by its position in the map. Duplicate column names in
    /// different tables land in their own groups.
    #[must_use]
    pub fn reshape(&self, values: &[RowValues]) -> NestedRow {
        let groups = self
            .groups
            .iter()
            .map(|(owner, layout)| {
                let row_values = layout
                    .positions
                    .iter()
                    .map(|&p| values.get(p).cloned().unwrap_or(RowValues::Null))
                    .collect();
                (
                    owner.clone(),
                    DbRow::with_index(
                        Arc::clone(&layout.names),
                        Arc::clone(&layout.index),
                        row_values,
                    ),
                )
            })
            .collect();
        NestedRow::from_groups(groups)
    }
}

/// Split `table.column` on the first dot.
fn split_field(field: &str) -> (ColumnOwner, String) {
    match field.split_once('.') {
        Some((table, column)) if !table.is_empty() && !column.is_empty() => {
            (ColumnOwner::Table(table.to_owned()), column.to_owned())
        }
        _ => (ColumnOwner::Unowned, field.to_owned()),
    }
}

/// Derive owner and bare column name for every result column.
///
/// With table metadata, a non-empty entry names the owner; an empty entry
/// falls back to the plain column name, split if it is qualified. Without any
/// table metadata every column is unowned.
#[must_use]
pub fn build_column_map(raw: &RawResult) -> ColumnMap {
    let tables = raw.table_names();
    let entries = raw
        .column_names()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if tables.is_empty() {
                return ColumnMapEntry::new(ColumnOwner::Unowned, name.clone());
            }
            match tables.get(i).filter(|t| !t.is_empty()) {
                Some(table) => {
                    let column = name
                        .strip_prefix(table.as_str())
                        .and_then(|rest| rest.strip_prefix('.'))
                        .unwrap_or(name);
                    ColumnMapEntry::new(ColumnOwner::Table(table.clone()), column)
                }
                None => {
                    let (owner, column) = split_field(name);
                    ColumnMapEntry::new(owner, column)
                }
            }
        })
        .collect();
    ColumnMap::from_entries(entries)
}

/// Advance the statement and return the next row.
///
/// SELECT results with a non-empty column map come back nested by owning
/// table; everything else is returned in the engine's associative shape.
pub fn next_row(stmt: &mut Statement) -> Option<FetchedRow> {
    let reshape = stmt.verb() == Some(SqlVerb::Select) && !stmt.column_map().is_empty();
    let row = if reshape {
        let values = stmt.raw.fetch_values()?;
        FetchedRow::Nested(stmt.column_map().reshape(&values))
    } else {
        stmt.raw.fetch(FetchMode::Assoc)?
    };
    stmt.mark_row_seen();
    Some(row)
}

/// Advance the statement and return the next row in the engine's own shape,
/// bypassing table nesting.
pub fn next_row_as(stmt: &mut Statement, mode: FetchMode) -> Option<FetchedRow> {
    let row = stmt.raw.fetch(mode)?;
    stmt.mark_row_seen();
    Some(row)
}

/// Drain the remaining rows.
pub fn fetch_all(stmt: &mut Statement) -> Vec<FetchedRow> {
    std::iter::from_fn(|| next_row(stmt)).collect()
}

/// Drain the remaining rows in the engine's own shape.
pub fn fetch_all_as(stmt: &mut Statement, mode: FetchMode) -> Vec<FetchedRow> {
    std::iter::from_fn(|| next_row_as(stmt, mode)).collect()
}

/// Rows produced by the current statement; affected rows for manipulation.
///
/// `None` when no statement has run, so callers can tell that apart from zero.
#[must_use]
pub fn row_count(handle: &EngineHandle) -> Option<usize> {
    let stmt = handle.current()?;
    match stmt.kind() {
        StatementKind::Query => Some(stmt.raw().row_count()),
        StatementKind::Manipulation => handle
            .stats()
            .affected_rows()
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX)),
    }
}

/// Columns in the current statement's result.
///
/// Taken from the statement's column metadata; only when that is empty does
/// the first row's width count. Manipulation statements report zero.
#[must_use]
pub fn column_count(handle: &EngineHandle) -> Option<usize> {
    let stmt = handle.current()?;
    match stmt.kind() {
        StatementKind::Query => {
            let declared = stmt.raw().column_names().len();
            if declared > 0 {
                Some(declared)
            } else {
                Some(stmt.raw().first_row_width().unwrap_or(0))
            }
        }
        StatementKind::Manipulation => Some(0),
    }
}

/// True after a successful query whose result passes the engine's row check.
#[must_use]
pub fn has_result(handle: &EngineHandle) -> bool {
    handle
        .current()
        .is_some_and(|stmt| stmt.kind() == StatementKind::Query && stmt.raw().has_rows())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined_result() -> RawResult {
        RawResult::new(
            vec![
                "id".into(),
                "url".into(),
                "en_url".into(),
                "title".into(),
                "en_title".into(),
            ],
            vec!["a".into(), "a".into(), "b".into(), "a".into(), "b".into()],
            vec![vec![
                RowValues::Int(1),
                RowValues::Text("http://x/".into()),
                RowValues::Text("http://x-en/".into()),
                RowValues::Text("t1".into()),
                RowValues::Text("t1-en".into()),
            ]],
        )
    }

    #[test]
    fn builds_map_from_table_metadata() {
        let map = build_column_map(&joined_result());
        let entries: Vec<(Option<&str>, &str)> = map
            .entries()
            .iter()
            .map(|e| (e.owner.table(), e.column.as_str()))
            .collect();
        assert_eq!(
            entries,
            vec![
                (Some("a"), "id"),
                (Some("a"), "url"),
                (Some("b"), "en_url"),
                (Some("a"), "title"),
                (Some("b"), "en_title"),
            ]
        );
    }

    #[test]
    fn reshapes_joined_rows_by_position() {
        let mut stmt = Statement::new(joined_result(), StatementKind::Query, Some(SqlVerb::Select), 1);
        let row = next_row(&mut stmt).expect("one row");
        let nested = row.as_nested().expect("nested row");

        let a = nested.get("a").expect("table a");
        assert_eq!(a.column_names.as_slice(), ["id", "url", "title"]);
        assert_eq!(a.get("id"), Some(&RowValues::Int(1)));
        assert_eq!(a.get("url"), Some(&RowValues::Text("http://x/".into())));
        assert_eq!(a.get("title"), Some(&RowValues::Text("t1".into())));

        let b = nested.get("b").expect("table b");
        assert_eq!(b.column_names.as_slice(), ["en_url", "en_title"]);
        assert_eq!(b.get("en_url"), Some(&RowValues::Text("http://x-en/".into())));
        assert_eq!(b.get("en_title"), Some(&RowValues::Text("t1-en".into())));

        assert!(next_row(&mut stmt).is_none());
        assert!(stmt.is_exhausted());
    }

    #[test]
    fn duplicate_column_names_do_not_overwrite() {
        let raw = RawResult::new(
            vec!["id".into(), "id".into()],
            vec!["a".into(), "b".into()],
            vec![vec![RowValues::Int(1), RowValues::Int(2)]],
        );
        let mut stmt = Statement::new(raw, StatementKind::Query, Some(SqlVerb::Select), 1);
        let row = next_row(&mut stmt).expect("row");
        let nested = row.as_nested().expect("nested");
        assert_eq!(nested.value("a", "id"), Some(&RowValues::Int(1)));
        assert_eq!(nested.value("b", "id"), Some(&RowValues::Int(2)));
    }

    #[test]
    fn falls_back_to_plain_names_when_table_entry_empty() {
        let raw = RawResult::new(
            vec!["id".into(), "c.total".into(), "n".into()],
            vec!["a".into(), String::new(), String::new()],
            vec![],
        );
        let map = build_column_map(&raw);
        let owners: Vec<String> = map.entries().iter().map(|e| e.owner.to_string()).collect();
        assert_eq!(owners, vec!["a", "c", "0"]);
        assert_eq!(map.entries()[1].column, "total");
    }

    #[test]
    fn without_metadata_everything_is_unowned() {
        let raw = RawResult::unqualified(
            vec!["count".into()],
            vec![vec![RowValues::Int(3)]],
        );
        let mut stmt = Statement::new(raw, StatementKind::Query, Some(SqlVerb::Select), 1);
        let row = next_row(&mut stmt).expect("row");
        let nested = row.as_nested().expect("nested");
        assert_eq!(nested.unowned().and_then(|r| r.get("count")), Some(&RowValues::Int(3)));
    }

    #[test]
    fn non_select_rows_are_not_reshaped() {
        let raw = RawResult::new(
            vec!["name".into()],
            vec!["a".into()],
            vec![vec![RowValues::Text("id".into())]],
        );
        let mut stmt = Statement::new(raw, StatementKind::Query, Some(SqlVerb::Describe), 1);
        let row = next_row(&mut stmt).expect("row");
        assert_eq!(
            row.as_flat().and_then(|r| r.get("name")),
            Some(&RowValues::Text("id".into()))
        );
    }
}
