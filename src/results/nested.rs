use std::fmt;

use indexmap::IndexMap;

use super::row::DbRow;
use crate::types::RowValues;

/// Owning table of a result column.
///
/// `Unowned` is the "no table" sentinel used for computed or otherwise
/// unqualified columns; it displays as `0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnOwner {
    Table(String),
    Unowned,
}

impl ColumnOwner {
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        match self {
            ColumnOwner::Table(name) => Some(name),
            ColumnOwner::Unowned => None,
        }
    }
}

impl fmt::Display for ColumnOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnOwner::Table(name) => f.write_str(name),
            ColumnOwner::Unowned => f.write_str("0"),
        }
    }
}

/// A row re-shaped into table name -> (column name -> value).
///
/// Groups appear in the order their first column appears in the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NestedRow {
    pub(crate) groups: IndexMap<ColumnOwner, DbRow>,
}

impl NestedRow {
    pub(crate) fn from_groups(groups: IndexMap<ColumnOwner, DbRow>) -> Self {
        Self { groups }
    }

    /// Columns owned by `table`.
    #[must_use]
    pub fn get(&self, table: &str) -> Option<&DbRow> {
        self.groups.get(&ColumnOwner::Table(table.to_owned()))
    }

    /// Columns with no owning table.
    #[must_use]
    pub fn unowned(&self) -> Option<&DbRow> {
        self.groups.get(&ColumnOwner::Unowned)
    }

    /// Shortcut for `get(table)?.get(column)`.
    #[must_use]
    pub fn value(&self, table: &str, column: &str) -> Option<&RowValues> {
        self.get(table).and_then(|row| row.get(column))
    }

    pub fn owners(&self) -> impl Iterator<Item = &ColumnOwner> {
        self.groups.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ColumnOwner, &DbRow)> {
        self.groups.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
