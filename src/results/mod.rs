//! Row shapes handed to facades: flat associative rows, per-table nested rows,
//! and positional rows.

mod nested;
mod row;

pub use nested::{ColumnOwner, NestedRow};
pub use row::{ColumnIndex, DbRow, column_index};

use crate::types::RowValues;

/// One row as produced by the result mapper.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchedRow {
    /// The engine's native associative shape.
    Flat(DbRow),
    /// Re-shaped by owning table (SELECT results with a column map).
    Nested(NestedRow),
    /// Positional values (ordered fetch mode).
    Ordered(Vec<RowValues>),
}

impl FetchedRow {
    #[must_use]
    pub fn as_flat(&self) -> Option<&DbRow> {
        if let FetchedRow::Flat(row) = self {
            Some(row)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_nested(&self) -> Option<&NestedRow> {
        if let FetchedRow::Nested(row) = self {
            Some(row)
        } else {
            None
        }
    }

    /// Number of fields in the row, counting every column of a nested row.
    #[must_use]
    pub fn field_count(&self) -> usize {
        match self {
            FetchedRow::Flat(row) => row.len(),
            FetchedRow::Nested(row) => row.iter().map(|(_, r)| r.len()).sum(),
            FetchedRow::Ordered(values) => values.len(),
        }
    }

    /// Values in result-column order; nested rows are flattened group by group.
    #[must_use]
    pub fn into_values(self) -> Vec<RowValues> {
        match self {
            FetchedRow::Flat(row) => row.into_values(),
            FetchedRow::Nested(row) => row
                .groups
                .into_iter()
                .flat_map(|(_, r)| r.into_values())
                .collect(),
            FetchedRow::Ordered(values) => values,
        }
    }
}
