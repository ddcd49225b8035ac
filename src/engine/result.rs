use std::sync::Arc;

use crate::results::{ColumnIndex, DbRow, FetchedRow, column_index};
use crate::types::{FetchMode, RowValues};

/// The engine's native statement: buffered rows plus parallel column and
/// owning-table name lists.
///
/// `table_names` is either empty (the engine supplied no qualification
/// metadata) or has one entry per column, where an empty string means the
/// owning table of that position is unknown.
#[derive(Debug, Clone, Default)]
pub struct RawResult {
    column_names: Arc<Vec<String>>,
    table_names: Vec<String>,
    rows: Vec<Vec<RowValues>>,
    cursor: usize,
    index: ColumnIndex,
}

impl RawResult {
    #[must_use]
    pub fn new(
        column_names: Vec<String>,
        table_names: Vec<String>,
        rows: Vec<Vec<RowValues>>,
    ) -> Self {
        let index = column_index(&column_names);
        Self {
            column_names: Arc::new(column_names),
            table_names,
            rows,
            cursor: 0,
            index,
        }
    }

    /// A result with no table metadata.
    #[must_use]
    pub fn unqualified(column_names: Vec<String>, rows: Vec<Vec<RowValues>>) -> Self {
        Self::new(column_names, Vec::new(), rows)
    }

    /// Single-row statistics result as returned for a manipulation statement.
    #[must_use]
    pub fn statistics(key: &str, affected: u64) -> Self {
        let count = i64::try_from(affected).unwrap_or(i64::MAX);
        Self::unqualified(vec![key.to_owned()], vec![vec![RowValues::Int(count)]])
    }

    /// Advance the cursor and return the next row in the requested shape.
    pub fn fetch(&mut self, mode: FetchMode) -> Option<FetchedRow> {
        let values = self.fetch_values()?;
        Some(match mode {
            FetchMode::Assoc => FetchedRow::Flat(DbRow::with_index(
                Arc::clone(&self.column_names),
                Arc::clone(&self.index),
                values,
            )),
            FetchMode::Num => FetchedRow::Ordered(values),
        })
    }

    /// Advance the cursor and return the next row's values.
    pub fn fetch_values(&mut self) -> Option<Vec<RowValues>> {
        let row = self.rows.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(row)
    }

    /// Total rows in the result, regardless of cursor position.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// The engine's row-availability check.
    #[must_use]
    pub fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.rows.len()
    }

    #[must_use]
    pub fn column_names(&self) -> &Arc<Vec<String>> {
        &self.column_names
    }

    #[must_use]
    pub fn table_names(&self) -> &[String] {
        &self.table_names
    }

    /// Width of the first row, when there is one.
    #[must_use]
    pub fn first_row_width(&self) -> Option<usize> {
        self.rows.first().map(Vec::len)
    }
}
