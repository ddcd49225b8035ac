use crate::engine::RawResult;
use crate::mapper::{ColumnMap, build_column_map};
use crate::types::SqlVerb;

/// Whether a dispatched statement was data manipulation or a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Manipulation,
    Query,
}

/// The unit of work currently held in the engine handle's single slot.
///
/// Owns the native result (and with it the iteration cursor) plus the column
/// map derived from the result's column/table metadata. Each new execution
/// replaces it; `generation` identifies which execution produced it.
#[derive(Debug, Clone)]
pub struct Statement {
    pub(crate) raw: RawResult,
    column_map: ColumnMap,
    kind: StatementKind,
    verb: Option<SqlVerb>,
    generation: u64,
    rows_seen: usize,
}

impl Statement {
    pub(crate) fn new(
        raw: RawResult,
        kind: StatementKind,
        verb: Option<SqlVerb>,
        generation: u64,
    ) -> Self {
        let column_map = match kind {
            StatementKind::Query => build_column_map(&raw),
            StatementKind::Manipulation => ColumnMap::default(),
        };
        Self {
            raw,
            column_map,
            kind,
            verb,
            generation,
            rows_seen: 0,
        }
    }

    #[must_use]
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Verb the engine reported for this execution.
    #[must_use]
    pub fn verb(&self) -> Option<SqlVerb> {
        self.verb
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn column_map(&self) -> &ColumnMap {
        &self.column_map
    }

    #[must_use]
    pub fn raw(&self) -> &RawResult {
        &self.raw
    }

    /// Rows handed out so far.
    #[must_use]
    pub fn rows_seen(&self) -> usize {
        self.rows_seen
    }

    pub(crate) fn mark_row_seen(&mut self) {
        self.rows_seen += 1;
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.raw.is_exhausted()
    }
}
