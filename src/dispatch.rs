use indexmap::IndexMap;
use tracing::debug;

use crate::engine::{ROWS_DELETED, ROWS_INSERTED, ROWS_UPDATED};
use crate::error::AdapterError;
use crate::handle::EngineHandle;
use crate::results::FetchedRow;
use crate::statement::{Statement, StatementKind};
use crate::translate;
use crate::types::{FetchMode, RowValues};

/// Row counts reported by the engine right after a manipulation statement,
/// keyed by the engine's literal phrases (`rows inserted`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryStats {
    entries: IndexMap<String, u64>,
}

impl QueryStats {
    fn from_row(row: &FetchedRow) -> Self {
        let entries = match row {
            FetchedRow::Flat(row) => row
                .iter()
                .filter_map(|(key, value)| count_of(value).map(|n| (key.to_owned(), n)))
                .collect(),
            _ => IndexMap::new(),
        };
        Self { entries }
    }

    /// Count reported under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<u64> {
        self.entries.get(key).copied()
    }

    #[must_use]
    pub fn inserted(&self) -> Option<u64> {
        self.get(ROWS_INSERTED)
    }

    #[must_use]
    pub fn updated(&self) -> Option<u64> {
        self.get(ROWS_UPDATED)
    }

    #[must_use]
    pub fn deleted(&self) -> Option<u64> {
        self.get(ROWS_DELETED)
    }

    /// Total rows affected, `None` when nothing was reported.
    #[must_use]
    pub fn affected_rows(&self) -> Option<u64> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.values().sum())
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

fn count_of(value: &RowValues) -> Option<u64> {
    match value {
        RowValues::Int(n) => u64::try_from(*n).ok(),
        RowValues::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Outcome of a successful dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchResult {
    pub kind: StatementKind,
    /// Generation of the statement now in the current slot.
    pub generation: u64,
    /// Rows affected, for manipulation statements.
    pub affected: Option<u64>,
}

/// Execute one top-level statement through the handle.
///
/// Clears the previous statistics, runs `sql`, and on success stores the new
/// statement in the handle's current slot. Manipulation statements have their
/// statistics row pulled immediately. Success is decided by the engine's error
/// flag, not by the classification.
///
/// # Errors
/// `AdapterError::ConnectionFailure` when the handle is not connected, or
/// `AdapterError::StatementError` with the engine's message.
pub fn execute(handle: &mut EngineHandle, sql: &str) -> Result<DispatchResult, AdapterError> {
    handle.stats.clear();
    let generation = handle.next_generation();
    let engine = handle.engine_mut()?;
    let manipulation = engine.is_manipulation(sql);
    let raw = engine.query(sql);
    let verb = engine.last_verb();
    if let Err(e) = translate::check(engine) {
        debug!(sql, error = %e, "statement failed");
        handle.current = None;
        return Err(e);
    }

    let mut raw = raw.unwrap_or_default();
    let (kind, affected) = if manipulation {
        if let Some(row) = raw.fetch(FetchMode::Assoc) {
            handle.stats = QueryStats::from_row(&row);
        }
        (StatementKind::Manipulation, handle.stats.affected_rows())
    } else {
        (StatementKind::Query, None)
    };
    debug!(sql, ?verb, ?kind, ?affected, generation, "statement dispatched");
    handle.current = Some(Statement::new(raw, kind, verb, generation));
    Ok(DispatchResult {
        kind,
        generation,
        affected,
    })
}

/// Run a control statement (transaction verbs) without touching the current
/// statement or its statistics.
///
/// # Errors
/// Same as [`execute`].
pub fn execute_control(handle: &mut EngineHandle, sql: &str) -> Result<(), AdapterError> {
    let engine = handle.engine_mut()?;
    engine.exec(sql);
    translate::check(engine)?;
    debug!(sql, "control statement executed");
    Ok(())
}
