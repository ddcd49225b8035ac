use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};

use super::{AdapterCore, HostAdapter};
use crate::catalog::{self, ColumnKind, ColumnSpec, FieldDescription};
use crate::config::ConnectOptions;
use crate::dispatch::QueryStats;
use crate::error::{AdapterError, ErrorKind};
use crate::handle::SharedEngine;
use crate::limit;
use crate::results::FetchedRow;
use crate::statement::StatementKind;
use crate::translate::HostError;
use crate::types::RowValues;

/// The data-source contract's error: kept on the facade, read back on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    pub kind: ErrorKind,
    pub message: String,
}

impl HostError for LastError {
    fn from_adapter(err: AdapterError) -> Self {
        Self {
            kind: err.kind(),
            message: err.message().to_owned(),
        }
    }
}

impl fmt::Display for LastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Schema-aware data source.
///
/// Calls report failure through `bool`/`Option` returns; the reason is kept
/// in [`DataSource::last_error`] until the next call that can fail. SELECT
/// rows are handed out nested by owning table.
#[derive(Debug)]
pub struct DataSource {
    core: AdapterCore,
    last_error: Option<LastError>,
    affected: Option<u64>,
    num_rows: Option<usize>,
}

impl HostAdapter for DataSource {
    type Error = LastError;

    const CONTRACT: &'static str = "datasource";

    fn core(&self) -> &AdapterCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AdapterCore {
        &mut self.core
    }
}

impl DataSource {
    #[must_use]
    pub fn new(engine: SharedEngine) -> Self {
        Self {
            core: AdapterCore::new(engine),
            last_error: None,
            affected: None,
            num_rows: None,
        }
    }

    fn record<T>(&mut self, result: Result<T, AdapterError>) -> Option<T> {
        match Self::to_host(result) {
            Ok(value) => {
                self.last_error = None;
                Some(value)
            }
            Err(err) => {
                warn!(contract = Self::CONTRACT, kind = ?err.kind, error = %err, "call failed");
                self.last_error = Some(err);
                None
            }
        }
    }

    pub fn connect(&mut self, opts: impl Into<ConnectOptions>) -> bool {
        let result = self.core.connect(opts.into());
        self.record(result).is_some()
    }

    /// Always succeeds; see [`AdapterCore::disconnect`].
    pub fn disconnect(&mut self) -> bool {
        self.core.disconnect();
        self.affected = None;
        self.num_rows = None;
        true
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.core.is_connected()
    }

    /// Run `sql`, remembering affected and returned row counts.
    pub fn execute(&mut self, sql: &str) -> bool {
        let result = self.core.execute(sql);
        let Some(dispatched) = self.record(result) else {
            self.affected = None;
            self.num_rows = None;
            return false;
        };
        self.affected = dispatched.affected;
        self.num_rows = match dispatched.kind {
            StatementKind::Query => self.core.row_count(),
            StatementKind::Manipulation => None,
        };
        debug!(sql, affected = ?self.affected, num_rows = ?self.num_rows, "datasource executed");
        true
    }

    /// Next row of the last statement.
    pub fn fetch_row(&mut self) -> Option<FetchedRow> {
        self.core.next_row()
    }

    /// Run `sql` and return all of its rows.
    pub fn fetch_all(&mut self, sql: &str) -> Option<Vec<FetchedRow>> {
        if !self.execute(sql) {
            return None;
        }
        Some(self.core.fetch_all())
    }

    /// Fields of `table` in declaration order.
    pub fn describe(&mut self, table: &str) -> Option<Vec<FieldDescription>> {
        let result = self.core.describe(table);
        self.record(result)
    }

    pub fn list_sources(&mut self) -> Option<Vec<String>> {
        let result = self.core.list_tables();
        self.record(result)
    }

    /// SQL literal for `value` in a column of `kind`.
    pub fn value(&mut self, value: &RowValues, kind: Option<ColumnKind>) -> Option<String> {
        let result = self.core.quote_value(value, kind);
        self.record(result)
    }

    /// Abstract kind of a native type declaration.
    #[must_use]
    pub fn column(&self, native: &str) -> ColumnKind {
        catalog::to_abstract(native)
    }

    pub fn build_column(&mut self, spec: &ColumnSpec) -> Option<String> {
        let result = self.core.build_column(spec);
        self.record(result)
    }

    /// `sql` bounded to `count` rows after `offset`.
    #[must_use]
    pub fn limit(&self, sql: &str, count: u64, offset: Option<u64>) -> String {
        limit::apply(sql, count, offset).into_owned()
    }

    pub fn begin(&mut self) -> bool {
        let result = self.core.begin(None);
        self.record(result).is_some()
    }

    pub fn commit(&mut self) -> bool {
        let result = self.core.commit(None);
        self.record(result).is_some()
    }

    pub fn rollback(&mut self) -> bool {
        let result = self.core.rollback(None);
        self.record(result).is_some()
    }

    /// Message of the last failed call.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_ref().map(|e| e.message.as_str())
    }

    #[must_use]
    pub fn error(&self) -> Option<&LastError> {
        self.last_error.as_ref()
    }

    /// Rows changed by the last manipulation statement.
    #[must_use]
    pub fn last_affected(&self) -> Option<u64> {
        self.affected
    }

    /// Rows returned by the last query.
    #[must_use]
    pub fn last_num_rows(&self) -> Option<usize> {
        self.num_rows
    }

    #[must_use]
    pub fn last_num_fields(&self) -> Option<usize> {
        self.core.column_count()
    }

    pub fn last_insert_id(&mut self) -> Option<i64> {
        let result = self.core.last_insert_id();
        self.record(result)
    }

    pub fn set_encoding(&mut self, charset: &str) -> bool {
        let result = self.core.set_encoding(charset);
        self.record(result).is_some()
    }

    pub fn get_encoding(&mut self) -> Option<String> {
        let result = self.core.encoding();
        self.record(result)
    }

    #[must_use]
    pub fn has_result(&self) -> bool {
        self.core.has_result()
    }

    /// Statistics of the last manipulation statement.
    #[must_use]
    pub fn query_stats(&self) -> QueryStats {
        self.core.stats()
    }

    pub fn get_option(&mut self, name: &str) -> Option<Value> {
        let result = self.core.get_option(name);
        self.record(result).flatten()
    }

    pub fn set_option(&mut self, name: &str, value: Value) -> bool {
        let result = self.core.set_option(name, value);
        self.record(result).is_some()
    }
}
