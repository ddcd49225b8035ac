// Facade module - one struct per host relational-access contract.
//
// - datasource: schema-aware data source with table-nested rows and a stored last error
// - driver: result handles, error codes, prepared statements, sequences
// - gateway: table-gateway helpers raising typed errors
//
// All three share `AdapterCore`, which composes the engine handle, the
// dispatcher, the result mapper, the transaction bridge and option routing.

pub mod datasource;
pub mod driver;
pub mod gateway;

use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::catalog::{self, ColumnKind, ColumnSpec, FieldDescription};
use crate::config::ConnectOptions;
use crate::dispatch::{self, DispatchResult, QueryStats};
use crate::engine::Engine;
use crate::error::AdapterError;
use crate::handle::{EngineHandle, SharedEngine};
use crate::mapper;
use crate::options::OptionBag;
use crate::placeholders::{self, BindParams};
use crate::quote;
use crate::results::{DbRow, FetchedRow};
use crate::statement::{Statement, StatementKind};
use crate::transaction::TransactionBridge;
use crate::translate::{self, HostError};
use crate::types::{FetchMode, RowValues};

pub use datasource::{DataSource, LastError};
pub use driver::{Driver, DriverError, DriverErrorCode, Prepared};
pub use gateway::{Gateway, GatewayError};

/// What every facade is built from.
///
/// A facade exposes its host contract's method set; the trait ties it to the
/// shared core and to the host's error convention.
pub trait HostAdapter {
    /// The host contract's error representation.
    type Error: HostError;

    /// Short name of the host contract, used in logs.
    const CONTRACT: &'static str;

    fn core(&self) -> &AdapterCore;

    fn core_mut(&mut self) -> &mut AdapterCore;

    /// The engine handle this facade shares with any others.
    fn shared_engine(&self) -> SharedEngine {
        Rc::clone(self.core().engine())
    }

    fn in_transaction(&self) -> bool {
        self.core().in_transaction()
    }

    /// Convert an adapter result into this host's convention.
    ///
    /// # Errors
    /// Returns the host translation of the adapter error.
    fn to_host<T>(result: Result<T, AdapterError>) -> Result<T, Self::Error> {
        translate::into_host(result)
    }
}

/// State and behaviour shared by the three facades.
#[derive(Debug)]
pub struct AdapterCore {
    engine: SharedEngine,
    transactions: TransactionBridge,
    options: OptionBag,
    config: Option<ConnectOptions>,
}

impl AdapterCore {
    #[must_use]
    pub fn new(engine: SharedEngine) -> Self {
        Self {
            engine,
            transactions: TransactionBridge::new(),
            options: OptionBag::new(),
            config: None,
        }
    }

    #[must_use]
    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    /// Options of the last successful connect.
    #[must_use]
    pub fn config(&self) -> Option<&ConnectOptions> {
        self.config.as_ref()
    }

    /// Bind the shared engine to `opts.path`.
    ///
    /// Connecting to the path the engine is already bound to succeeds without
    /// reopening.
    ///
    /// # Errors
    /// `ConnectionFailure` when the engine cannot be loaded or opened.
    pub fn connect(&mut self, opts: ConnectOptions) -> Result<(), AdapterError> {
        {
            let mut handle = self.engine.borrow_mut();
            let engine = handle.acquire()?;
            engine.set_extension(&opts.extension);
            translate::check_connection(engine)?;
            handle.open(&opts.path)?;
            let engine = handle.engine_mut()?;
            engine.set_charset(&opts.charset);
            translate::check_connection(engine)?;
            engine.set_engine_mode(opts.engine_mode);
            translate::check_connection(engine)?;
            info!(connection_id = ?handle.connection_id(), path = %opts.path, "adapter connected");
        }
        self.config = Some(opts);
        Ok(())
    }

    /// Release the engine, forget the current statement and close any open
    /// transaction. Persistent connections keep the engine bound.
    pub fn disconnect(&mut self) {
        let mut handle = self.engine.borrow_mut();
        self.transactions.abandon(&mut handle);
        handle.clear_current();
        if self.config.as_ref().is_some_and(|c| c.persistent) {
            debug!("persistent connection kept open");
        } else {
            handle.terminate();
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.engine.borrow().is_alive()
    }

    /// Run one top-level statement.
    ///
    /// # Errors
    /// `ConnectionFailure` when not connected, `StatementError` from the engine.
    pub fn execute(&mut self, sql: &str) -> Result<DispatchResult, AdapterError> {
        dispatch::execute(&mut self.engine.borrow_mut(), sql)
    }

    /// Bind `params` into `sql` with engine quoting, then run it.
    ///
    /// # Errors
    /// As [`AdapterCore::execute`], plus `StatementError` for unbound placeholders.
    pub fn execute_bound(
        &mut self,
        sql: &str,
        params: &BindParams,
    ) -> Result<DispatchResult, AdapterError> {
        execute_bound(&self.engine, sql, params)
    }

    /// Render `sql` with `params` substituted.
    ///
    /// # Errors
    /// `ConnectionFailure` when not connected; `StatementError` for unbound
    /// placeholders.
    pub fn bind(&self, sql: &str, params: &BindParams) -> Result<String, AdapterError> {
        bind_statement(&self.engine.borrow(), sql, params)
    }

    /// Run `f` against the live engine.
    ///
    /// # Errors
    /// `ConnectionFailure` when not connected.
    pub fn with_engine<R>(&self, f: impl FnOnce(&dyn Engine) -> R) -> Result<R, AdapterError> {
        let handle = self.engine.borrow();
        Ok(f(handle.engine()?))
    }

    /// Run `f` against the live engine and check its error flag afterwards.
    ///
    /// # Errors
    /// `ConnectionFailure` when not connected, `StatementError` when the
    /// engine flags a failure.
    pub fn with_engine_mut<R>(
        &self,
        f: impl FnOnce(&mut dyn Engine) -> R,
    ) -> Result<R, AdapterError> {
        let mut handle = self.engine.borrow_mut();
        let engine = handle.engine_mut()?;
        let out = f(&mut *engine);
        translate::check(engine)?;
        Ok(out)
    }

    fn with_statement<R>(&self, f: impl FnOnce(&mut Statement) -> R) -> Option<R> {
        self.engine.borrow_mut().current_mut().map(f)
    }

    /// Next row of the current statement, nested by table for SELECTs.
    #[must_use]
    pub fn next_row(&self) -> Option<FetchedRow> {
        self.with_statement(mapper::next_row).flatten()
    }

    /// Remaining rows of the current statement, nested by table for SELECTs.
    #[must_use]
    pub fn fetch_all(&self) -> Vec<FetchedRow> {
        self.with_statement(mapper::fetch_all).unwrap_or_default()
    }

    #[must_use]
    pub fn row_count(&self) -> Option<usize> {
        mapper::row_count(&self.engine.borrow())
    }

    #[must_use]
    pub fn column_count(&self) -> Option<usize> {
        mapper::column_count(&self.engine.borrow())
    }

    #[must_use]
    pub fn has_result(&self) -> bool {
        mapper::has_result(&self.engine.borrow())
    }

    #[must_use]
    pub fn stats(&self) -> QueryStats {
        self.engine.borrow().stats().clone()
    }

    /// Fields of `table`, without housekeeping columns.
    ///
    /// # Errors
    /// `ConnectionFailure` when not connected, `StatementError` when the
    /// engine cannot describe the table.
    pub fn describe(&mut self, table: &str) -> Result<Vec<FieldDescription>, AdapterError> {
        let sql = format!("DESCRIBE {}", quote::identifier(table));
        let mut handle = self.engine.borrow_mut();
        dispatch::execute(&mut handle, &sql)?;
        let rows = handle
            .current_mut()
            .map(|stmt| mapper::fetch_all_as(stmt, FetchMode::Assoc))
            .unwrap_or_default();
        Ok(rows
            .iter()
            .filter_map(FetchedRow::as_flat)
            .filter_map(catalog::describe_field)
            .collect())
    }

    /// # Errors
    /// `ConnectionFailure` when not connected, `StatementError` from the engine.
    pub fn list_tables(&self) -> Result<Vec<String>, AdapterError> {
        self.with_engine_mut(|engine| engine.list_tables())
    }

    /// Render `value` as a literal for a column of `kind`.
    ///
    /// # Errors
    /// `ConnectionFailure` when not connected.
    pub fn quote_value(
        &self,
        value: &RowValues,
        kind: Option<ColumnKind>,
    ) -> Result<String, AdapterError> {
        self.with_engine(|engine| quote::value(engine, value, kind))
    }

    /// Column-definition fragment with defaults quoted by the engine.
    ///
    /// # Errors
    /// `ConnectionFailure` when not connected, `SchemaError` for a bad spec.
    pub fn build_column(&self, spec: &ColumnSpec) -> Result<String, AdapterError> {
        self.with_engine(|engine| {
            catalog::build_column_clause(spec, |value, kind| {
                quote::value(engine, value, Some(kind))
            })
        })?
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.transactions.in_transaction(&self.engine.borrow())
    }

    /// # Errors
    /// See [`TransactionBridge::begin`].
    pub fn begin(&mut self, savepoint: Option<&str>) -> Result<(), AdapterError> {
        self.transactions.begin(&mut self.engine.borrow_mut(), savepoint)
    }

    /// # Errors
    /// See [`TransactionBridge::commit`].
    pub fn commit(&mut self, savepoint: Option<&str>) -> Result<(), AdapterError> {
        self.transactions.commit(&mut self.engine.borrow_mut(), savepoint)
    }

    /// # Errors
    /// See [`TransactionBridge::rollback`].
    pub fn rollback(&mut self, savepoint: Option<&str>) -> Result<(), AdapterError> {
        self.transactions.rollback(&mut self.engine.borrow_mut(), savepoint)
    }

    /// # Errors
    /// `ConnectionFailure` when reading an engine option while not connected.
    pub fn get_option(&self, name: &str) -> Result<Option<Value>, AdapterError> {
        self.options.get(&self.engine.borrow(), name)
    }

    /// # Errors
    /// `ConnectionFailure` when writing an engine option while not connected;
    /// `UnsupportedFeature` for read-only or invalid engine values.
    pub fn set_option(&mut self, name: &str, value: Value) -> Result<(), AdapterError> {
        self.options.set(&mut self.engine.borrow_mut(), name, value)
    }

    /// # Errors
    /// `ConnectionFailure` when not connected.
    pub fn encoding(&self) -> Result<String, AdapterError> {
        self.with_engine(|engine| engine.charset())
    }

    /// # Errors
    /// `ConnectionFailure` when not connected.
    pub fn set_encoding(&self, charset: &str) -> Result<(), AdapterError> {
        self.with_engine_mut(|engine| engine.set_charset(charset))
    }

    /// # Errors
    /// `ConnectionFailure` when not connected.
    pub fn last_insert_id(&self) -> Result<i64, AdapterError> {
        self.with_engine(|engine| engine.last_insert_id())
    }

    /// # Errors
    /// `ConnectionFailure` when not connected.
    pub fn server_version(&self) -> Result<String, AdapterError> {
        self.with_engine(|engine| engine.version())
    }
}

fn bind_statement(
    handle: &EngineHandle,
    sql: &str,
    params: &BindParams,
) -> Result<String, AdapterError> {
    let engine = handle.engine()?;
    placeholders::bind(sql, params, |v| quote::value(engine, v, None)).map(|s| s.into_owned())
}

/// Bind and run `sql` through the shared handle.
fn execute_bound(
    engine: &SharedEngine,
    sql: &str,
    params: &BindParams,
) -> Result<DispatchResult, AdapterError> {
    let bound = bind_statement(&engine.borrow(), sql, params)?;
    dispatch::execute(&mut engine.borrow_mut(), &bound)
}

/// A query result as seen by the driver and gateway contracts.
///
/// It does not own rows: every read goes to the handle's single current
/// statement. Once another statement runs through any facade sharing the
/// handle, this result is stale and reads the newer statement. Reads still
/// proceed, with a warning; use [`ResultHandle::is_stale`] to check first.
#[derive(Debug, Clone)]
pub struct ResultHandle {
    engine: SharedEngine,
    generation: u64,
    kind: StatementKind,
    affected: Option<u64>,
}

impl ResultHandle {
    pub(crate) fn new(engine: SharedEngine, dispatched: DispatchResult) -> Self {
        Self {
            engine,
            generation: dispatched.generation,
            kind: dispatched.kind,
            affected: dispatched.affected,
        }
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Rows affected, for manipulation statements.
    #[must_use]
    pub fn affected_rows(&self) -> Option<u64> {
        self.affected
    }

    /// Whether a newer statement has replaced this one.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.engine.borrow().current_generation() != self.generation
    }

    fn warn_if_stale(&self, handle: &EngineHandle) {
        let current = handle.current_generation();
        if current != self.generation {
            warn!(
                generation = self.generation,
                current, "reading a result replaced by a newer statement"
            );
        }
    }

    fn with_statement<R>(&self, f: impl FnOnce(&mut Statement) -> R) -> Option<R> {
        let mut handle = self.engine.borrow_mut();
        self.warn_if_stale(&handle);
        handle.current_mut().map(f)
    }

    /// Next row in the requested shape.
    #[must_use]
    pub fn fetch_row(&self, mode: FetchMode) -> Option<FetchedRow> {
        self.with_statement(|stmt| mapper::next_row_as(stmt, mode))
            .flatten()
    }

    /// Next row as a flat associative row.
    #[must_use]
    pub fn fetch_assoc(&self) -> Option<DbRow> {
        match self.fetch_row(FetchMode::Assoc)? {
            FetchedRow::Flat(row) => Some(row),
            _ => None,
        }
    }

    /// Next row re-shaped by owning table (SELECT results).
    #[must_use]
    pub fn fetch_nested(&self) -> Option<FetchedRow> {
        self.with_statement(mapper::next_row).flatten()
    }

    /// First value of the next row.
    #[must_use]
    pub fn fetch_one(&self) -> Option<RowValues> {
        self.fetch_row(FetchMode::Num)?.into_values().into_iter().next()
    }

    /// Value at `column` of every remaining row.
    #[must_use]
    pub fn fetch_col(&self, column: usize) -> Vec<RowValues> {
        self.fetch_all(FetchMode::Num)
            .into_iter()
            .map(|row| {
                row.into_values()
                    .into_iter()
                    .nth(column)
                    .unwrap_or(RowValues::Null)
            })
            .collect()
    }

    /// Every remaining row.
    #[must_use]
    pub fn fetch_all(&self, mode: FetchMode) -> Vec<FetchedRow> {
        self.with_statement(|stmt| mapper::fetch_all_as(stmt, mode))
            .unwrap_or_default()
    }

    /// Rows in the result; `None` when no statement is current.
    #[must_use]
    pub fn num_rows(&self) -> Option<usize> {
        let handle = self.engine.borrow();
        self.warn_if_stale(&handle);
        mapper::row_count(&handle)
    }

    /// Columns in the result; `None` when no statement is current.
    #[must_use]
    pub fn num_cols(&self) -> Option<usize> {
        let handle = self.engine.borrow();
        self.warn_if_stale(&handle);
        mapper::column_count(&handle)
    }
}
