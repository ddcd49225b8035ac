use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::{AdapterCore, HostAdapter, ResultHandle, execute_bound};
use crate::catalog::{ColumnKind, FieldDescription};
use crate::config::ConnectOptions;
use crate::error::{AdapterError, ErrorKind};
use crate::handle::SharedEngine;
use crate::limit;
use crate::placeholders::BindParams;
use crate::translate::HostError;
use crate::types::RowValues;

/// Numeric error codes of the driver contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverErrorCode {
    Statement,
    Unsupported,
    ConnectFailed,
    TransactionState,
    Schema,
}

impl DriverErrorCode {
    /// Stable numeric value handed to hosts that compare codes.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        match self {
            DriverErrorCode::Statement => -1,
            DriverErrorCode::Unsupported => -21,
            DriverErrorCode::ConnectFailed => -24,
            DriverErrorCode::TransactionState => -33,
            DriverErrorCode::Schema => -35,
        }
    }
}

impl From<ErrorKind> for DriverErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::ConnectionFailure => DriverErrorCode::ConnectFailed,
            ErrorKind::UnsupportedFeature => DriverErrorCode::Unsupported,
            ErrorKind::InvalidTransactionState => DriverErrorCode::TransactionState,
            ErrorKind::StatementError => DriverErrorCode::Statement,
            ErrorKind::SchemaError => DriverErrorCode::Schema,
        }
    }
}

/// Error object of the driver contract.
///
/// `native_message` is the engine's own text and is only present for
/// statements the engine rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DriverError {
    pub code: DriverErrorCode,
    pub native_message: Option<String>,
    pub message: String,
}

impl HostError for DriverError {
    fn from_adapter(err: AdapterError) -> Self {
        let native_message = match &err {
            AdapterError::StatementError { message } => Some(message.clone()),
            _ => None,
        };
        Self {
            code: err.kind().into(),
            native_message,
            message: err.to_string(),
        }
    }
}

/// Driver-style facade: statements return result handles, failures return
/// [`DriverError`]s which are also kept for [`Driver::error_info`].
#[derive(Debug)]
pub struct Driver {
    core: AdapterCore,
    last_error: ErrorSlot,
    pending_limit: Option<(u64, Option<u64>)>,
}

impl HostAdapter for Driver {
    type Error = DriverError;

    const CONTRACT: &'static str = "driver";

    fn core(&self) -> &AdapterCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AdapterCore {
        &mut self.core
    }
}

impl Driver {
    #[must_use]
    pub fn new(engine: SharedEngine) -> Self {
        Self {
            core: AdapterCore::new(engine),
            last_error: ErrorSlot::default(),
            pending_limit: None,
        }
    }

    fn record<T>(&mut self, result: Result<T, AdapterError>) -> Result<T, DriverError> {
        record(&self.last_error, result)
    }

    /// # Errors
    /// `ConnectFailed` when the engine cannot be loaded or the file opened.
    pub fn connect(&mut self, opts: impl Into<ConnectOptions>) -> Result<(), DriverError> {
        let result = self.core.connect(opts.into());
        self.record(result)
    }

    pub fn disconnect(&mut self) {
        self.pending_limit = None;
        self.core.disconnect();
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.core.is_connected()
    }

    /// Run `sql` and hand back a handle to its result.
    ///
    /// A limit set with [`Driver::set_limit`] is applied here and then cleared.
    ///
    /// # Errors
    /// `ConnectFailed` when not connected, `Statement` from the engine.
    pub fn query(&mut self, sql: &str) -> Result<ResultHandle, DriverError> {
        let sql = match self.pending_limit.take() {
            Some((count, offset)) => limit::apply(sql, count, offset),
            None => sql.into(),
        };
        let result = self.core.execute(&sql);
        let dispatched = self.record(result)?;
        Ok(ResultHandle::new(self.shared_engine(), dispatched))
    }

    /// Run a statement for its side effects.
    ///
    /// # Errors
    /// `ConnectFailed` when not connected, `Statement` from the engine.
    pub fn exec(&mut self, sql: &str) -> Result<u64, DriverError> {
        let result = self.core.execute(sql);
        let dispatched = self.record(result)?;
        debug!(sql, affected = ?dispatched.affected, "driver exec");
        Ok(dispatched.affected.unwrap_or(0))
    }

    /// Keep `sql` for repeated execution with different values.
    ///
    /// # Errors
    /// `ConnectFailed` when not connected.
    pub fn prepare(&mut self, sql: &str) -> Result<Prepared, DriverError> {
        if !self.is_connected() {
            return self.record(Err(AdapterError::not_connected()));
        }
        Ok(Prepared {
            engine: self.shared_engine(),
            sql: sql.to_owned(),
            last_error: Rc::clone(&self.last_error),
        })
    }

    /// # Errors
    /// `Unsupported` for a savepoint name; engine failures otherwise.
    pub fn begin_transaction(&mut self, savepoint: Option<&str>) -> Result<(), DriverError> {
        let result = self.core.begin(savepoint);
        self.record(result)
    }

    /// # Errors
    /// `Unsupported` for a savepoint name, `TransactionState` without an
    /// open transaction.
    pub fn commit(&mut self, savepoint: Option<&str>) -> Result<(), DriverError> {
        let result = self.core.commit(savepoint);
        self.record(result)
    }

    /// # Errors
    /// As [`Driver::commit`].
    pub fn rollback(&mut self, savepoint: Option<&str>) -> Result<(), DriverError> {
        let result = self.core.rollback(savepoint);
        self.record(result)
    }

    /// # Errors
    /// `ConnectFailed` for engine options while not connected, `Unsupported`
    /// for values the engine refuses.
    pub fn set_option(&mut self, name: &str, value: Value) -> Result<(), DriverError> {
        let result = self.core.set_option(name, value);
        self.record(result)
    }

    /// # Errors
    /// `ConnectFailed` for engine options while not connected.
    pub fn get_option(&mut self, name: &str) -> Result<Option<Value>, DriverError> {
        let result = self.core.get_option(name);
        self.record(result)
    }

    /// Id generated by the last insert. The engine keeps one per connection,
    /// so `table` and `field` are accepted for the contract only.
    ///
    /// # Errors
    /// `ConnectFailed` when not connected.
    pub fn last_insert_id(
        &mut self,
        _table: Option<&str>,
        _field: Option<&str>,
    ) -> Result<i64, DriverError> {
        let result = self.core.last_insert_id();
        self.record(result)
    }

    /// Reserve the next id of `table`'s sequence.
    ///
    /// # Errors
    /// `ConnectFailed` when not connected, `Statement` when the engine cannot
    /// read or advance the sequence.
    pub fn next_id(&mut self, table: &str) -> Result<i64, DriverError> {
        let result = self
            .core
            .with_engine_mut(|engine| engine.next_id(table))
            .and_then(|id| self.advance_sequence(table, id + 1).map(|()| id));
        self.record(result)
    }

    /// Make `next` the id handed out by the following [`Driver::next_id`].
    ///
    /// # Errors
    /// As [`Driver::next_id`].
    pub fn set_next_id(&mut self, table: &str, next: i64) -> Result<(), DriverError> {
        let result = self.advance_sequence(table, next);
        self.record(result)
    }

    fn advance_sequence(&self, table: &str, next: i64) -> Result<(), AdapterError> {
        if self.core.with_engine_mut(|engine| engine.set_next_id(table, next))? {
            Ok(())
        } else {
            Err(AdapterError::StatementError {
                message: format!("cannot set next id of {table} to {next}"),
            })
        }
    }

    /// `text` with quotes escaped, without surrounding quotes.
    ///
    /// # Errors
    /// `ConnectFailed` when not connected.
    pub fn escape(&mut self, text: &str) -> Result<String, DriverError> {
        let result = self.core.with_engine(|engine| engine.escape_string(text));
        self.record(result)
    }

    /// # Errors
    /// `ConnectFailed` when not connected.
    pub fn quote(
        &mut self,
        value: &RowValues,
        kind: Option<ColumnKind>,
    ) -> Result<String, DriverError> {
        let result = self.core.quote_value(value, kind);
        self.record(result)
    }

    /// Bound the next [`Driver::query`] to `count` rows after `offset`.
    /// A zero `count` clears a pending limit.
    pub fn set_limit(&mut self, count: u64, offset: Option<u64>) {
        self.pending_limit = (count > 0).then_some((count, offset));
    }

    /// # Errors
    /// `ConnectFailed` when not connected, `Statement` for unknown tables.
    pub fn table_info(&mut self, table: &str) -> Result<Vec<FieldDescription>, DriverError> {
        let result = self.core.describe(table);
        self.record(result)
    }

    /// # Errors
    /// `ConnectFailed` when not connected.
    pub fn list_tables(&mut self) -> Result<Vec<String>, DriverError> {
        let result = self.core.list_tables();
        self.record(result)
    }

    /// # Errors
    /// `ConnectFailed` when not connected.
    pub fn server_version(&mut self) -> Result<String, DriverError> {
        let result = self.core.server_version();
        self.record(result)
    }

    /// # Errors
    /// `ConnectFailed` when not connected.
    pub fn set_charset(&mut self, charset: &str) -> Result<(), DriverError> {
        let result = self.core.set_encoding(charset);
        self.record(result)
    }

    /// # Errors
    /// `ConnectFailed` when not connected.
    pub fn charset(&mut self) -> Result<String, DriverError> {
        let result = self.core.encoding();
        self.record(result)
    }

    /// The most recent failure of this driver or a statement it prepared.
    #[must_use]
    pub fn error_info(&self) -> Option<DriverError> {
        self.last_error.borrow().clone()
    }
}

/// Last failure, shared between a driver and its prepared statements.
type ErrorSlot = Rc<RefCell<Option<DriverError>>>;

fn record<T>(slot: &ErrorSlot, result: Result<T, AdapterError>) -> Result<T, DriverError> {
    Driver::to_host(result).inspect_err(|err| {
        let code = err.code.as_i32();
        warn!(contract = Driver::CONTRACT, code, error = %err, "call failed");
        slot.replace(Some(err.clone()));
    })
}

/// A statement prepared by [`Driver::prepare`].
///
/// Placeholders are bound client side on every execution.
#[derive(Debug, Clone)]
pub struct Prepared {
    engine: SharedEngine,
    sql: String,
    last_error: ErrorSlot,
}

impl Prepared {
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Run with `params` bound and return the result handle.
    ///
    /// # Errors
    /// `Statement` for unbound placeholders or engine failures.
    pub fn query(&self, params: &BindParams) -> Result<ResultHandle, DriverError> {
        let result = execute_bound(&self.engine, &self.sql, params);
        let dispatched = record(&self.last_error, result)?;
        Ok(ResultHandle::new(self.engine.clone(), dispatched))
    }

    /// Run with `params` bound and return the affected row count.
    ///
    /// # Errors
    /// As [`Prepared::query`].
    pub fn exec(&self, params: &BindParams) -> Result<u64, DriverError> {
        let result = execute_bound(&self.engine, &self.sql, params);
        let dispatched = record(&self.last_error, result)?;
        Ok(dispatched.affected.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedEngine;

    #[test]
    fn adapter_errors_keep_native_message() {
        let err = DriverError::from_adapter(AdapterError::StatementError {
            message: "no such table: t".into(),
        });
        assert_eq!(err.code, DriverErrorCode::Statement);
        assert_eq!(err.native_message.as_deref(), Some("no such table: t"));
        assert_eq!(err.message, "SQL execution error: no such table: t");

        let err = DriverError::from_adapter(AdapterError::UnsupportedFeature("x".into()));
        assert_eq!(err.code.as_i32(), -21);
        assert!(err.native_message.is_none());
    }

    #[test]
    fn pending_limit_applies_to_one_query() -> Result<(), DriverError> {
        let engine = ScriptedEngine::new();
        let script = engine.script();
        let mut driver = Driver::new(engine.into_handle().into_shared());
        driver.connect("test")?;
        driver.set_limit(10, Some(20));
        driver.query("SELECT * FROM t")?;
        driver.query("SELECT * FROM t")?;
        assert_eq!(
            script.borrow().executed(),
            ["SELECT * FROM t LIMIT 10 OFFSET 20", "SELECT * FROM t"]
        );
        Ok(())
    }

    #[test]
    fn failures_are_kept_for_error_info() {
        let mut driver = Driver::new(ScriptedEngine::new().into_handle().into_shared());
        assert!(driver.error_info().is_none());
        let err = driver.exec("DELETE FROM t").unwrap_err();
        assert_eq!(err.code, DriverErrorCode::ConnectFailed);
        assert_eq!(driver.error_info().as_ref(), Some(&err));
    }

    #[test]
    fn prepared_failures_reach_error_info() -> Result<(), DriverError> {
        let engine = ScriptedEngine::new();
        let script = engine.script();
        let mut driver = Driver::new(engine.into_handle().into_shared());
        driver.connect("test")?;
        let stmt = driver.prepare("UPDATE t SET a = ? WHERE id = ?")?;

        let err = stmt.exec(&BindParams::Positional(vec![RowValues::Int(1)])).unwrap_err();
        assert_eq!(err.code, DriverErrorCode::Statement);
        assert_eq!(driver.error_info().as_ref(), Some(&err));

        script.borrow_mut().push_error("database is locked");
        let params = BindParams::Positional(vec![RowValues::Int(1), RowValues::Int(2)]);
        let err = stmt.query(&params).unwrap_err();
        assert_eq!(err.native_message.as_deref(), Some("database is locked"));
        assert_eq!(driver.error_info(), Some(err));
        Ok(())
    }
}
