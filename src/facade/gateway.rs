use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::{AdapterCore, HostAdapter, ResultHandle};
use crate::catalog::FieldDescription;
use crate::config::ConnectOptions;
use crate::error::AdapterError;
use crate::handle::SharedEngine;
use crate::limit;
use crate::placeholders::BindParams;
use crate::quote;
use crate::results::{DbRow, FetchedRow};
use crate::translate::HostError;
use crate::types::{FetchMode, RowValues};

/// Errors raised by the table-gateway contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Connection, transaction, feature and schema failures.
    #[error(transparent)]
    Adapter(AdapterError),

    /// The engine rejected a statement. `sql` is the statement as sent, when
    /// the failing call ran one.
    #[error("{message}")]
    Statement { message: String, sql: Option<String> },
}

impl GatewayError {
    fn with_sql(self, statement: &str) -> Self {
        match self {
            GatewayError::Statement { message, sql: None } => GatewayError::Statement {
                message,
                sql: Some(statement.to_owned()),
            },
            other => other,
        }
    }
}

impl HostError for GatewayError {
    fn from_adapter(err: AdapterError) -> Self {
        match err {
            AdapterError::StatementError { message } => {
                GatewayError::Statement { message, sql: None }
            }
            other => GatewayError::Adapter(other),
        }
    }
}

/// Table-gateway facade.
///
/// Created with its connect options and connected lazily: any call that
/// needs the engine connects first.
#[derive(Debug)]
pub struct Gateway {
    core: AdapterCore,
    opts: ConnectOptions,
}

impl HostAdapter for Gateway {
    type Error = GatewayError;

    const CONTRACT: &'static str = "gateway";

    fn core(&self) -> &AdapterCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AdapterCore {
        &mut self.core
    }
}

impl Gateway {
    #[must_use]
    pub fn new(engine: SharedEngine, opts: impl Into<ConnectOptions>) -> Self {
        Self {
            core: AdapterCore::new(engine),
            opts: opts.into(),
        }
    }

    /// Connect now rather than on first use. Connecting twice is a no-op.
    ///
    /// # Errors
    /// `ConnectionFailure` when the engine cannot be loaded or opened.
    pub fn connect(&mut self) -> Result<(), GatewayError> {
        if self.core.is_connected() {
            return Ok(());
        }
        let opts = self.opts.clone();
        Self::to_host(self.core.connect(opts))
    }

    pub fn close_connection(&mut self) {
        self.core.disconnect();
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.core.is_connected()
    }

    /// Run `sql` with `bind` substituted for its placeholders.
    ///
    /// # Errors
    /// `Statement` for unbound placeholders or engine failures; connection
    /// failures otherwise.
    pub fn query(&mut self, sql: &str, bind: &BindParams) -> Result<ResultHandle, GatewayError> {
        self.connect()?;
        let dispatched =
            Self::to_host(self.core.execute_bound(sql, bind)).map_err(|e| e.with_sql(sql))?;
        Ok(ResultHandle::new(self.shared_engine(), dispatched))
    }

    /// Every row of the result, flat.
    ///
    /// # Errors
    /// As [`Gateway::query`].
    pub fn fetch_all(&mut self, sql: &str, bind: &BindParams) -> Result<Vec<DbRow>, GatewayError> {
        let result = self.query(sql, bind)?;
        Ok(result
            .fetch_all(FetchMode::Assoc)
            .into_iter()
            .filter_map(|row| match row {
                FetchedRow::Flat(row) => Some(row),
                _ => None,
            })
            .collect())
    }

    /// # Errors
    /// As [`Gateway::query`].
    pub fn fetch_row(
        &mut self,
        sql: &str,
        bind: &BindParams,
    ) -> Result<Option<DbRow>, GatewayError> {
        Ok(self.query(sql, bind)?.fetch_assoc())
    }

    /// First column of every row.
    ///
    /// # Errors
    /// As [`Gateway::query`].
    pub fn fetch_col(
        &mut self,
        sql: &str,
        bind: &BindParams,
    ) -> Result<Vec<RowValues>, GatewayError> {
        Ok(self.query(sql, bind)?.fetch_col(0))
    }

    /// First column of the first row.
    ///
    /// # Errors
    /// As [`Gateway::query`].
    pub fn fetch_one(
        &mut self,
        sql: &str,
        bind: &BindParams,
    ) -> Result<Option<RowValues>, GatewayError> {
        Ok(self.query(sql, bind)?.fetch_one())
    }

    /// First column as key, second as value. Later rows win on duplicate keys;
    /// a NULL key becomes the empty string.
    ///
    /// # Errors
    /// As [`Gateway::query`].
    pub fn fetch_pairs(
        &mut self,
        sql: &str,
        bind: &BindParams,
    ) -> Result<IndexMap<String, RowValues>, GatewayError> {
        let result = self.query(sql, bind)?;
        Ok(result
            .fetch_all(FetchMode::Num)
            .into_iter()
            .map(|row| {
                let mut values = row.into_values().into_iter();
                let key = values.next().and_then(|k| k.to_text()).unwrap_or_default();
                (key, values.next().unwrap_or(RowValues::Null))
            })
            .collect())
    }

    /// Insert one row built from `data`. Returns the affected row count.
    ///
    /// # Errors
    /// `Statement` for an empty `data` or engine failures.
    pub fn insert(
        &mut self,
        table: &str,
        data: &IndexMap<String, RowValues>,
    ) -> Result<u64, GatewayError> {
        if data.is_empty() {
            return Err(GatewayError::Statement {
                message: format!("no values to insert into {table}"),
                sql: None,
            });
        }
        self.connect()?;
        let columns: Vec<String> = data.keys().map(|c| quote::identifier(c)).collect();
        let values = data
            .values()
            .map(|v| self.core.quote_value(v, None))
            .collect::<Result<Vec<_>, _>>();
        let values = Self::to_host(values)?;
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote::identifier(table),
            columns.join(", "),
            values.join(", ")
        );
        self.manipulate(&sql)
    }

    /// Set `data` on the rows matching `where_clause` (all rows when `None`).
    ///
    /// # Errors
    /// `Statement` for an empty `data` or engine failures.
    pub fn update(
        &mut self,
        table: &str,
        data: &IndexMap<String, RowValues>,
        where_clause: Option<&str>,
    ) -> Result<u64, GatewayError> {
        if data.is_empty() {
            return Err(GatewayError::Statement {
                message: format!("no values to update in {table}"),
                sql: None,
            });
        }
        self.connect()?;
        let assignments = data
            .iter()
            .map(|(column, value)| {
                self.core
                    .quote_value(value, None)
                    .map(|literal| format!("{} = {literal}", quote::identifier(column)))
            })
            .collect::<Result<Vec<_>, _>>();
        let assignments = Self::to_host(assignments)?;
        let sql = format!(
            "UPDATE {} SET {}{}",
            quote::identifier(table),
            assignments.join(", "),
            where_suffix(where_clause)
        );
        self.manipulate(&sql)
    }

    /// Delete the rows matching `where_clause` (all rows when `None`).
    ///
    /// # Errors
    /// `Statement` for engine failures.
    pub fn delete(&mut self, table: &str, where_clause: Option<&str>) -> Result<u64, GatewayError> {
        let sql = format!("DELETE FROM {}{}", quote::identifier(table), where_suffix(where_clause));
        self.manipulate(&sql)
    }

    /// Runs already-quoted DML as is, so a `?` in caller text is not bound.
    fn manipulate(&mut self, sql: &str) -> Result<u64, GatewayError> {
        self.connect()?;
        let dispatched = Self::to_host(self.core.execute(sql)).map_err(|e| e.with_sql(sql))?;
        let affected = dispatched.affected.unwrap_or(0);
        debug!(sql, affected, "gateway manipulation");
        Ok(affected)
    }

    /// # Errors
    /// Connection failures.
    pub fn quote(&mut self, value: &RowValues) -> Result<String, GatewayError> {
        self.connect()?;
        Self::to_host(self.core.quote_value(value, None))
    }

    /// Replace every `?` in `text` with the quoted `value`.
    ///
    /// # Errors
    /// Connection failures.
    pub fn quote_into(&mut self, text: &str, value: &RowValues) -> Result<String, GatewayError> {
        let literal = self.quote(value)?;
        Ok(text.replace('?', &literal))
    }

    #[must_use]
    pub fn quote_identifier(&self, name: &str) -> String {
        quote::identifier(name)
    }

    #[must_use]
    pub fn limit(&self, sql: &str, count: u64, offset: Option<u64>) -> String {
        limit::apply(sql, count, offset).into_owned()
    }

    /// Fields of `table` keyed by column name, in declaration order.
    ///
    /// # Errors
    /// `Statement` for unknown tables; connection failures.
    pub fn describe_table(
        &mut self,
        table: &str,
    ) -> Result<IndexMap<String, FieldDescription>, GatewayError> {
        self.connect()?;
        let fields = Self::to_host(self.core.describe(table))?;
        Ok(fields.into_iter().map(|f| (f.name.clone(), f)).collect())
    }

    /// # Errors
    /// Connection failures.
    pub fn list_tables(&mut self) -> Result<Vec<String>, GatewayError> {
        self.connect()?;
        Self::to_host(self.core.list_tables())
    }

    /// # Errors
    /// Connection or engine failures.
    pub fn begin_transaction(&mut self) -> Result<(), GatewayError> {
        self.connect()?;
        Self::to_host(self.core.begin(None))
    }

    /// # Errors
    /// `InvalidTransactionState` without an open transaction.
    pub fn commit(&mut self) -> Result<(), GatewayError> {
        self.connect()?;
        Self::to_host(self.core.commit(None))
    }

    /// # Errors
    /// `InvalidTransactionState` without an open transaction.
    pub fn rollback(&mut self) -> Result<(), GatewayError> {
        self.connect()?;
        Self::to_host(self.core.rollback(None))
    }

    /// # Errors
    /// Connection failures.
    pub fn last_insert_id(&mut self) -> Result<i64, GatewayError> {
        self.connect()?;
        Self::to_host(self.core.last_insert_id())
    }

    /// # Errors
    /// Connection failures.
    pub fn server_version(&mut self) -> Result<String, GatewayError> {
        self.connect()?;
        Self::to_host(self.core.server_version())
    }

    /// # Errors
    /// Connection failures for engine options.
    pub fn get_option(&self, name: &str) -> Result<Option<Value>, GatewayError> {
        Self::to_host(self.core.get_option(name))
    }

    /// # Errors
    /// Connection failures for engine options; `UnsupportedFeature` for
    /// values the engine refuses.
    pub fn set_option(&mut self, name: &str, value: Value) -> Result<(), GatewayError> {
        Self::to_host(self.core.set_option(name, value))
    }
}

fn where_suffix(where_clause: Option<&str>) -> String {
    match where_clause.map(str::trim) {
        Some(clause) if !clause.is_empty() => format!(" WHERE {clause}"),
        _ => String::new(),
    }
}
