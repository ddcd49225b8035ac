//! Convenient imports for common functionality.
//!
//! This module re-exports the types most host code touches, so a single
//! `use embedsql_adapters::prelude::*;` is enough to connect and query.

pub use crate::catalog::{ColumnKind, ColumnLength, ColumnSpec, FieldDescription};
pub use crate::config::{ConnectOptions, ConnectOptionsBuilder};
pub use crate::dispatch::QueryStats;
pub use crate::error::{AdapterError, ErrorKind};
pub use crate::facade::{
    DataSource, Driver, DriverError, DriverErrorCode, Gateway, GatewayError, HostAdapter,
    LastError, Prepared, ResultHandle,
};
pub use crate::handle::{EngineHandle, SharedEngine};
pub use crate::placeholders::BindParams;
pub use crate::results::{ColumnOwner, DbRow, FetchedRow, NestedRow};
pub use crate::statement::StatementKind;
pub use crate::types::{EngineMode, FetchMode, RowValues};

#[cfg(feature = "sqlite")]
pub use crate::engine::SqliteEngine;
