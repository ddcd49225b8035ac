//! Adapters that drive one embedded, file-backed SQL engine through three
//! host relational-access contracts.
//!
//! The engine is reached through the [`engine::Engine`] trait and owned by an
//! [`EngineHandle`]. Facades share the handle and expose their own contract:
//!
//! - [`DataSource`]: schema-aware data source, rows nested by owning table
//! - [`Driver`]: result handles, numeric error codes and prepared statements
//! - [`Gateway`]: table-gateway helpers raising typed errors
//!
//! ```no_run
//! use embedsql_adapters::prelude::*;
//!
//! # fn main() -> Result<(), DriverError> {
//! let engine = EngineHandle::sqlite().into_shared();
//! let mut driver = Driver::new(engine);
//! driver.connect("blog.db")?;
//! let result = driver.query("SELECT id, title FROM posts")?;
//! while let Some(row) = result.fetch_assoc() {
//!     println!("{:?}", row.get("title"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod facade;
pub mod handle;
pub mod limit;
pub mod mapper;
pub mod options;
pub mod placeholders;
pub mod prelude;
pub mod quote;
pub mod results;
pub mod statement;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod transaction;
pub mod translate;
pub mod types;

pub use config::{ConnectOptions, ConnectOptionsBuilder};
pub use error::{AdapterError, ErrorKind};
pub use facade::{DataSource, Driver, DriverError, Gateway, GatewayError, ResultHandle};
pub use handle::{EngineHandle, SharedEngine};
pub use results::{DbRow, FetchedRow, NestedRow};
pub use types::{EngineMode, FetchMode, RowValues};
