// Engine module - the surface of the embedded SQL engine the adapters drive.
//
// - classify: leading-verb classification shared by engine bindings
// - result: the engine's native buffered statement
// - sqlite: a binding of the surface over rusqlite

pub mod classify;
mod result;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use result::RawResult;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteEngine;

use crate::types::{EngineMode, SqlVerb};

/// Statistics key reported after an INSERT/REPLACE.
pub const ROWS_INSERTED: &str = "rows inserted";
/// Statistics key reported after an UPDATE.
pub const ROWS_UPDATED: &str = "rows updated";
/// Statistics key reported after a DELETE.
pub const ROWS_DELETED: &str = "rows deleted";
/// Statistics key reported after any other manipulation statement.
pub const AFFECTED_ROWS: &str = "affected rows";

/// Statistics key a manipulation statement with `verb` reports under.
#[must_use]
pub fn statistics_key(verb: SqlVerb) -> &'static str {
    match verb {
        SqlVerb::Insert | SqlVerb::Replace => ROWS_INSERTED,
        SqlVerb::Update => ROWS_UPDATED,
        SqlVerb::Delete => ROWS_DELETED,
        _ => AFFECTED_ROWS,
    }
}

/// Native `extra` annotation on a DESCRIBE row for a column that aliases the row id.
pub const ALIAS_FOR_PRIMARY_KEY: &str = "alias for rowid";

/// The embedded engine as the adapter layer consumes it.
///
/// Engines follow a native error-flag convention instead of returning
/// `Result`: every call clears the flag, a failing call sets it and returns a
/// neutral value, and callers inspect [`Engine::is_error`] afterwards. The
/// adapter converts that flag into host errors in [`crate::translate`].
pub trait Engine {
    /// Bind to a database file. `:memory:` opens a transient database.
    fn open(&mut self, path: &str);

    /// Release the underlying database resource.
    fn terminate(&mut self);

    fn is_open(&self) -> bool;

    /// Run any statement. Manipulation statements yield a one-row statistics
    /// result; failures yield `None` with the error flag set.
    fn query(&mut self, sql: &str) -> Option<RawResult>;

    /// Run a statement for its side effect and return the affected row count.
    fn exec(&mut self, sql: &str) -> u64;

    /// The engine's own manipulation classifier.
    fn is_manipulation(&self, sql: &str) -> bool {
        classify::is_manipulation(sql)
    }

    /// Verb of the most recently executed statement.
    fn last_verb(&self) -> Option<SqlVerb>;

    fn is_error(&self) -> bool;

    fn last_error(&self) -> Option<String>;

    /// Escape a string for inclusion between single quotes.
    fn escape_string(&self, value: &str) -> String {
        value.replace('\'', "''")
    }

    /// Literal the engine uses for a boolean.
    fn boolean_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    fn charset(&self) -> String;

    fn set_charset(&mut self, charset: &str);

    fn path(&self) -> Option<String>;

    fn set_path(&mut self, path: &str);

    fn engine_mode(&self) -> EngineMode;

    fn set_engine_mode(&mut self, mode: EngineMode);

    /// File extension the engine appends to bare database names.
    fn extension(&self) -> String;

    fn set_extension(&mut self, extension: &str);

    fn version(&self) -> String;

    fn last_insert_id(&self) -> i64;

    /// Next auto-increment id the engine would hand out for `table`.
    fn next_id(&mut self, table: &str) -> i64;

    fn set_next_id(&mut self, table: &str, next: i64) -> bool;

    /// Table touched by the most recent statement, if known.
    fn table_name(&self) -> Option<String>;

    fn list_tables(&mut self) -> Vec<String>;
}
