use std::collections::HashMap;
use std::path::Path;

use rusqlite::Connection;
use rusqlite::types::Value;
use tracing::debug;

use super::classify;
use super::{ALIAS_FOR_PRIMARY_KEY, Engine, RawResult, statistics_key};
use crate::types::{EngineMode, RowValues, SqlVerb};

const MEMORY_PATH: &str = ":memory:";
const DEFAULT_CHARSET: &str = "utf8";
const DEFAULT_EXTENSION: &str = "db";

/// Column layout of a native DESCRIBE result.
pub const DESCRIBE_COLUMNS: [&str; 6] = ["name", "type", "null", "key", "default", "extra"];

type NativeResult<T> = Result<T, String>;

/// [`Engine`] binding over a `rusqlite` connection.
///
/// Joined SELECTs report owning-table metadata: the connection is opened with
/// full column naming, and `table.column` result names are split back into
/// parallel table/column lists.
pub struct SqliteEngine {
    conn: Option<Connection>,
    path: Option<String>,
    charset: String,
    mode: EngineMode,
    extension: String,
    error: Option<String>,
    last_verb: Option<SqlVerb>,
    last_table: Option<String>,
    next_ids: HashMap<String, i64>,
}

impl Default for SqliteEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SqliteEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            conn: None,
            path: None,
            charset: DEFAULT_CHARSET.to_owned(),
            mode: EngineMode::default(),
            extension: DEFAULT_EXTENSION.to_owned(),
            error: None,
            last_verb: None,
            last_table: None,
            next_ids: HashMap::new(),
        }
    }

    fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Append the configured extension to a bare database name.
    fn resolve_path(&self, path: &str) -> String {
        if path == MEMORY_PATH || path.starts_with("file:") || self.extension.is_empty() {
            return path.to_owned();
        }
        if Path::new(path).extension().is_some() {
            path.to_owned()
        } else {
            format!("{path}.{}", self.extension)
        }
    }

    fn connection(&mut self) -> Option<&Connection> {
        if self.conn.is_none() {
            self.fail("database is not open");
        }
        self.conn.as_ref()
    }
}

impl Engine for SqliteEngine {
    fn open(&mut self, path: &str) {
        self.error = None;
        let resolved = self.resolve_path(path);
        let opened = Connection::open(&resolved).and_then(|conn| {
            conn.execute_batch("PRAGMA full_column_names = ON; PRAGMA short_column_names = OFF;")?;
            Ok(conn)
        });
        match opened {
            Ok(conn) => {
                debug!(path = %resolved, "sqlite engine opened");
                self.conn = Some(conn);
                self.path = Some(resolved);
            }
            Err(e) => self.fail(format!("unable to open database file {resolved}: {e}")),
        }
    }

    fn terminate(&mut self) {
        self.error = None;
        if let Some(conn) = self.conn.take() {
            if let Err((_conn, e)) = conn.close() {
                self.fail(format!("error closing database: {e}"));
            }
        }
        self.last_verb = None;
        self.last_table = None;
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn query(&mut self, sql: &str) -> Option<RawResult> {
        self.error = None;
        let verb = classify::verb_of(sql);
        self.last_verb = Some(verb);
        if let Some(table) = classify::referenced_table(sql) {
            self.last_table = Some(table.to_owned());
        }
        let conn = self.connection()?;
        let outcome = if verb == SqlVerb::Describe {
            match classify::describe_target(sql) {
                Some(table) => describe(conn, table),
                None => Err(format!("malformed DESCRIBE statement: {sql}")),
            }
        } else if verb.is_manipulation() {
            conn.execute(sql, [])
                .map(|n| RawResult::statistics(statistics_key(verb), n as u64))
                .map_err(|e| e.to_string())
        } else {
            select(conn, sql)
        };
        match outcome {
            Ok(result) => Some(result),
            Err(message) => {
                self.fail(message);
                None
            }
        }
    }

    fn exec(&mut self, sql: &str) -> u64 {
        self.error = None;
        self.last_verb = Some(classify::verb_of(sql));
        let Some(conn) = self.connection() else {
            return 0;
        };
        match conn.execute(sql, []) {
            Ok(n) => n as u64,
            Err(e) => {
                self.fail(e.to_string());
                0
            }
        }
    }

    fn last_verb(&self) -> Option<SqlVerb> {
        self.last_verb
    }

    fn is_error(&self) -> bool {
        self.error.is_some()
    }

    fn last_error(&self) -> Option<String> {
        self.error.clone()
    }

    fn charset(&self) -> String {
        self.charset.clone()
    }

    fn set_charset(&mut self, charset: &str) {
        self.error = None;
        let charset = charset.trim();
        if charset.is_empty() {
            self.fail("charset must not be empty");
        } else {
            self.charset = charset.to_owned();
        }
    }

    fn path(&self) -> Option<String> {
        self.path.clone()
    }

    fn set_path(&mut self, path: &str) {
        self.error = None;
        self.path = Some(self.resolve_path(path));
    }

    fn engine_mode(&self) -> EngineMode {
        self.mode
    }

    fn set_engine_mode(&mut self, mode: EngineMode) {
        self.error = None;
        self.mode = mode;
    }

    fn extension(&self) -> String {
        self.extension.clone()
    }

    fn set_extension(&mut self, extension: &str) {
        self.error = None;
        self.extension = extension.trim_start_matches('.').to_owned();
    }

    fn version(&self) -> String {
        rusqlite::version().to_owned()
    }

    fn last_insert_id(&self) -> i64 {
        self.conn
            .as_ref()
            .map_or(0, Connection::last_insert_rowid)
    }

    fn next_id(&mut self, table: &str) -> i64 {
        self.error = None;
        let sql = format!(
            "SELECT COALESCE(MAX(rowid), 0) + 1 FROM {}",
            quote_identifier(table)
        );
        let Some(conn) = self.connection() else {
            return 0;
        };
        match conn.query_row(&sql, [], |row| row.get::<_, i64>(0)) {
            Ok(next) => next.max(self.next_ids.get(table).copied().unwrap_or(0)),
            Err(e) => {
                self.fail(e.to_string());
                0
            }
        }
    }

    fn set_next_id(&mut self, table: &str, next: i64) -> bool {
        self.error = None;
        if next < 1 {
            self.fail(format!("invalid next id {next} for {table}"));
            return false;
        }
        self.next_ids.insert(table.to_owned(), next);
        true
    }

    fn table_name(&self) -> Option<String> {
        self.last_table.clone()
    }

    fn list_tables(&mut self) -> Vec<String> {
        self.error = None;
        let Some(conn) = self.connection() else {
            return Vec::new();
        };
        let listed = conn
            .prepare(
                "SELECT name FROM sqlite_master WHERE type = 'table' \
                 AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .and_then(|mut stmt| {
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>();
                names
            });
        match listed {
            Ok(names) => names,
            Err(e) => {
                self.fail(e.to_string());
                Vec::new()
            }
        }
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn extract_value(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<RowValues> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    })
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split `table.column` names into parallel table/column lists.
///
/// The table list stays empty when no column carries a qualifier.
fn split_qualified(raw: Vec<String>) -> (Vec<String>, Vec<String>) {
    let qualified = |name: &str| {
        name.split_once('.')
            .filter(|(table, column)| is_identifier(table) && is_identifier(column))
            .map(|(table, column)| (table.to_owned(), column.to_owned()))
    };
    if !raw.iter().any(|name| qualified(name).is_some()) {
        return (Vec::new(), raw);
    }
    raw.into_iter()
        .map(|name| qualified(&name).unwrap_or((String::new(), name)))
        .unzip()
}

fn select(conn: &Connection, sql: &str) -> NativeResult<RawResult> {
    let mut stmt = conn.prepare(sql).map_err(|e| e.to_string())?;
    let raw_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = raw_names.len();
    let (table_names, column_names) = split_qualified(raw_names);

    let mut rows_iter = stmt.query([]).map_err(|e| e.to_string())?;
    let mut rows = Vec::new();
    while let Some(row) = rows_iter.next().map_err(|e| e.to_string())? {
        let mut values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            values.push(extract_value(row, i).map_err(|e| e.to_string())?);
        }
        rows.push(values);
    }
    Ok(RawResult::new(column_names, table_names, rows))
}

/// Answer `DESCRIBE table` from `PRAGMA table_info`.
fn describe(conn: &Connection, table: &str) -> NativeResult<RawResult> {
    let sql = format!("PRAGMA table_info({})", quote_identifier(table));
    let mut stmt = conn.prepare(&sql).map_err(|e| e.to_string())?;
    let infos = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                row.get::<_, i64>(3)? != 0,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })
        .and_then(|mapped| mapped.collect::<Result<Vec<_>, _>>())
        .map_err(|e| e.to_string())?;

    if infos.is_empty() {
        return Err(format!("no such table: {table}"));
    }

    let pk_columns = infos.iter().filter(|info| info.4 > 0).count();
    let rows = infos
        .into_iter()
        .map(|(name, decl_type, not_null, default, pk)| {
            let aliases_rowid = pk > 0 && pk_columns == 1 && decl_type.eq_ignore_ascii_case("integer");
            vec![
                RowValues::Text(name),
                RowValues::Text(decl_type),
                RowValues::Text(if not_null || pk > 0 { "NO" } else { "YES" }.to_owned()),
                RowValues::Text(if pk > 0 { "primary" } else { "" }.to_owned()),
                default.map_or(RowValues::Null, |d| RowValues::Text(strip_literal_quotes(&d))),
                RowValues::Text(if aliases_rowid { ALIAS_FOR_PRIMARY_KEY } else { "" }.to_owned()),
            ]
        })
        .collect();
    Ok(RawResult::unqualified(
        DESCRIBE_COLUMNS.iter().map(|c| (*c).to_owned()).collect(),
        rows,
    ))
}

fn strip_literal_quotes(default: &str) -> String {
    default
        .strip_prefix('\'')
        .and_then(|d| d.strip_suffix('\''))
        .map_or_else(|| default.to_owned(), |d| d.replace("''", "'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_only_qualified_identifiers() {
        let (tables, columns) = split_qualified(vec!["a.id".into(), "count(*)".into(), "b.url".into()]);
        assert_eq!(tables, vec!["a".to_string(), String::new(), "b".to_string()]);
        assert_eq!(columns, vec!["id".to_string(), "count(*)".to_string(), "url".to_string()]);

        let (tables, columns) = split_qualified(vec!["id".into(), "a.x + 1".into()]);
        assert!(tables.is_empty());
        assert_eq!(columns, vec!["id".to_string(), "a.x + 1".to_string()]);
    }

    #[test]
    fn resolves_bare_names_with_extension() {
        let engine = SqliteEngine::new();
        assert_eq!(engine.resolve_path("data/app"), "data/app.db");
        assert_eq!(engine.resolve_path("data/app.sqlite"), "data/app.sqlite");
        assert_eq!(engine.resolve_path(":memory:"), ":memory:");
    }

    #[test]
    fn reports_errors_through_the_flag() {
        let mut engine = SqliteEngine::new();
        assert!(engine.query("SELECT 1").is_none());
        assert!(engine.is_error());
        engine.open(":memory:");
        assert!(!engine.is_error());
        assert!(engine.query("SELEC nonsense").is_none());
        assert!(engine.last_error().is_some());
        assert!(engine.query("SELECT 1 AS one").is_some());
        assert!(!engine.is_error());
    }
}
