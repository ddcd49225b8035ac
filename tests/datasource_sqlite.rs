#![cfg(feature = "sqlite")]
use embedsql_adapters::catalog::{ColumnKey, ColumnKind, ColumnLength, ColumnSpec};
use embedsql_adapters::prelude::*;
use serde_json::json;

fn connected(dir: &tempfile::TempDir) -> Result<DataSource, Box<dyn std::error::Error>> {
    let path = dir.path().join("blog.db").to_string_lossy().into_owned();
    let mut ds = DataSource::new(EngineHandle::sqlite().into_shared());
    let connected = ds.connect(path);
    assert!(connected, "connect failed: {:?}", ds.last_error());
    assert!(ds.execute(
        "CREATE TABLE authors (id INTEGER PRIMARY KEY, name VARCHAR(64) NOT NULL)"
    ));
    assert!(ds.execute(
        "CREATE TABLE posts (rowid INTEGER, id INTEGER PRIMARY KEY, author_id INTEGER, \
         url TEXT, title VARCHAR(255) DEFAULT 'untitled', ctime DATETIME, utime DATETIME)"
    ));
    Ok(ds)
}

#[test]
fn manipulation_stats_do_not_leak_into_queries() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut ds = connected(&dir)?;

    assert!(ds.execute("INSERT INTO authors (name) VALUES ('ann')"));
    assert_eq!(ds.last_affected(), Some(1));
    assert_eq!(ds.query_stats().inserted(), Some(1));
    assert_eq!(ds.last_insert_id(), Some(1));
    assert_eq!(ds.last_num_fields(), Some(0));

    assert!(ds.execute("SELECT name FROM authors"));
    assert!(ds.query_stats().is_empty());
    assert_eq!(ds.last_affected(), None);
    assert_eq!(ds.last_num_rows(), Some(1));
    assert_eq!(ds.last_num_fields(), Some(1));
    assert!(ds.has_result());

    assert!(ds.execute("UPDATE authors SET name = 'bea' WHERE id = 7"));
    assert_eq!(ds.last_affected(), Some(0));
    assert_eq!(ds.query_stats().updated(), Some(0));
    assert!(!ds.has_result());
    Ok(())
}

#[test]
fn joined_rows_are_nested_by_table() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut ds = connected(&dir)?;
    assert!(ds.execute("INSERT INTO authors (id, name) VALUES (1, 'ann')"));
    assert!(ds.execute(
        "INSERT INTO posts (author_id, url, title) VALUES (1, 'http://x/', 'first')"
    ));

    let rows = ds
        .fetch_all(
            "SELECT posts.id, posts.title, authors.name FROM posts \
             JOIN authors ON authors.id = posts.author_id",
        )
        .ok_or("select failed")?;
    assert_eq!(rows.len(), 1);
    let nested = rows[0].as_nested().ok_or("expected a nested row")?;
    assert_eq!(nested.value("posts", "id"), Some(&RowValues::Int(1)));
    assert_eq!(nested.value("posts", "title"), Some(&RowValues::Text("first".into())));
    assert_eq!(nested.value("authors", "name"), Some(&RowValues::Text("ann".into())));
    assert!(nested.unowned().is_none());
    assert!(ds.fetch_row().is_none());
    Ok(())
}

#[test]
fn expressions_without_table_metadata_are_unowned() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut ds = connected(&dir)?;
    assert!(ds.execute("SELECT COUNT(*) AS n FROM posts"));
    let row = ds.fetch_row().ok_or("expected one row")?;
    let unowned = row
        .as_nested()
        .and_then(NestedRow::unowned)
        .ok_or("expected unowned columns")?;
    assert_eq!(unowned.get("n"), Some(&RowValues::Int(0)));
    Ok(())
}

#[test]
fn describe_strips_housekeeping_columns() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut ds = connected(&dir)?;
    let fields = ds.describe("posts").ok_or("describe failed")?;
    let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["id", "author_id", "url", "title"]);

    let id = &fields[0];
    assert_eq!(id.key, Some(ColumnKey::Primary));
    assert!(!id.null);
    assert_eq!(id.length, Some(ColumnLength::Fixed(11)));

    let title = &fields[3];
    assert_eq!(title.kind, ColumnKind::String);
    assert_eq!(title.length, Some(ColumnLength::Fixed(255)));
    assert_eq!(title.default.as_deref(), Some("untitled"));
    assert!(title.null);

    assert!(ds.describe("missing").is_none());
    assert_eq!(ds.error().map(|e| e.kind), Some(ErrorKind::StatementError));
    Ok(())
}

#[test]
fn quoting_and_column_clauses() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut ds = connected(&dir)?;
    assert_eq!(ds.value(&RowValues::from("it's"), None).as_deref(), Some("'it''s'"));
    assert_eq!(ds.value(&RowValues::from(""), Some(ColumnKind::Integer)).as_deref(), Some("NULL"));
    assert_eq!(ds.value(&RowValues::Null, Some(ColumnKind::String)).as_deref(), Some("NULL"));
    assert_eq!(ds.value(&RowValues::Bool(true), None).as_deref(), Some("1"));
    assert_eq!(ds.column("varchar(32)"), ColumnKind::String);

    let clause = ds
        .build_column(&ColumnSpec::new("title", "string").default_value("n/a").nullable(false))
        .ok_or("build_column failed")?;
    assert!(clause.starts_with("\"title\" varchar(255)"), "{clause}");
    assert!(clause.contains("DEFAULT 'n/a'"), "{clause}");

    assert!(ds.build_column(&ColumnSpec::new("x", "money")).is_none());
    assert_eq!(ds.error().map(|e| e.kind), Some(ErrorKind::SchemaError));

    assert_eq!(ds.limit("SELECT * FROM posts", 5, Some(10)), "SELECT * FROM posts LIMIT 5 OFFSET 10");
    Ok(())
}

#[test]
fn rollback_discards_changes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut ds = connected(&dir)?;
    assert!(ds.begin());
    assert!(ds.execute("INSERT INTO authors (name) VALUES ('ann')"));
    assert!(ds.rollback());
    assert!(ds.execute("SELECT id FROM authors"));
    assert_eq!(ds.last_num_rows(), Some(0));

    assert!(!ds.commit());
    assert_eq!(ds.error().map(|e| e.kind), Some(ErrorKind::InvalidTransactionState));
    Ok(())
}

#[test]
fn options_route_to_engine_and_storage() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut ds = connected(&dir)?;
    assert!(ds.set_encoding("latin1"));
    assert_eq!(ds.get_encoding().as_deref(), Some("latin1"));
    assert_eq!(ds.get_option("charset"), Some(json!("latin1")));

    assert!(ds.set_option("page_size", json!(50)));
    assert_eq!(ds.get_option("page_size"), Some(json!(50)));

    assert!(!ds.set_option("version", json!("1.0")));
    assert_eq!(ds.error().map(|e| e.kind), Some(ErrorKind::UnsupportedFeature));
    assert!(ds.get_option("version").is_some());
    Ok(())
}

#[test]
fn connect_failure_is_reported() {
    let mut ds = DataSource::new(EngineHandle::sqlite().into_shared());
    assert!(!ds.connect("/nonexistent-dir/for/sure/blog.db"));
    assert!(!ds.is_connected());
    assert_eq!(ds.error().map(|e| e.kind), Some(ErrorKind::ConnectionFailure));
    assert!(!ds.execute("SELECT 1"));
    assert!(ds.last_error().is_some());
}

#[test]
fn transaction_lost_to_another_facade_is_begun_again() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut ds = connected(&dir)?;
    let path = dir.path().join("blog.db").to_string_lossy().into_owned();
    let mut other = DataSource::new(ds.shared_engine());
    assert!(ds.begin());

    assert!(other.connect(path.as_str()));
    assert!(other.disconnect());
    assert!(!ds.in_transaction());

    assert!(ds.connect(path.as_str()));
    assert!(ds.begin());
    assert!(ds.in_transaction());
    assert!(ds.execute("INSERT INTO authors (name) VALUES ('ann')"));
    assert!(ds.rollback(), "rollback failed: {:?}", ds.last_error());
    assert!(!ds.in_transaction());
    assert!(ds.execute("SELECT id FROM authors"));
    assert_eq!(ds.last_num_rows(), Some(0));
    Ok(())
}

#[test]
fn rejected_charset_fails_the_connect() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("blog.db").to_string_lossy().into_owned();
    let mut ds = DataSource::new(EngineHandle::sqlite().into_shared());
    assert!(!ds.connect(ConnectOptions::new(path).with_charset("")));
    assert_eq!(ds.error().map(|e| e.kind), Some(ErrorKind::ConnectionFailure));
    assert_eq!(ds.last_error(), Some("charset must not be empty"));
    Ok(())
}
