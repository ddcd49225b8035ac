#![cfg(feature = "sqlite")]
use embedsql_adapters::prelude::*;
use indexmap::IndexMap;

fn gateway(dir: &tempfile::TempDir) -> Gateway {
    let path = dir.path().join("cms").to_string_lossy().into_owned();
    Gateway::new(EngineHandle::sqlite().into_shared(), path)
}

fn post(title: &str, views: i64) -> IndexMap<String, RowValues> {
    let mut data = IndexMap::new();
    data.insert("title".to_owned(), RowValues::from(title));
    data.insert("views".to_owned(), RowValues::Int(views));
    data
}

#[test]
fn connects_lazily_and_appends_the_extension() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut gw = gateway(&dir);
    assert!(!gw.is_connected());
    assert!(gw.list_tables()?.is_empty());
    assert!(gw.is_connected());
    assert!(dir.path().join("cms.db").exists());

    gw.close_connection();
    assert!(!gw.is_connected());
    gw.connect()?;
    gw.connect()?;
    assert!(gw.is_connected());
    Ok(())
}

#[test]
fn crud_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut gw = gateway(&dir);
    gw.query(
        "CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT, views INTEGER)",
        &BindParams::None,
    )?;

    assert_eq!(gw.insert("posts", &post("first", 1))?, 1);
    assert_eq!(gw.last_insert_id()?, 1);
    assert_eq!(gw.insert("posts", &post("it's second", 2))?, 1);

    let pairs = gw.fetch_pairs("SELECT id, title FROM posts ORDER BY id", &BindParams::None)?;
    assert_eq!(pairs.get("2"), Some(&RowValues::Text("it's second".into())));
    assert_eq!(pairs.keys().collect::<Vec<_>>(), ["1", "2"]);

    let where_clause = gw.quote_into("id = ?", &RowValues::Int(1))?;
    assert_eq!(where_clause, "id = 1");
    assert_eq!(gw.update("posts", &post("renamed", 5), Some(&where_clause))?, 1);

    let row = gw
        .fetch_row(
            "SELECT title, views FROM posts WHERE id = ?",
            &BindParams::Positional(vec![RowValues::Int(1)]),
        )?
        .ok_or("row 1 missing")?;
    assert_eq!(row.get("title"), Some(&RowValues::Text("renamed".into())));
    assert_eq!(row.get("views"), Some(&RowValues::Int(5)));

    let titles = gw.fetch_col("SELECT title FROM posts ORDER BY id", &BindParams::None)?;
    assert_eq!(titles.len(), 2);
    let total = gw.fetch_one("SELECT SUM(views) FROM posts", &BindParams::None)?;
    assert_eq!(total, Some(RowValues::Int(7)));

    assert_eq!(gw.delete("posts", Some("views > 3"))?, 1);
    assert_eq!(gw.fetch_all("SELECT * FROM posts", &BindParams::None)?.len(), 1);
    assert_eq!(gw.delete("posts", None)?, 1);
    Ok(())
}

#[test]
fn describe_table_is_keyed_by_column() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut gw = gateway(&dir);
    gw.query(
        "CREATE TABLE pages (id INTEGER PRIMARY KEY, slug VARCHAR(80) NOT NULL, body TEXT, utime DATETIME)",
        &BindParams::None,
    )?;
    let fields = gw.describe_table("pages")?;
    assert_eq!(fields.keys().collect::<Vec<_>>(), ["id", "slug", "body"]);
    let slug = &fields["slug"];
    assert_eq!(slug.kind, ColumnKind::String);
    assert!(!slug.null);
    assert_eq!(gw.list_tables()?, vec!["pages".to_owned()]);
    Ok(())
}

#[test]
fn statement_errors_name_the_sql() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut gw = gateway(&dir);
    let err = gw.fetch_all("SELECT * FROM ghosts", &BindParams::None).unwrap_err();
    match err {
        GatewayError::Statement { message, sql } => {
            assert!(message.contains("ghosts"), "{message}");
            assert_eq!(sql.as_deref(), Some("SELECT * FROM ghosts"));
        }
        other => panic!("expected a statement error, got {other:?}"),
    }

    let err = gw.commit().unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Adapter(AdapterError::InvalidTransactionState(_))
    ));
    Ok(())
}

#[test]
fn committed_work_survives_reconnect() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut gw = gateway(&dir);
    gw.query("CREATE TABLE tags (name TEXT)", &BindParams::None)?;

    gw.begin_transaction()?;
    gw.insert("tags", &IndexMap::from([("name".to_owned(), RowValues::from("kept"))]))?;
    gw.commit()?;

    gw.begin_transaction()?;
    gw.insert("tags", &IndexMap::from([("name".to_owned(), RowValues::from("dropped"))]))?;
    gw.close_connection();

    let names = gw.fetch_col("SELECT name FROM tags", &BindParams::None)?;
    assert_eq!(names, vec![RowValues::Text("kept".into())]);
    assert!(!gw.in_transaction());
    Ok(())
}
