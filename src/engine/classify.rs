use std::sync::LazyLock;

use regex::Regex;

use crate::types::SqlVerb;

// Skips leading whitespace, comments and opening parens before the verb.
static LEADING_VERB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\s+|--[^\n]*(?:\n|$)|/\*(?s:.*?)\*/|\()*([A-Za-z]+)")
        .expect("verb pattern is valid")
});

static DESCRIBE_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\s*desc(?:ribe)?\s+[`"\[]?([A-Za-z_][A-Za-z0-9_]*)[`"\]]?\s*;?\s*$"#)
        .expect("describe pattern is valid")
});

static TABLE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:from|into|update|table|join)\s+[`"\[]?([A-Za-z_][A-Za-z0-9_]*)"#)
        .expect("table pattern is valid")
});

/// Classify a statement by its leading keyword.
#[must_use]
pub fn verb_of(sql: &str) -> SqlVerb {
    let Some(word) = LEADING_VERB.captures(sql).and_then(|c| c.get(1)) else {
        return SqlVerb::Other;
    };
    match word.as_str().to_ascii_lowercase().as_str() {
        "select" | "with" | "values" => SqlVerb::Select,
        "insert" => SqlVerb::Insert,
        "replace" => SqlVerb::Replace,
        "update" => SqlVerb::Update,
        "delete" => SqlVerb::Delete,
        "describe" | "desc" => SqlVerb::Describe,
        "create" => SqlVerb::Create,
        "drop" => SqlVerb::Drop,
        "alter" => SqlVerb::Alter,
        "begin" | "start" => SqlVerb::Begin,
        "commit" | "end" => SqlVerb::Commit,
        "rollback" => SqlVerb::Rollback,
        _ => SqlVerb::Other,
    }
}

/// Whether `sql` mutates data/schema instead of yielding rows.
#[must_use]
pub fn is_manipulation(sql: &str) -> bool {
    verb_of(sql).is_manipulation()
}

/// Table named by a `DESCRIBE t` / `DESC t` statement.
#[must_use]
pub fn describe_target(sql: &str) -> Option<&str> {
    DESCRIBE_TARGET
        .captures(sql)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// First table a statement refers to, if one can be spotted.
#[must_use]
pub fn referenced_table(sql: &str) -> Option<&str> {
    if let Some(table) = describe_target(sql) {
        return Some(table);
    }
    TABLE_REFERENCE
        .captures(sql)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_leading_verbs() {
        assert_eq!(verb_of("SELECT * FROM t"), SqlVerb::Select);
        assert_eq!(verb_of("  insert into t values (1)"), SqlVerb::Insert);
        assert_eq!(verb_of("-- note\nUPDATE t SET a = 1"), SqlVerb::Update);
        assert_eq!(verb_of("/* x */ delete from t"), SqlVerb::Delete);
        assert_eq!(verb_of("(select 1)"), SqlVerb::Select);
        assert_eq!(verb_of("DESCRIBE t"), SqlVerb::Describe);
        assert_eq!(verb_of("pragma table_info(t)"), SqlVerb::Other);
        assert_eq!(verb_of(""), SqlVerb::Other);
    }

    #[test]
    fn manipulation_covers_dml_and_ddl() {
        assert!(is_manipulation("INSERT INTO t VALUES (1)"));
        assert!(is_manipulation("create table t (a int)"));
        assert!(is_manipulation("BEGIN"));
        assert!(!is_manipulation("select 1"));
        assert!(!is_manipulation("describe t"));
    }

    #[test]
    fn finds_describe_and_referenced_tables() {
        assert_eq!(describe_target("DESCRIBE articles;"), Some("articles"));
        assert_eq!(describe_target("desc `articles`"), Some("articles"));
        assert_eq!(describe_target("select * from articles"), None);
        assert_eq!(referenced_table("INSERT INTO posts (a) VALUES (1)"), Some("posts"));
        assert_eq!(referenced_table("select a from users u join posts p"), Some("users"));
        assert_eq!(referenced_table("select 1"), None);
    }
}
