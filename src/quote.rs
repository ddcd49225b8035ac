//! Rendering values and identifiers as SQL literals.

use std::fmt::Write as _;

use crate::catalog::{ColumnKind, ValueFormat};
use crate::engine::Engine;
use crate::types::RowValues;

pub const NULL: &str = "NULL";

fn kind_of(value: &RowValues) -> ColumnKind {
    match value {
        RowValues::Int(_) => ColumnKind::Integer,
        RowValues::Float(_) => ColumnKind::Float,
        RowValues::Bool(_) => ColumnKind::Boolean,
        RowValues::Blob(_) => ColumnKind::Binary,
        RowValues::Timestamp(_) => ColumnKind::Datetime,
        RowValues::Text(_) | RowValues::JSON(_) | RowValues::Null => ColumnKind::Text,
    }
}

fn truthy(value: &RowValues) -> bool {
    match value {
        RowValues::Bool(b) => *b,
        RowValues::Int(i) => *i != 0,
        RowValues::Float(f) => *f != 0.0,
        RowValues::Text(s) => !s.is_empty() && s != "0",
        RowValues::Null => false,
        RowValues::Timestamp(_) | RowValues::JSON(_) | RowValues::Blob(_) => true,
    }
}

/// Escape through the engine and wrap in single quotes.
#[must_use]
pub fn string(engine: &dyn Engine, text: &str) -> String {
    format!("'{}'", engine.escape_string(text))
}

/// Render `value` as a literal for a column of `kind`.
///
/// Without a kind, one is inferred from the value itself. NULL renders as the
/// `NULL` keyword; an empty string is `''` except for numeric columns, where
/// it is `NULL`. Booleans go through the engine's boolean literal, numbers
/// through the kind's formatter, and everything else is escaped and quoted.
#[must_use]
pub fn value(engine: &dyn Engine, value: &RowValues, kind: Option<ColumnKind>) -> String {
    if value.is_null() {
        return NULL.to_owned();
    }
    let kind = kind.unwrap_or_else(|| kind_of(value));
    if value.as_text() == Some("") {
        if kind.is_numeric() {
            return NULL.to_owned();
        }
        if kind != ColumnKind::Boolean {
            return "''".to_owned();
        }
    }
    let format = kind.descriptor().format;
    match kind {
        ColumnKind::Boolean => engine.boolean_literal(truthy(value)).to_owned(),
        ColumnKind::Integer | ColumnKind::Float | ColumnKind::PrimaryKey => format
            .unwrap_or(ValueFormat::Integer)
            .apply(value)
            .unwrap_or_else(|| string(engine, &value.to_text().unwrap_or_default())),
        ColumnKind::Binary => match value.as_blob() {
            Some(bytes) => hex_literal(bytes),
            None => string(engine, &value.to_text().unwrap_or_default()),
        },
        _ => {
            let text = format
                .and_then(|f| f.apply(value))
                .or_else(|| value.to_text())
                .unwrap_or_default();
            string(engine, &text)
        }
    }
}

fn hex_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2 + 3);
    out.push_str("X'");
    for b in bytes {
        let _ = write!(out, "{b:02X}");
    }
    out.push('\'');
    out
}

/// Quote an identifier, treating dots as qualifier separators.
///
/// `*` and already-quoted parts are left alone.
#[must_use]
pub fn identifier(name: &str) -> String {
    name.split('.')
        .map(|part| {
            if part == "*" || (part.len() >= 2 && part.starts_with('"') && part.ends_with('"')) {
                part.to_owned()
            } else {
                format!("\"{}\"", part.replace('"', "\"\""))
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedEngine;

    #[test]
    fn null_and_empty_values() {
        let engine = ScriptedEngine::new();
        assert_eq!(value(&engine, &RowValues::Null, Some(ColumnKind::String)), "NULL");
        assert_eq!(value(&engine, &RowValues::Null, None), "NULL");
        assert_eq!(value(&engine, &"".into(), Some(ColumnKind::String)), "''");
        assert_eq!(value(&engine, &"".into(), Some(ColumnKind::Integer)), "NULL");
        assert_eq!(value(&engine, &"".into(), Some(ColumnKind::Float)), "NULL");
        assert_eq!(value(&engine, &"".into(), Some(ColumnKind::Boolean)), "0");
    }

    #[test]
    fn escapes_and_formats() {
        let engine = ScriptedEngine::new();
        assert_eq!(value(&engine, &"O'Reilly".into(), None), "'O''Reilly'");
        assert_eq!(value(&engine, &RowValues::Int(7), None), "7");
        assert_eq!(value(&engine, &"12".into(), Some(ColumnKind::Integer)), "12");
        assert_eq!(value(&engine, &RowValues::Bool(true), None), "1");
        assert_eq!(value(&engine, &"yes".into(), Some(ColumnKind::Boolean)), "1");
        assert_eq!(value(&engine, &RowValues::Int(3), Some(ColumnKind::String)), "'3'");
        assert_eq!(value(&engine, &RowValues::Blob(vec![0xde, 0xad]), None), "X'DEAD'");
        assert_eq!(
            value(&engine, &"2024-01-02 03:04:05".into(), Some(ColumnKind::Date)),
            "'2024-01-02'"
        );
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(identifier("posts"), "\"posts\"");
        assert_eq!(identifier("a.url"), "\"a\".\"url\"");
        assert_eq!(identifier("a.*"), "\"a\".*");
        assert_eq!(identifier("we\"ird"), "\"we\"\"ird\"");
    }
}
