//! Abstract column kinds and their native spellings.
//!
//! Maps native type declarations such as `varchar(255)` onto a small set of
//! [`ColumnKind`]s and back, builds column-definition fragments for DDL, and
//! turns the engine's DESCRIBE rows into [`FieldDescription`]s.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::engine::ALIAS_FOR_PRIMARY_KEY;
use crate::error::AdapterError;
use crate::quote;
use crate::results::DbRow;
use crate::types::RowValues;

/// Columns the engine maintains for itself; never reported by describe.
pub const HOUSEKEEPING_COLUMNS: [&str; 3] = ["rowid", "ctime", "utime"];

/// Length given to an alias-for-primary-key column whose declaration has none.
pub const PRIMARY_KEY_DEFAULT_LENGTH: u32 = 11;

static LENGTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*([^)]*?)\s*\)").expect("length pattern is valid"));

/// Abstract column kind shared by every facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    PrimaryKey,
    String,
    Text,
    Integer,
    Float,
    Datetime,
    Timestamp,
    Time,
    Date,
    Binary,
    Boolean,
}

impl ColumnKind {
    pub const ALL: [ColumnKind; 11] = [
        ColumnKind::PrimaryKey,
        ColumnKind::String,
        ColumnKind::Text,
        ColumnKind::Integer,
        ColumnKind::Float,
        ColumnKind::Datetime,
        ColumnKind::Timestamp,
        ColumnKind::Time,
        ColumnKind::Date,
        ColumnKind::Binary,
        ColumnKind::Boolean,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnKind::PrimaryKey => "primary_key",
            ColumnKind::String => "string",
            ColumnKind::Text => "text",
            ColumnKind::Integer => "integer",
            ColumnKind::Float => "float",
            ColumnKind::Datetime => "datetime",
            ColumnKind::Timestamp => "timestamp",
            ColumnKind::Time => "time",
            ColumnKind::Date => "date",
            ColumnKind::Binary => "binary",
            ColumnKind::Boolean => "boolean",
        }
    }

    /// Integer or float.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }

    /// The fixed native descriptor for this kind.
    #[must_use]
    pub fn descriptor(self) -> ColumnTypeDescriptor {
        let (native, limit, format) = match self {
            ColumnKind::PrimaryKey => ("integer primary key", None, None),
            ColumnKind::String => ("varchar", Some(ColumnLength::Fixed(255)), None),
            ColumnKind::Text => ("text", None, None),
            ColumnKind::Integer => ("integer", None, Some(ValueFormat::Integer)),
            ColumnKind::Float => ("float", None, Some(ValueFormat::Float)),
            ColumnKind::Datetime => ("datetime", None, Some(ValueFormat::Temporal("%Y-%m-%d %H:%M:%S"))),
            ColumnKind::Timestamp => ("timestamp", None, Some(ValueFormat::Temporal("%Y-%m-%d %H:%M:%S"))),
            ColumnKind::Time => ("time", None, Some(ValueFormat::Temporal("%H:%M:%S"))),
            ColumnKind::Date => ("date", None, Some(ValueFormat::Temporal("%Y-%m-%d"))),
            ColumnKind::Binary => ("blob", None, None),
            ColumnKind::Boolean => ("boolean", None, None),
        };
        ColumnTypeDescriptor {
            kind: self,
            native,
            limit,
            format,
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnKind {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ColumnKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AdapterError::SchemaError(format!("unknown column kind '{wanted}'")))
    }
}

/// A parenthesised length or precision from a native type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnLength {
    /// `varchar(255)`
    Fixed(u32),
    /// `decimal(10,2)`
    Precision { digits: u32, scale: u32 },
}

impl fmt::Display for ColumnLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnLength::Fixed(n) => write!(f, "{n}"),
            ColumnLength::Precision { digits, scale } => write!(f, "{digits},{scale}"),
        }
    }
}

impl FromStr for ColumnLength {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AdapterError::SchemaError(format!("invalid column length '{s}'"));
        match s.split_once(',') {
            Some((digits, scale)) => Ok(ColumnLength::Precision {
                digits: digits.trim().parse().map_err(|_| invalid())?,
                scale: scale.trim().parse().map_err(|_| invalid())?,
            }),
            None => s.trim().parse().map(ColumnLength::Fixed).map_err(|_| invalid()),
        }
    }
}

/// How values of a kind are rendered before they are placed in SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    Integer,
    Float,
    /// chrono format string
    Temporal(&'static str),
}

impl ValueFormat {
    /// Render `value`, or `None` when it cannot be coerced.
    #[must_use]
    pub fn apply(self, value: &RowValues) -> Option<String> {
        match self {
            ValueFormat::Integer => match value {
                RowValues::Int(i) => Some(i.to_string()),
                RowValues::Bool(b) => Some(i64::from(*b).to_string()),
                RowValues::Float(f) => Some((f.trunc() as i64).to_string()),
                RowValues::Text(s) => Some(leading_integer(s).to_string()),
                _ => None,
            },
            ValueFormat::Float => match value {
                RowValues::Text(s) => Some(s.trim().parse::<f64>().unwrap_or(0.0).to_string()),
                RowValues::Bool(b) => Some(i64::from(*b).to_string()),
                other => other.as_float().map(|f| f.to_string()),
            },
            ValueFormat::Temporal(fmt) => {
                if let Some(dt) = value.as_timestamp() {
                    return Some(dt.format(fmt).to_string());
                }
                value
                    .as_text()
                    .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.format(fmt).to_string())
                    .or_else(|| value.to_text())
            }
        }
    }
}

/// Integer prefix of a string, 0 when there is none.
fn leading_integer(s: &str) -> i64 {
    let s = s.trim_start();
    let end = s
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+')))
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8());
    s[..end].parse().unwrap_or(0)
}

/// Native name, default length and value formatter of one abstract kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnTypeDescriptor {
    pub kind: ColumnKind,
    pub native: &'static str,
    pub limit: Option<ColumnLength>,
    pub format: Option<ValueFormat>,
}

/// Map a native type declaration onto an abstract kind.
///
/// The length suffix is ignored; anything unrecognised is `text`.
#[must_use]
pub fn to_abstract(native: &str) -> ColumnKind {
    let base = native.split('(').next().unwrap_or_default().trim().to_lowercase();
    match base.as_str() {
        "text" => ColumnKind::Text,
        "integer" | "int" | "tinyint" | "smallint" | "mediumint" | "bigint" | "int2" | "int8"
        | "unsigned big int" => ColumnKind::Integer,
        "float" | "real" | "double" | "double precision" | "decimal" => ColumnKind::Float,
        "char" | "nchar" | "character" | "varying character" | "native character" => {
            ColumnKind::String
        }
        "boolean" | "bool" => ColumnKind::Boolean,
        "timestamp" => ColumnKind::Timestamp,
        "date" => ColumnKind::Date,
        "datetime" => ColumnKind::Datetime,
        "time" => ColumnKind::Time,
        b if b.contains("varchar") => ColumnKind::String,
        b if b.contains("blob") || b.contains("clob") => ColumnKind::Binary,
        b if b.contains("numeric") => ColumnKind::Float,
        _ => ColumnKind::Text,
    }
}

/// Length or precision declared in a native type, if any.
#[must_use]
pub fn length(native: &str) -> Option<ColumnLength> {
    let inner = LENGTH_RE.captures(native)?.get(1)?.as_str();
    inner.parse().ok()
}

/// Native spelling for an abstract kind name.
///
/// An explicit `length` wins over the kind's default limit.
///
/// # Errors
/// Returns `AdapterError::SchemaError` if `kind` is not a known kind.
pub fn to_native(kind: &str, length: Option<ColumnLength>) -> Result<String, AdapterError> {
    let descriptor = kind.parse::<ColumnKind>()?.descriptor();
    Ok(match length.or(descriptor.limit) {
        Some(len) if descriptor.kind != ColumnKind::PrimaryKey => {
            format!("{}({len})", descriptor.native)
        }
        _ => descriptor.native.to_owned(),
    })
}

/// Key role of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKey {
    Primary,
}

/// Abstract description of one column to be created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    /// Abstract kind name, e.g. `"string"`.
    pub kind: Option<String>,
    pub length: Option<ColumnLength>,
    pub default: Option<RowValues>,
    pub null: Option<bool>,
    pub key: Option<ColumnKey>,
}

impl ColumnSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn length(mut self, length: ColumnLength) -> Self {
        self.length = Some(length);
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<RowValues>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn nullable(mut self, null: bool) -> Self {
        self.null = Some(null);
        self
    }

    #[must_use]
    pub fn primary(mut self) -> Self {
        self.key = Some(ColumnKey::Primary);
        self
    }
}

/// Build one column-definition fragment.
///
/// `render_default` quotes the default value for its kind.
///
/// # Errors
/// Returns `AdapterError::SchemaError` when the name or kind is missing, or
/// the kind is unknown.
pub fn build_column_clause(
    spec: &ColumnSpec,
    render_default: impl Fn(&RowValues, ColumnKind) -> String,
) -> Result<String, AdapterError> {
    if spec.name.trim().is_empty() {
        return Err(AdapterError::SchemaError("column name not specified".into()));
    }
    let Some(kind_name) = spec.kind.as_deref() else {
        return Err(AdapterError::SchemaError(format!(
            "column type not specified for '{}'",
            spec.name
        )));
    };
    let kind: ColumnKind = kind_name.parse()?;
    let name = quote::identifier(&spec.name);
    let primary = spec.key == Some(ColumnKey::Primary);

    if kind == ColumnKind::PrimaryKey || (primary && kind == ColumnKind::Integer) {
        return Ok(format!("{name} {}", ColumnKind::PrimaryKey.descriptor().native));
    }

    let mut out = format!("{name} {}", to_native(kind.as_str(), spec.length)?);
    match (&spec.default, spec.null) {
        _ if primary => out.push_str(" NOT NULL"),
        (Some(default), Some(false)) => {
            out.push_str(&format!(" DEFAULT {} NOT NULL", render_default(default, kind)));
        }
        (Some(default), _) => {
            out.push_str(&format!(" DEFAULT {}", render_default(default, kind)));
        }
        (None, Some(true)) => out.push_str(" DEFAULT NULL"),
        (None, Some(false)) => out.push_str(" NOT NULL"),
        (None, None) => {}
    }
    Ok(out)
}

/// One column as reported by describe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescription {
    pub name: String,
    pub kind: ColumnKind,
    pub null: bool,
    pub default: Option<String>,
    pub length: Option<ColumnLength>,
    pub key: Option<ColumnKey>,
}

/// Turn one native DESCRIBE row into a field description.
///
/// Returns `None` for housekeeping columns. A column annotated as an alias for
/// the primary key is forced non-nullable, marked primary, and given a default
/// length when its declaration has none.
#[must_use]
pub fn describe_field(row: &DbRow) -> Option<FieldDescription> {
    let name = row.get("name")?.to_text()?;
    if HOUSEKEEPING_COLUMNS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(&name))
    {
        return None;
    }
    let native = row.get("type").and_then(RowValues::to_text).unwrap_or_default();
    let text_of = |col: &str| row.get(col).and_then(RowValues::to_text).unwrap_or_default();

    let mut field = FieldDescription {
        name,
        kind: to_abstract(&native),
        null: text_of("null").eq_ignore_ascii_case("yes"),
        default: row.get("default").and_then(RowValues::to_text),
        length: length(&native),
        key: text_of("key")
            .eq_ignore_ascii_case("primary")
            .then_some(ColumnKey::Primary),
    };
    if text_of("extra") == ALIAS_FOR_PRIMARY_KEY {
        field.null = false;
        field.key = Some(ColumnKey::Primary);
        if field.length.is_none() {
            field.length = Some(ColumnLength::Fixed(PRIMARY_KEY_DEFAULT_LENGTH));
        }
    }
    Some(field)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn plain(value: &RowValues, _: ColumnKind) -> String {
        value.to_text().unwrap_or_default()
    }

    #[test]
    fn abstract_kind_ignores_length_and_case() {
        assert_eq!(to_abstract("varchar(255)"), ColumnKind::String);
        assert_eq!(to_abstract("VARCHAR(10)"), ColumnKind::String);
        assert_eq!(to_abstract(" Integer "), ColumnKind::Integer);
        assert_eq!(to_abstract("nvarchar"), ColumnKind::String);
        assert_eq!(to_abstract("CLOB"), ColumnKind::Binary);
        assert_eq!(to_abstract("numeric(10,2)"), ColumnKind::Float);
        assert_eq!(to_abstract("geometry"), ColumnKind::Text);
        assert_eq!(to_abstract("INT"), ColumnKind::Integer);
        assert_eq!(to_abstract("bigint"), ColumnKind::Integer);
        assert_eq!(to_abstract("REAL"), ColumnKind::Float);
        assert_eq!(to_abstract("double precision"), ColumnKind::Float);
        assert_eq!(to_abstract("char(2)"), ColumnKind::String);
        assert_eq!(to_abstract("bool"), ColumnKind::Boolean);
        assert_eq!(to_abstract(""), ColumnKind::Text);
        for _ in 0..3 {
            assert_eq!(to_abstract("datetime"), ColumnKind::Datetime);
        }
    }

    #[test]
    fn parses_lengths() {
        assert_eq!(length("varchar(255)"), Some(ColumnLength::Fixed(255)));
        assert_eq!(
            length("decimal( 10, 2 )"),
            Some(ColumnLength::Precision { digits: 10, scale: 2 })
        );
        assert_eq!(length("text"), None);
        assert_eq!(ColumnLength::Precision { digits: 10, scale: 2 }.to_string(), "10,2");
    }

    #[test]
    fn native_spellings() -> Result<(), AdapterError> {
        assert_eq!(to_native("string", None)?, "varchar(255)");
        assert_eq!(to_native("string", Some(ColumnLength::Fixed(40)))?, "varchar(40)");
        assert_eq!(to_native("integer", None)?, "integer");
        assert_eq!(to_native("Boolean", None)?, "boolean");
        assert_eq!(to_native("primary_key", Some(ColumnLength::Fixed(11)))?, "integer primary key");
        let err = to_native("money", None).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::SchemaError);
        Ok(())
    }

    #[test]
    fn column_clauses() -> Result<(), AdapterError> {
        let id = ColumnSpec::new("id", "integer").primary().length(ColumnLength::Fixed(11));
        assert_eq!(build_column_clause(&id, plain)?, "\"id\" integer primary key");

        let code = ColumnSpec::new("code", "string").primary().length(ColumnLength::Fixed(8));
        assert_eq!(build_column_clause(&code, plain)?, "\"code\" varchar(8) NOT NULL");

        let hits = ColumnSpec::new("hits", "integer").default_value(0_i64).nullable(false);
        assert_eq!(build_column_clause(&hits, plain)?, "\"hits\" integer DEFAULT 0 NOT NULL");

        let note = ColumnSpec::new("note", "text").nullable(true);
        assert_eq!(build_column_clause(&note, plain)?, "\"note\" text DEFAULT NULL");

        let title = ColumnSpec::new("title", "string").nullable(false);
        assert_eq!(build_column_clause(&title, plain)?, "\"title\" varchar(255) NOT NULL");

        let body = ColumnSpec::new("body", "text");
        assert_eq!(build_column_clause(&body, plain)?, "\"body\" text");
        Ok(())
    }

    #[test]
    fn column_clause_requires_name_and_type() {
        let unnamed = ColumnSpec::new("", "text");
        assert!(matches!(
            build_column_clause(&unnamed, plain),
            Err(AdapterError::SchemaError(_))
        ));
        let untyped = ColumnSpec {
            name: "x".into(),
            ..ColumnSpec::default()
        };
        assert!(matches!(
            build_column_clause(&untyped, plain),
            Err(AdapterError::SchemaError(_))
        ));
    }

    #[test]
    fn formats_values_per_kind() {
        let int = ColumnKind::Integer.descriptor().format.unwrap();
        assert_eq!(int.apply(&RowValues::Text("42abc".into())), Some("42".into()));
        assert_eq!(int.apply(&RowValues::Text("abc".into())), Some("0".into()));
        let date = ColumnKind::Date.descriptor().format.unwrap();
        assert_eq!(
            date.apply(&RowValues::Text("2024-02-03 10:11:12".into())),
            Some("2024-02-03".into())
        );
    }

    #[test]
    fn describe_strips_housekeeping_and_marks_alias() {
        let names = Arc::new(
            ["name", "type", "null", "key", "default", "extra"]
                .iter()
                .map(|s| (*s).to_owned())
                .collect::<Vec<_>>(),
        );
        let row = |name: &str, ty: &str, null: &str, extra: &str| {
            DbRow::new(
                Arc::clone(&names),
                vec![
                    name.into(),
                    ty.into(),
                    null.into(),
                    "".into(),
                    RowValues::Null,
                    extra.into(),
                ],
            )
        };
        assert!(describe_field(&row("rowid", "INTEGER", "YES", "")).is_none());
        assert!(describe_field(&row("utime", "INTEGER", "YES", "")).is_none());

        let id = describe_field(&row("id", "INTEGER", "YES", ALIAS_FOR_PRIMARY_KEY)).unwrap();
        assert!(!id.null);
        assert_eq!(id.key, Some(ColumnKey::Primary));
        assert_eq!(id.length, Some(ColumnLength::Fixed(PRIMARY_KEY_DEFAULT_LENGTH)));

        let url = describe_field(&row("url", "varchar(200)", "YES", "")).unwrap();
        assert_eq!(url.kind, ColumnKind::String);
        assert_eq!(url.length, Some(ColumnLength::Fixed(200)));
        assert!(url.null);
        assert_eq!(url.key, None);
    }
}
