//! Emulated prepared statements.
//!
//! The engine has no native parameter binding, so prepared statements are
//! rendered client side: each `?`, `?N` or `:name` placeholder outside quoted
//! text and comments is replaced by the quoted literal for its value.

use std::borrow::Cow;

use indexmap::IndexMap;

use crate::error::AdapterError;
use crate::types::RowValues;

mod scanner;

use scanner::{
    State, is_block_comment_end, is_block_comment_start, is_line_comment_start, scan_digits,
    scan_name,
};

/// Values for a statement's placeholders.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BindParams {
    #[default]
    None,
    /// Values for `?` (in order) and `?N` (1-based).
    Positional(Vec<RowValues>),
    /// Values for `:name`; keys may be given with or without the colon.
    Named(IndexMap<String, RowValues>),
}

impl BindParams {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            BindParams::None => true,
            BindParams::Positional(values) => values.is_empty(),
            BindParams::Named(values) => values.is_empty(),
        }
    }

    fn positional(&self, position: usize) -> Result<&RowValues, AdapterError> {
        match self {
            BindParams::Positional(values) => values.get(position).ok_or_else(|| {
                statement_error(format!("no value bound for placeholder {}", position + 1))
            }),
            BindParams::Named(_) => Err(statement_error(
                "positional placeholder used with named parameters".into(),
            )),
            BindParams::None => Err(statement_error(format!(
                "no value bound for placeholder {}",
                position + 1
            ))),
        }
    }

    fn named(&self, name: &str) -> Result<&RowValues, AdapterError> {
        match self {
            BindParams::Named(values) => values
                .get(name)
                .or_else(|| values.get(&format!(":{name}")))
                .ok_or_else(|| statement_error(format!("no value bound for :{name}"))),
            _ => Err(statement_error(format!(
                "named placeholder :{name} used without named parameters"
            ))),
        }
    }
}

impl From<Vec<RowValues>> for BindParams {
    fn from(values: Vec<RowValues>) -> Self {
        BindParams::Positional(values)
    }
}

impl<K: Into<String>, const N: usize> From<[(K, RowValues); N]> for BindParams {
    fn from(pairs: [(K, RowValues); N]) -> Self {
        BindParams::Named(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

fn statement_error(message: String) -> AdapterError {
    AdapterError::StatementError { message }
}

/// Replace every placeholder in `sql` with `render(value)`.
///
/// Returns a borrowed `Cow` when the statement has no placeholders.
///
/// # Errors
/// `AdapterError::StatementError` when a placeholder has no value, the
/// placeholder style does not match `params`, or positional values are left
/// over.
pub fn bind<'a>(
    sql: &'a str,
    params: &BindParams,
    render: impl Fn(&RowValues) -> String,
) -> Result<Cow<'a, str>, AdapterError> {
    let bytes = sql.as_bytes();
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut next_positional = 0;
    let mut positions_used = 0;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => {
                let found = match b {
                    b'\'' => {
                        state = State::SingleQuoted;
                        None
                    }
                    b'"' => {
                        state = State::DoubleQuoted;
                        None
                    }
                    b'`' => {
                        state = State::Backticked;
                        None
                    }
                    b'[' => {
                        state = State::Bracketed;
                        None
                    }
                    _ if is_line_comment_start(bytes, idx) => {
                        state = State::LineComment;
                        None
                    }
                    _ if is_block_comment_start(bytes, idx) => {
                        state = State::BlockComment;
                        idx += 1;
                        None
                    }
                    b'?' => {
                        let (end, position) = match scan_digits(bytes, idx + 1) {
                            Some((end, digits)) => {
                                let n: usize = digits.parse().unwrap_or(0);
                                if n == 0 {
                                    return Err(statement_error(format!(
                                        "invalid placeholder ?{digits}"
                                    )));
                                }
                                (end, n - 1)
                            }
                            None => {
                                next_positional += 1;
                                (idx + 1, next_positional - 1)
                            }
                        };
                        positions_used = positions_used.max(position + 1);
                        Some((end, params.positional(position)?))
                    }
                    b':' => match scan_name(bytes, idx) {
                        Some((end, name)) => Some((end, params.named(name)?)),
                        None => None,
                    },
                    _ => None,
                };
                if let Some((end, value)) = found {
                    let buf = out.get_or_insert_with(|| String::with_capacity(sql.len() + 16));
                    buf.push_str(&sql[copied..idx]);
                    buf.push_str(&render(value));
                    copied = end;
                    idx = end;
                    continue;
                }
            }
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Backticked => {
                if b == b'`' {
                    state = State::Normal;
                }
            }
            State::Bracketed => {
                if b == b']' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if is_block_comment_end(bytes, idx) {
                    state = State::Normal;
                    idx += 1;
                }
            }
        }
        idx += 1;
    }

    if let BindParams::Positional(values) = params
        && values.len() > positions_used
    {
        return Err(statement_error(format!(
            "{} values bound for {positions_used} placeholders",
            values.len()
        )));
    }

    Ok(match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    })
}
