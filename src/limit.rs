//! Synthetic LIMIT/OFFSET clauses.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

const LIMIT_KEYWORD: &str = "LIMIT";
const OFFSET_KEYWORD: &str = "OFFSET";

static LIMIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blimit\b").expect("limit pattern is valid"));

/// Whether `sql` already mentions the limit keyword.
#[must_use]
pub fn has_limit_keyword(sql: &str) -> bool {
    LIMIT_RE.is_match(sql)
}

/// The clause to append for `count` rows after skipping `offset`.
///
/// `None` when `count` is zero.
#[must_use]
pub fn clause(count: u64, offset: Option<u64>) -> Option<String> {
    (count > 0).then(|| render(true, count, offset))
}

fn render(with_keyword: bool, count: u64, offset: Option<u64>) -> String {
    let mut out = String::new();
    if with_keyword {
        out.push(' ');
        out.push_str(LIMIT_KEYWORD);
    }
    out.push_str(&format!(" {count}"));
    if let Some(offset) = offset {
        out.push_str(&format!(" {OFFSET_KEYWORD} {offset}"));
    }
    out
}

/// Bound `sql` to `count` rows, optionally skipping `offset`.
///
/// A zero count leaves the statement untouched. When the caller already wrote
/// the limit keyword it is not repeated; only the numbers are appended.
#[must_use]
pub fn apply(sql: &str, count: u64, offset: Option<u64>) -> Cow<'_, str> {
    if count == 0 {
        return Cow::Borrowed(sql);
    }
    let tail = render(!has_limit_keyword(sql), count, offset);
    Cow::Owned(format!("{}{tail}", sql.trim_end()))
}
