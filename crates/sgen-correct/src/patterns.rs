//! Compiled patterns shared by the correction passes and the validator
//!
//! All patterns are constant and compiled once on first use.

use once_cell::sync::Lazy;
use regex::Regex;

/// Statement terminator
pub(crate) const TERMINATOR: char = ';';

/// Opening grouping symbol
pub(crate) const OPEN_GROUP: char = '(';

/// Closing grouping symbol
pub(crate) const CLOSE_GROUP: char = ')';

/// Quote character delimiting string literals
pub(crate) const QUOTE: char = '\'';

fn compile(pattern: &str) -> Regex {
    // Patterns are literals in this module and covered by tests
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern:?}: {e}"))
}

/// Complete opening fence, optionally followed by a language tag
pub(crate) static FENCE_OPEN: Lazy<Regex> =
    Lazy::new(|| compile(r"^\s*```[A-Za-z0-9_+-]*[ \t]*(?:\r?\n|$)"));

/// Complete closing fence at the end of the text
pub(crate) static FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| compile(r"(?:\r?\n)?[ \t]*```\s*$"));

/// Opening fence that has only partly arrived (no newline yet)
pub(crate) static FENCE_OPEN_PARTIAL: Lazy<Regex> =
    Lazy::new(|| compile(r"^\s*`{1,3}[A-Za-z0-9_+-]*[ \t]*$"));

/// Closing fence that has only partly arrived, alone on the last line
pub(crate) static FENCE_CLOSE_PARTIAL: Lazy<Regex> =
    Lazy::new(|| compile(r"\r?\n[ \t]*`{1,2}[ \t]*$"));

/// Run of list separators (with any whitespace between) left dangling before
/// a terminator
pub(crate) static DANGLING_SEPARATOR: Lazy<Regex> = Lazy::new(|| compile(r",[\s,]*;"));

/// Terminator followed by at least one line break
pub(crate) static STATEMENT_BREAK: Lazy<Regex> = Lazy::new(|| compile(r";[ \t\r]*\n\s*"));

/// Subquery resolving an internal id through the human-readable `code` column
pub(crate) static CODE_LOOKUP: Lazy<Regex> = Lazy::new(|| {
    compile(r#"(?i)\(\s*select\s+[`"]?id[`"]?\s+from\s+[`"]?\w+[`"]?\s+where\s+[`"]?code[`"]?\s*="#)
});

/// Insert statement whose first value is the script's `temp_id` tag
pub(crate) static TAGGED_INSERT: Lazy<Regex> = Lazy::new(|| {
    compile(
        r#"(?i)insert\s+into\s+[`"]?\w+[`"]?\s*\(\s*[`"]?temp_id[`"]?[^)]*\)\s*values\s*\(\s*'([^']+)'"#,
    )
});
