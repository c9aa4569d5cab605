//! Auto-correction of generated scripts
//!
//! Repairs the structural defects the generator is known to produce:
//! a missing final terminator, a list separator left before a terminator and
//! unclosed groups. The result is re-segmented into one statement per
//! paragraph.
//!
//! This is not a SQL parser. Every pass is a string heuristic that assumes
//! the input is mostly-correct machine output.

use crate::patterns::{CLOSE_GROUP, DANGLING_SEPARATOR, OPEN_GROUP, STATEMENT_BREAK, TERMINATOR};
use regex::Captures;

/// Net count of opening minus closing grouping symbols
///
/// Order is ignored, so `")("` counts as balanced.
#[must_use]
pub fn group_balance(text: &str) -> i64 {
    text.chars().fold(0i64, |balance, c| match c {
        OPEN_GROUP => balance + 1,
        CLOSE_GROUP => balance - 1,
        _ => balance,
    })
}

/// Correct a raw script body
///
/// Total and deterministic; applying it to its own output is a no-op. Any
/// code fence must already have been stripped by the caller.
///
/// # Passes
/// 1. Trim; empty input gives empty output
/// 2. Ensure a final terminator
/// 3. Drop separators dangling before a terminator
/// 4. Close unclosed groups before the last terminator (surplus closers are left alone)
/// 5. Split into statements, trim them and end each one with a single terminator
/// 6. Join with a blank line and end with a single newline
#[must_use]
pub fn correct(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let mut text = trimmed.to_owned();
    if !text.ends_with(TERMINATOR) {
        text.push(TERMINATOR);
    }

    let text = drop_dangling_separators(text);
    let text = close_open_groups(text);

    let statements = split_statements(&text);
    if statements.is_empty() {
        // Nothing but terminators and whitespace
        return format!("{TERMINATOR}\n");
    }
    let mut out = statements.join("\n\n");
    out.push('\n');
    out
}

/// Drop every separator in a `,`/whitespace run that ends in `;`
///
/// The whitespace of the run is kept in order, so `, ,\n;` becomes ` \n;`.
fn drop_dangling_separators(text: String) -> String {
    DANGLING_SEPARATOR
        .replace_all(&text, |caps: &Captures<'_>| {
            caps[0].chars().filter(|c| *c != ',').collect::<String>()
        })
        .into_owned()
}

/// Insert the missing closers right before the last terminator
fn close_open_groups(mut text: String) -> String {
    let missing = group_balance(&text);
    if missing <= 0 {
        return text;
    }
    if let Some(at) = text.rfind(TERMINATOR) {
        let closers: String = std::iter::repeat(CLOSE_GROUP)
            .take(usize::try_from(missing).unwrap_or(0))
            .collect();
        text.insert_str(at, &closers);
    }
    text
}

/// Split on terminator + line break into statements ending in exactly one terminator
///
/// Trailing terminators and whitespace are trimmed off each statement before
/// the single terminator is put back, so statements that were only
/// terminators disappear.
fn split_statements(text: &str) -> Vec<String> {
    STATEMENT_BREAK
        .split(text)
        .map(|statement| {
            statement
                .trim_end_matches(|c: char| c == TERMINATOR || c.is_whitespace())
                .trim_start()
        })
        .filter(|statement| !statement.is_empty())
        .map(|statement| format!("{statement}{TERMINATOR}"))
        .collect()
}
