//! Advisory validation of script bodies
//!
//! The validator scans a body line by line and reports what looks wrong. It
//! never edits the body and never fails. An empty report means nothing was
//! detected, not that the script is correct.

use crate::correct::group_balance;
use crate::patterns::{CODE_LOOKUP, QUOTE};
use indexmap::IndexSet;
use serde::{Serialize, Serializer};
use std::fmt;

/// A detected defect
///
/// The `Display` form is the human-readable message shown to the user, and
/// two defects are the same when their messages are.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Defect {
    /// Opening and closing parentheses do not net out over the whole script
    UnbalancedGrouping,
    /// Odd number of quote characters on a line
    UnterminatedLiteral {
        /// 1-based line number
        line: usize,
    },
    /// Internal id resolved through the `code` column
    DeprecatedCodeLookup {
        /// 1-based line number
        line: usize,
    },
}

impl Defect {
    /// Line the defect points at, if it is line-specific
    #[inline]
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Defect::UnbalancedGrouping => None,
            Defect::UnterminatedLiteral { line } | Defect::DeprecatedCodeLookup { line } => {
                Some(*line)
            }
        }
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Defect::UnbalancedGrouping => f.write_str("Unbalanced parentheses in script"),
            Defect::UnterminatedLiteral { line } => {
                write!(f, "Possibly unterminated string literal on line {line}")
            }
            Defect::DeprecatedCodeLookup { line } => write!(
                f,
                "Deprecated code-based lookup on line {line}: use the temp_id column instead"
            ),
        }
    }
}

impl Serialize for Defect {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Ordered, duplicate-free set of defects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    defects: IndexSet<Defect>,
}

impl ValidationReport {
    /// Empty report
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a defect; repeats of an already-recorded message are ignored
    #[inline]
    pub fn push(&mut self, defect: Defect) {
        self.defects.insert(defect);
    }

    /// Whether nothing was detected
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.defects.is_empty()
    }

    /// Number of distinct defects
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.defects.len()
    }

    /// Same as [`ValidationReport::is_clean`]
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defects.is_empty()
    }

    /// Defects in first-occurrence order
    #[inline]
    pub fn defects(&self) -> impl Iterator<Item = &Defect> {
        self.defects.iter()
    }

    /// Messages in first-occurrence order
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.defects.iter().map(ToString::to_string).collect()
    }

    /// Whether a given defect was reported
    #[inline]
    #[must_use]
    pub fn contains(&self, defect: &Defect) -> bool {
        self.defects.contains(defect)
    }
}

impl Serialize for ValidationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.defects.iter())
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for defect in &self.defects {
            writeln!(f, "- {defect}")?;
        }
        Ok(())
    }
}

/// Scan a script body for defects
#[must_use]
pub fn validate(body: &str) -> ValidationReport {
    let mut report = ValidationReport::new();
    let mut balance = 0i64;

    for (index, line) in body.lines().enumerate() {
        let line_no = index + 1;
        balance += group_balance(line);

        if line.chars().filter(|&c| c == QUOTE).count() % 2 == 1 {
            report.push(Defect::UnterminatedLiteral { line: line_no });
        }
        if CODE_LOOKUP.is_match(line) {
            report.push(Defect::DeprecatedCodeLookup { line: line_no });
        }
    }

    if balance != 0 {
        report.push(Defect::UnbalancedGrouping);
    }
    report
}
