//! Append-only correction logs
//!
//! A [`CorrectionLog`] records one side of a correction conversation: each
//! instruction the user typed and each acknowledgement the system answered
//! with. Entries are immutable once appended and are never reordered or
//! deduplicated.

use serde::{Deserialize, Serialize};

/// Who produced a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instruction typed by the user
    User,
    /// Acknowledgement produced by the subsystem
    System,
}

impl Role {
    /// Lowercase role name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message of a correction conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionLogEntry {
    role: Role,
    content: String,
}

impl CorrectionLogEntry {
    /// Create an entry
    #[inline]
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Entry authored by the user
    #[inline]
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Entry authored by the system
    #[inline]
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[inline]
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[inline]
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Ordered, append-only sequence of [`CorrectionLogEntry`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrectionLog {
    entries: Vec<CorrectionLogEntry>,
}

impl CorrectionLog {
    /// Create an empty log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry at the end
    #[inline]
    pub fn append(&mut self, entry: CorrectionLogEntry) {
        self.entries.push(entry);
    }

    /// Entries in insertion order, for display
    #[inline]
    #[must_use]
    pub fn to_sequence(&self) -> &[CorrectionLogEntry] {
        &self.entries
    }

    /// Iterate in insertion order
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, CorrectionLogEntry> {
        self.entries.iter()
    }

    /// Most recent entry
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&CorrectionLogEntry> {
        self.entries.last()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a CorrectionLog {
    type Item = &'a CorrectionLogEntry;
    type IntoIter = std::slice::Iter<'a, CorrectionLogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
