//! The generated script document
//!
//! A [`ScriptArtifact`] is a fixed header followed by a mutable body. Only the
//! body is streamed into, corrected, validated and refined; the header is
//! carried along unchanged and prepended whenever the artifact is shown.

use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};

/// Preamble prepended to every generated script
pub const SCRIPT_HEADER: &str = "-- Generated assessment script\n\
-- Review every statement before running it against the question bank\n\
SET NAMES utf8mb4;";

/// Separator between header and body
pub const HEADER_SEPARATOR: &str = "\n\n";

/// Generated or refined script document
///
/// # Invariants
/// - The exposed text is always `header + HEADER_SEPARATOR + body`
/// - The header never changes after construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptArtifact {
    header: String,
    body: String,
}

impl ScriptArtifact {
    /// Create an artifact with an empty body
    #[inline]
    #[must_use]
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            body: String::new(),
        }
    }

    /// Create an artifact carrying [`SCRIPT_HEADER`]
    #[inline]
    #[must_use]
    pub fn with_default_header() -> Self {
        Self::new(SCRIPT_HEADER)
    }

    /// The fixed preamble
    #[inline]
    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }

    /// The mutable part of the script
    #[inline]
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Whether nothing has been streamed or generated yet
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Replace the body wholesale
    ///
    /// Streaming and successful refinement rounds are the only callers; the
    /// body is never edited in place.
    #[inline]
    pub fn replace_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }

    /// Drop the body, keeping the header
    #[inline]
    pub fn clear_body(&mut self) {
        self.body.clear();
    }

    /// Full text shown to the user
    #[must_use]
    pub fn text(&self) -> String {
        let mut out =
            String::with_capacity(self.header.len() + HEADER_SEPARATOR.len() + self.body.len());
        out.push_str(&self.header);
        out.push_str(HEADER_SEPARATOR);
        out.push_str(&self.body);
        out
    }

    /// Checksum of [`ScriptArtifact::text`]
    #[inline]
    #[must_use]
    pub fn checksum(&self) -> ContentHash {
        ContentHash::of_text(&self.text())
    }
}

impl Default for ScriptArtifact {
    fn default() -> Self {
        Self::with_default_header()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_artifact_is_empty() {
        let artifact = ScriptArtifact::with_default_header();
        assert!(artifact.is_empty());
        assert_eq!(artifact.header(), SCRIPT_HEADER);
        assert_eq!(artifact.text(), format!("{SCRIPT_HEADER}{HEADER_SEPARATOR}"));
    }

    #[test]
    fn text_is_header_separator_body() {
        let mut artifact = ScriptArtifact::new("-- h");
        artifact.replace_body("INSERT INTO t VALUES (1);\n");
        assert_eq!(artifact.text(), "-- h\n\nINSERT INTO t VALUES (1);\n");
    }

    #[test]
    fn replace_body_keeps_header() {
        let mut artifact = ScriptArtifact::new("-- h");
        artifact.replace_body("a;\n");
        artifact.replace_body("b;\n");
        assert_eq!(artifact.header(), "-- h");
        assert_eq!(artifact.body(), "b;\n");

        artifact.clear_body();
        assert!(artifact.is_empty());
        assert_eq!(artifact.header(), "-- h");
    }

    #[test]
    fn checksum_follows_body() {
        let mut artifact = ScriptArtifact::new("-- h");
        let empty = artifact.checksum();
        artifact.replace_body("a;\n");
        assert_ne!(empty, artifact.checksum());
        assert_eq!(artifact.checksum(), ContentHash::of_text("-- h\n\na;\n"));
    }
}
