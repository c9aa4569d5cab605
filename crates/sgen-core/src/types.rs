//! Core types for SGEN
//!
//! Defines:
//! - Session configuration
//! - Session, record and owner identifiers
//! - History records
//! - Snapshots published to observers and per-operation reports

use crate::error::Notice;
use crate::state::Phase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sgen_artifact::{ContentHash, ScriptArtifact, SCRIPT_HEADER};
use sgen_correct::ValidationReport;
use ulid::Ulid;

/// Unique session identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Generate new session ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique history record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub Ulid);

impl RecordId {
    /// Generate new record ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authenticated owner of persisted scripts
///
/// Authentication itself happens elsewhere; a session with an owner attached
/// is treated as authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub String);

impl OwnerId {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Preamble prepended to every artifact
    pub header: String,
    /// Progress gained per streamed fragment
    pub progress_step: u8,
    /// Tag used when the script has no tagged insert
    pub default_tag: String,
    /// Log acknowledgement for an applied script refinement
    pub script_ack: String,
    /// Log acknowledgement for an applied source refinement
    pub source_ack: String,
}

impl SessionConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With header
    #[inline]
    #[must_use]
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    /// With progress step (0 is treated as 1)
    #[inline]
    #[must_use]
    pub fn with_progress_step(mut self, step: u8) -> Self {
        self.progress_step = step;
        self
    }

    /// With default tag
    #[inline]
    #[must_use]
    pub fn with_default_tag(mut self, tag: impl Into<String>) -> Self {
        self.default_tag = tag.into();
        self
    }

    /// Effective progress step
    #[inline]
    #[must_use]
    pub fn effective_progress_step(&self) -> u8 {
        self.progress_step.max(1)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            header: SCRIPT_HEADER.to_string(),
            progress_step: 5,
            default_tag: "SCRIPT".to_string(),
            script_ack: "Script updated.".to_string(),
            source_ack: "Source text updated.".to_string(),
        }
    }
}

/// A script saved to history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptRecord {
    pub id: RecordId,
    pub owner: OwnerId,
    pub tag: String,
    pub text: String,
    pub checksum: ContentHash,
    pub created_at: DateTime<Utc>,
}

impl ScriptRecord {
    /// Build a fresh record for an artifact
    #[must_use]
    pub fn new(artifact: &ScriptArtifact, tag: impl Into<String>, owner: OwnerId) -> Self {
        Self {
            id: RecordId::new(),
            owner,
            tag: tag.into(),
            text: artifact.text(),
            checksum: artifact.checksum(),
            created_at: Utc::now(),
        }
    }
}

/// Observable state, published after every change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub progress: u8,
    pub artifact_text: String,
}

/// Result of one generation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    /// Whether the stream ran to completion and the script was finalized
    pub completed: bool,
    /// Derived script tag (only for completed runs)
    pub tag: Option<String>,
    /// Validation of the finalized body (empty for interrupted runs)
    pub validation: ValidationReport,
    /// Record saved to history, when an owner is attached and the save succeeded
    pub record: Option<RecordId>,
    /// Failures surfaced during the run
    pub notices: Vec<Notice>,
}

/// Outcome of one refinement round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Rewrite succeeded and replaced the target
    Applied,
    /// Rewrite failed; target untouched
    Rejected { reason: String },
}

impl RoundOutcome {
    #[inline]
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, RoundOutcome::Applied)
    }
}
