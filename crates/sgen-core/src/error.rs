//! Error types for SGEN Core
//!
//! Provides error handling for:
//! - External collaborator failures (generator, rewriters, history, extractor)
//! - Rejected session operations
//! - Notices surfaced to the caller for failures that do not abort an operation

use crate::state::Phase;
use serde::{Deserialize, Serialize};

/// Failure reported by an external collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// Generator refused to start a stream
    #[error("generator failed: {0}")]
    Generator(String),

    /// Stream broke off before completion
    #[error("stream interrupted: {0}")]
    Stream(String),

    /// Rewrite capability failed
    #[error("rewrite failed: {0}")]
    Rewrite(String),

    /// History store could not save
    #[error("persistence failed: {0}")]
    Persistence(String),

    /// Source document could not be turned into text
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// No implementation configured for this capability
    #[error("{0} is not configured")]
    Unavailable(String),
}

impl CollaboratorError {
    /// Check if retrying the same call may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Unavailable(_))
    }
}

/// Rejected or failed session operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Generation needs source text
    #[error("source text is empty")]
    EmptySource,

    /// Refinement needs an instruction
    #[error("instruction is empty")]
    EmptyInstruction,

    /// Script refinement outside of `Ready`
    #[error("no script ready to refine (phase: {phase:?})")]
    NotReady { phase: Phase },

    /// Another operation is still in flight on this session
    #[error("session is busy with another operation")]
    Busy,

    /// State machine violation
    #[error("illegal phase transition: {from:?} -> {to:?}")]
    IllegalTransition { from: Phase, to: Phase },

    /// Source extraction failed
    #[error("source extraction failed: {0}")]
    Extraction(#[from] CollaboratorError),
}

impl SessionError {
    /// Check if the same call may succeed later
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Busy => true,
            Self::Extraction(inner) => inner.is_retryable(),
            _ => false,
        }
    }
}

/// Failure surfaced to the caller without aborting the operation
///
/// Refinement failures are recorded in the correction log instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Generation stopped early; the artifact keeps what was streamed
    #[error("Script generation failed: {reason}")]
    StreamFailed { reason: String },

    /// The finished script could not be saved to history
    #[error("Could not save the script to history: {reason}")]
    PersistFailed { reason: String },

    /// The uploaded document could not be read
    #[error("Could not read the source document: {reason}")]
    ExtractionFailed { reason: String },
}
