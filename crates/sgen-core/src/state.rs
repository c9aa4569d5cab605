//! Session phase state machine
//!
//! Every phase change of a [`GenerationSession`](crate::GenerationSession)
//! goes through [`validate_transition`]. `Error` is transient: a failing
//! operation passes through it and returns to the stable phase it started from.

use crate::error::SessionError;
use serde::{Deserialize, Serialize};

/// Lifecycle phase of a generation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No script yet
    #[default]
    Idle,
    /// Turning an uploaded document into source text
    Extracting,
    /// Fragments are streaming in
    Generating,
    /// Correcting, validating and persisting the streamed script
    Finalizing,
    /// Script available; refinement accepted
    Ready,
    /// A script refinement round is in flight
    Refining,
    /// An external step failed; about to return to the prior stable phase
    Error,
}

impl Phase {
    /// Stable phases are the only ones an idle session can rest in
    #[inline]
    #[must_use]
    pub fn is_stable(&self) -> bool {
        matches!(self, Phase::Idle | Phase::Ready)
    }
}

/// Phases reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: Phase) -> &'static [Phase] {
    use Phase::*;
    match from {
        Idle => &[Extracting, Generating],
        Extracting => &[Idle, Ready, Error],
        Generating => &[Finalizing, Error],
        Finalizing => &[Ready, Error],
        Ready => &[Extracting, Generating, Refining],
        Refining => &[Ready, Error],
        Error => &[Idle, Ready],
    }
}

/// Check a single phase change
///
/// # Errors
/// `SessionError::IllegalTransition` when `to` is not reachable from `from`
pub fn validate_transition(from: Phase, to: Phase) -> Result<(), SessionError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(SessionError::IllegalTransition { from, to })
    }
}
