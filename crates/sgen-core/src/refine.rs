//! Instruction-driven refinement rounds
//!
//! One [`RefinementLoop`] drives both the script and the source text. A round
//! appends the instruction to the loop's correction log, asks the rewriter for
//! a replacement, and then either swaps the post-processed result in and logs
//! the acknowledgement, or leaves the target alone and logs the failure.

use crate::collaborators::Rewriter;
use crate::error::SessionError;
use crate::types::RoundOutcome;
use sgen_artifact::{CorrectionLog, CorrectionLogEntry, ScriptArtifact};
use sgen_correct::{correct, strip_code_fence};
use std::sync::Arc;

/// Text a refinement loop can rewrite
pub trait RefineTarget {
    /// Text handed to the rewriter
    fn current(&self) -> &str;

    /// Replace the text after a successful rewrite
    fn replace(&mut self, text: String);
}

impl RefineTarget for ScriptArtifact {
    fn current(&self) -> &str {
        self.body()
    }

    fn replace(&mut self, text: String) {
        self.replace_body(text);
    }
}

/// Plain source text the script is generated from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceText(String);

impl SourceText {
    #[inline]
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    #[inline]
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.0 = text.into();
    }
}

impl RefineTarget for SourceText {
    fn current(&self) -> &str {
        &self.0
    }

    fn replace(&mut self, text: String) {
        self.0 = text;
    }
}

/// Transformation applied to a rewriter's output before it is stored
pub trait PostProcess {
    fn apply(&self, rewritten: &str) -> String;
}

/// Store the rewriter's output as-is
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl PostProcess for Verbatim {
    fn apply(&self, rewritten: &str) -> String {
        rewritten.to_string()
    }
}

/// Strip code fences and run auto-correction
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptCorrection;

impl PostProcess for ScriptCorrection {
    fn apply(&self, rewritten: &str) -> String {
        correct(strip_code_fence(rewritten))
    }
}

/// A target, its correction log and the capability that rewrites it
pub struct RefinementLoop<T, P> {
    target: T,
    log: CorrectionLog,
    rewriter: Arc<dyn Rewriter>,
    post: P,
    ack: String,
}

impl<T: RefineTarget, P: PostProcess> RefinementLoop<T, P> {
    /// Create a loop with an empty log
    ///
    /// `ack` is appended as a system entry after every applied round.
    #[must_use]
    pub fn new(target: T, rewriter: Arc<dyn Rewriter>, post: P, ack: impl Into<String>) -> Self {
        Self {
            target,
            log: CorrectionLog::new(),
            rewriter,
            post,
            ack: ack.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Mutable access for writers other than the loop (streaming)
    #[inline]
    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    #[inline]
    #[must_use]
    pub fn log(&self) -> &CorrectionLog {
        &self.log
    }

    /// Start over with an empty log
    pub fn reset_log(&mut self) {
        self.log = CorrectionLog::new();
    }

    /// Log a failed round without calling the rewriter
    pub fn record_failure(&mut self, reason: &str) {
        self.log
            .append(CorrectionLogEntry::system(format!("Correction failed: {reason}")));
    }

    /// Run one round
    ///
    /// A failed rewrite is not an error: it is recorded in the log and
    /// reported as [`RoundOutcome::Rejected`].
    ///
    /// # Errors
    /// `SessionError::EmptyInstruction` for blank instructions; nothing is logged
    pub async fn round(&mut self, instruction: &str) -> Result<RoundOutcome, SessionError> {
        if instruction.trim().is_empty() {
            return Err(SessionError::EmptyInstruction);
        }

        self.log.append(CorrectionLogEntry::user(instruction));

        let rewriter = Arc::clone(&self.rewriter);
        match rewriter.rewrite(self.target.current(), instruction).await {
            Ok(rewritten) => {
                let processed = self.post.apply(&rewritten);
                self.target.replace(processed);
                self.log.append(CorrectionLogEntry::system(self.ack.clone()));
                Ok(RoundOutcome::Applied)
            }
            Err(err) => {
                tracing::warn!(error = %err, "rewrite failed");
                let reason = err.to_string();
                self.record_failure(&reason);
                Ok(RoundOutcome::Rejected { reason })
            }
        }
    }
}

impl<T: std::fmt::Debug, P: std::fmt::Debug> std::fmt::Debug for RefinementLoop<T, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefinementLoop")
            .field("target", &self.target)
            .field("log_len", &self.log.len())
            .field("post", &self.post)
            .field("ack", &self.ack)
            .finish_non_exhaustive()
    }
}
