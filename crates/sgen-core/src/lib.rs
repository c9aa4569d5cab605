//! SGEN Core - Generation session orchestration
//!
//! Drives one generated SQL script through its lifecycle:
//! - Streams generator fragments into the artifact with live progress
//! - Finalizes the script (fence stripping, auto-correction, validation, tagging)
//! - Saves finished scripts to history for authenticated owners
//! - Runs instruction-driven refinement rounds on the script and its source text
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sgen_core::{GenerationSession, Phase, ReplayGenerator};
//!
//! # async fn example() -> Result<(), sgen_core::SessionError> {
//! let generator = Arc::new(ReplayGenerator::new("```sql\nINSERT INTO t VALUES (1, 'a'\n```", 8));
//! let mut session = GenerationSession::builder(generator).build();
//!
//! let report = session.start_generation("Chapter 3: fractions").await?;
//! assert!(report.validation.is_clean());
//! assert_eq!(session.phase(), Phase::Ready);
//! assert_eq!(session.current_artifact().body(), "INSERT INTO t VALUES (1, 'a');\n");
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod collaborators;
pub mod error;
pub mod handle;
pub mod refine;
pub mod session;
pub mod state;
pub mod stream;
pub mod types;

pub use collaborators::{
    FragmentStream, HistoryStore, ReplayGenerator, Rewriter, SourceExtractor, TextGenerator,
    UnconfiguredExtractor, UnconfiguredRewriter,
};
pub use error::{CollaboratorError, Notice, SessionError};
pub use handle::SessionHandle;
pub use refine::{PostProcess, RefineTarget, RefinementLoop, ScriptCorrection, SourceText, Verbatim};
pub use session::{GenerationSession, SessionBuilder};
pub use state::{allowed_transitions, validate_transition, Phase};
pub use stream::{Progress, StreamAssembler, PROGRESS_CEILING, PROGRESS_DONE};
pub use types::{
    GenerationReport, OwnerId, RecordId, RoundOutcome, ScriptRecord, SessionConfig, SessionId,
    SessionSnapshot,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a session
    pub use crate::{
        GenerationReport, GenerationSession, HistoryStore, Notice, OwnerId, Phase, Rewriter,
        RoundOutcome, SessionConfig, SessionError, SessionHandle, TextGenerator,
    };
    pub use sgen_artifact::{CorrectionLog, ScriptArtifact};
    pub use sgen_correct::ValidationReport;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
