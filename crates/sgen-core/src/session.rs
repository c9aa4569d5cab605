//! Generation session orchestrator
//!
//! A [`GenerationSession`] owns one script from source text to refined
//! result. It streams the generator's output into the artifact, finalizes it
//! (correct, validate, tag, persist), and runs refinement rounds on both the
//! script and the source text. Every phase change is checked against the
//! state machine in [`crate::state`] and published on a watch channel.

use crate::collaborators::{
    HistoryStore, Rewriter, SourceExtractor, TextGenerator, UnconfiguredExtractor,
    UnconfiguredRewriter,
};
use crate::error::{CollaboratorError, Notice, SessionError};
use crate::refine::{RefinementLoop, ScriptCorrection, SourceText, Verbatim};
use crate::state::{validate_transition, Phase};
use crate::stream::{StreamAssembler, PROGRESS_DONE};
use crate::types::{
    GenerationReport, OwnerId, RecordId, RoundOutcome, SessionConfig, SessionId, SessionSnapshot,
};
use futures::StreamExt;
use sgen_artifact::{CorrectionLog, ScriptArtifact};
use sgen_correct::{correct, extract_script_tag, strip_code_fence, validate, ValidationReport};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::Instrument;

/// Assembles a [`GenerationSession`] from its collaborators
///
/// Only the generator is required. Rewriters and the extractor default to
/// implementations that fail with `CollaboratorError::Unavailable`; without a
/// history store or an owner nothing is persisted.
pub struct SessionBuilder {
    config: SessionConfig,
    generator: Arc<dyn TextGenerator>,
    script_rewriter: Arc<dyn Rewriter>,
    source_rewriter: Arc<dyn Rewriter>,
    extractor: Arc<dyn SourceExtractor>,
    history: Option<Arc<dyn HistoryStore>>,
    owner: Option<OwnerId>,
}

impl SessionBuilder {
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            config: SessionConfig::default(),
            generator,
            script_rewriter: Arc::new(UnconfiguredRewriter::new("script rewriter")),
            source_rewriter: Arc::new(UnconfiguredRewriter::new("source rewriter")),
            extractor: Arc::new(UnconfiguredExtractor),
            history: None,
            owner: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_script_rewriter(mut self, rewriter: Arc<dyn Rewriter>) -> Self {
        self.script_rewriter = rewriter;
        self
    }

    #[must_use]
    pub fn with_source_rewriter(mut self, rewriter: Arc<dyn Rewriter>) -> Self {
        self.source_rewriter = rewriter;
        self
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn SourceExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    #[must_use]
    pub fn with_history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    /// Attach the authenticated owner finished scripts are saved for
    #[must_use]
    pub fn with_owner(mut self, owner: OwnerId) -> Self {
        self.owner = Some(owner);
        self
    }

    #[must_use]
    pub fn build(self) -> GenerationSession {
        let artifact = ScriptArtifact::new(self.config.header.clone());
        let snapshot = SessionSnapshot {
            phase: Phase::Idle,
            progress: 0,
            artifact_text: artifact.text(),
        };
        let (snapshots, _) = watch::channel(snapshot);

        GenerationSession {
            id: SessionId::new(),
            phase: Phase::Idle,
            resume: Phase::Idle,
            progress: 0,
            script: RefinementLoop::new(
                artifact,
                self.script_rewriter,
                ScriptCorrection,
                self.config.script_ack.clone(),
            ),
            source: RefinementLoop::new(
                SourceText::default(),
                self.source_rewriter,
                Verbatim,
                self.config.source_ack.clone(),
            ),
            validation: ValidationReport::new(),
            tag: None,
            last_record: None,
            notices: Vec::new(),
            generator: self.generator,
            extractor: self.extractor,
            history: self.history,
            owner: self.owner,
            config: self.config,
            snapshots,
        }
    }
}

/// One script's lifecycle
///
/// Mutators take `&mut self`, so a directly owned session can only run one
/// operation at a time. Wrap it in a [`SessionHandle`](crate::SessionHandle)
/// to share it.
pub struct GenerationSession {
    id: SessionId,
    config: SessionConfig,
    phase: Phase,
    /// Stable phase the in-flight operation returns to
    resume: Phase,
    progress: u8,
    script: RefinementLoop<ScriptArtifact, ScriptCorrection>,
    source: RefinementLoop<SourceText, Verbatim>,
    validation: ValidationReport,
    tag: Option<String>,
    last_record: Option<RecordId>,
    notices: Vec<Notice>,
    generator: Arc<dyn TextGenerator>,
    extractor: Arc<dyn SourceExtractor>,
    history: Option<Arc<dyn HistoryStore>>,
    owner: Option<OwnerId>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl GenerationSession {
    /// Start building a session around `generator`
    #[must_use]
    pub fn builder(generator: Arc<dyn TextGenerator>) -> SessionBuilder {
        SessionBuilder::new(generator)
    }

    /// Generate a fresh script from `source`
    ///
    /// Replaces the stored source text, empties the artifact and the script
    /// log, then streams, corrects, validates, tags and (with an owner
    /// attached) persists the result. Stream and persistence failures do not
    /// fail the call; they come back as notices in the report and the session
    /// ends in `Ready` either way.
    ///
    /// # Errors
    /// - `SessionError::EmptySource` for blank source text
    /// - `SessionError::Busy` if an earlier operation was interrupted
    pub async fn start_generation(&mut self, source: &str) -> Result<GenerationReport, SessionError> {
        self.ensure_idle()?;
        if source.trim().is_empty() {
            return Err(SessionError::EmptySource);
        }

        let span = tracing::info_span!("generation", session = %self.id);
        self.run_generation(source).instrument(span).await
    }

    async fn run_generation(&mut self, source: &str) -> Result<GenerationReport, SessionError> {
        self.begin(Phase::Generating)?;
        tracing::info!("Starting generation from {} chars of source text", source.len());

        self.source.target_mut().set_text(source);
        self.script.reset_log();
        self.script.target_mut().clear_body();
        self.progress = 0;
        self.validation = ValidationReport::new();
        self.tag = None;
        self.publish();

        let generator = Arc::clone(&self.generator);
        let mut stream = match generator.generate(source).await {
            Ok(stream) => stream,
            Err(err) => return self.abort_generation(&err),
        };

        let mut assembler = StreamAssembler::new(self.config.effective_progress_step());
        while let Some(item) = stream.next().await {
            match item {
                Ok(fragment) => {
                    let display = assembler.push(&fragment).to_string();
                    tracing::debug!(
                        fragment = assembler.fragment_count(),
                        progress = assembler.progress(),
                        "fragment received"
                    );
                    self.script.target_mut().replace_body(display);
                    self.progress = assembler.progress();
                    self.publish();
                }
                Err(err) => return self.abort_generation(&err),
            }
        }

        let (raw, progress) = assembler.finish();
        self.progress = progress;
        self.transition(Phase::Finalizing)?;
        self.finalize(&raw).await
    }

    async fn finalize(&mut self, raw: &str) -> Result<GenerationReport, SessionError> {
        let body = correct(strip_code_fence(raw));
        self.validation = validate(&body);
        let tag = extract_script_tag(&body)
            .unwrap_or(self.config.default_tag.as_str())
            .to_string();
        self.script.target_mut().replace_body(body);
        self.tag = Some(tag.clone());
        self.publish();
        tracing::info!(tag = %tag, defects = self.validation.len(), "script finalized");

        let mut report = GenerationReport {
            completed: true,
            tag: Some(tag.clone()),
            validation: self.validation.clone(),
            record: None,
            notices: Vec::new(),
        };

        if let (Some(history), Some(owner)) = (self.history.clone(), self.owner.clone()) {
            match history.persist(self.script.target(), &tag, &owner).await {
                Ok(record) => {
                    tracing::info!(
                        record = %record.id,
                        owner = %owner,
                        checksum = %record.checksum.short(),
                        "script saved to history"
                    );
                    self.last_record = Some(record.id);
                    report.record = Some(record.id);
                }
                Err(err) => {
                    tracing::warn!("Persisting script failed: {}", err);
                    let notice = Notice::PersistFailed {
                        reason: err.to_string(),
                    };
                    self.notices.push(notice.clone());
                    report.notices.push(notice);
                    self.transition(Phase::Error)?;
                }
            }
        }

        self.transition(Phase::Ready)?;
        Ok(report)
    }

    /// Stream could not start or broke off: keep what arrived, end at 100
    fn abort_generation(&mut self, err: &CollaboratorError) -> Result<GenerationReport, SessionError> {
        tracing::warn!("Generation failed: {}", err);
        self.progress = PROGRESS_DONE;
        let notice = Notice::StreamFailed {
            reason: err.to_string(),
        };
        self.notices.push(notice.clone());
        self.transition(Phase::Error)?;
        self.transition(Phase::Ready)?;

        Ok(GenerationReport {
            completed: false,
            tag: None,
            validation: ValidationReport::new(),
            record: None,
            notices: vec![notice],
        })
    }

    /// Run one script refinement round
    ///
    /// A failed rewrite leaves the artifact untouched and is recorded in the
    /// script log; the call itself still succeeds.
    ///
    /// # Errors
    /// - `SessionError::NotReady` outside of `Ready`
    /// - `SessionError::EmptyInstruction` for blank instructions
    /// - `SessionError::Busy` if an earlier operation was interrupted
    pub async fn refine(&mut self, instruction: &str) -> Result<RoundOutcome, SessionError> {
        self.ensure_idle()?;
        if self.phase != Phase::Ready {
            return Err(SessionError::NotReady { phase: self.phase });
        }
        if instruction.trim().is_empty() {
            return Err(SessionError::EmptyInstruction);
        }

        let span = tracing::info_span!("refine", session = %self.id);
        async {
            self.begin(Phase::Refining)?;
            let outcome = self.script.round(instruction).await?;
            match &outcome {
                RoundOutcome::Applied => {
                    self.validation = validate(self.script.target().body());
                    tracing::info!(defects = self.validation.len(), "script refined");
                }
                RoundOutcome::Rejected { .. } => self.transition(Phase::Error)?,
            }
            self.transition(Phase::Ready)?;
            Ok::<_, SessionError>(outcome)
        }
        .instrument(span)
        .await
    }

    /// Run one source text refinement round
    ///
    /// Same contract as [`GenerationSession::refine`] minus post-processing
    /// and validation. The phase does not change.
    ///
    /// # Errors
    /// - `SessionError::EmptyInstruction` for blank instructions
    /// - `SessionError::Busy` if an earlier operation was interrupted
    pub async fn refine_source(&mut self, instruction: &str) -> Result<RoundOutcome, SessionError> {
        self.ensure_idle()?;
        let span = tracing::info_span!("refine_source", session = %self.id);
        let outcome = self.source.round(instruction).instrument(span).await?;
        if outcome.is_applied() {
            tracing::info!("Source text refined");
        }
        Ok(outcome)
    }

    /// Replace the source text with the contents of an uploaded document
    ///
    /// # Errors
    /// - `SessionError::Extraction` when the document could not be read;
    ///   a `Notice::ExtractionFailed` is recorded as well
    /// - `SessionError::Busy` if an earlier operation was interrupted
    pub async fn extract_source(&mut self, document: &[u8]) -> Result<(), SessionError> {
        self.ensure_idle()?;
        let span = tracing::info_span!("extract", session = %self.id);
        async {
            let resume = self.begin(Phase::Extracting)?;
            let extractor = Arc::clone(&self.extractor);
            match extractor.extract(document).await {
                Ok(text) => {
                    tracing::info!(bytes = document.len(), chars = text.len(), "source extracted");
                    self.source.target_mut().set_text(text);
                    self.transition(resume)?;
                    Ok(())
                }
                Err(err) => {
                    tracing::warn!("Extraction failed: {}", err);
                    self.notices.push(Notice::ExtractionFailed {
                        reason: err.to_string(),
                    });
                    self.transition(Phase::Error)?;
                    self.transition(resume)?;
                    Err(SessionError::Extraction(err))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Set the source text directly
    ///
    /// # Errors
    /// `SessionError::Busy` if an earlier operation was interrupted
    pub fn set_source_text(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.source.target_mut().set_text(text);
        Ok(())
    }

    /// Return to a stable phase after an operation was dropped mid-flight
    ///
    /// An interrupted generation ends in `Ready` with whatever had streamed
    /// in, like a failed stream. An interrupted refinement round gets its
    /// failure entry in the script log. Does nothing on an idle session.
    pub fn recover(&mut self) {
        let interrupted = self.phase;
        if interrupted.is_stable() {
            return;
        }
        tracing::warn!(phase = ?interrupted, "recovering interrupted session");

        let target = match interrupted {
            Phase::Generating | Phase::Finalizing => {
                self.progress = PROGRESS_DONE;
                Phase::Ready
            }
            Phase::Refining => {
                self.script.record_failure("interrupted");
                self.resume
            }
            _ => self.resume,
        };

        if interrupted != Phase::Error && self.transition(Phase::Error).is_err() {
            return;
        }
        if let Err(err) = self.transition(target) {
            tracing::error!("Recovery failed: {}", err);
        }
    }

    /// Current artifact
    #[inline]
    #[must_use]
    pub fn current_artifact(&self) -> &ScriptArtifact {
        self.script.target()
    }

    #[inline]
    #[must_use]
    pub fn current_progress(&self) -> u8 {
        self.progress
    }

    /// Validation of the latest finalized or refined body
    #[inline]
    #[must_use]
    pub fn current_validation(&self) -> &ValidationReport {
        &self.validation
    }

    #[inline]
    #[must_use]
    pub fn script_log(&self) -> &CorrectionLog {
        self.script.log()
    }

    #[inline]
    #[must_use]
    pub fn source_log(&self) -> &CorrectionLog {
        self.source.log()
    }

    #[inline]
    #[must_use]
    pub fn source_text(&self) -> &str {
        self.source.target().as_str()
    }

    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Tag derived when the script was last finalized
    #[inline]
    #[must_use]
    pub fn script_tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Every notice surfaced by this session, oldest first
    #[inline]
    #[must_use]
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// History record of the last successful save
    #[inline]
    #[must_use]
    pub fn last_record(&self) -> Option<RecordId> {
        self.last_record
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Watch phase, progress and artifact text without borrowing the session
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    /// Latest published snapshot
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.phase.is_stable() {
            Ok(())
        } else {
            Err(SessionError::Busy)
        }
    }

    /// Leave a stable phase, remembering where to come back to
    fn begin(&mut self, to: Phase) -> Result<Phase, SessionError> {
        let from = self.phase;
        self.transition(to)?;
        self.resume = from;
        Ok(from)
    }

    fn transition(&mut self, to: Phase) -> Result<(), SessionError> {
        validate_transition(self.phase, to)?;
        tracing::info!(from = ?self.phase, to = ?to, "phase change");
        self.phase = to;
        self.publish();
        Ok(())
    }

    fn publish(&self) {
        self.snapshots.send_replace(SessionSnapshot {
            phase: self.phase,
            progress: self.progress,
            artifact_text: self.script.target().text(),
        });
    }
}

impl std::fmt::Debug for GenerationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationSession")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("progress", &self.progress)
            .field("tag", &self.tag)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}
