//! Functional tests for the two refinement loops and session sharing.
//!
//! - A failed rewrite never corrupts the artifact and always leaves a log entry
//! - The source loop stores rewrites verbatim and never touches the phase
//! - A shared session rejects a second operation while one is in flight
//! - A session whose operation was dropped mid-flight can be recovered, also
//!   through a shared handle

use futures::stream::{self, StreamExt};
use pretty_assertions::assert_eq;
use sgen_artifact::Role;
use sgen_core::{
    CollaboratorError, FragmentStream, GenerationSession, Phase, RoundOutcome, SessionError,
    SessionHandle, TextGenerator,
};
use sgen_test_utils::{
    scripted_builder, session_with_rewriter, FailingRewriter, FixedRewriter, GatedRewriter,
    StaticExtractor,
};
use std::sync::Arc;
use std::time::Duration;

/// Tenet: a failed rewrite leaves the artifact byte-for-byte identical and
/// appends exactly one failure entry after the instruction.
#[tokio::test]
async fn failed_rewrite_does_not_corrupt_artifact() {
    let mut session = session_with_rewriter(
        ["INSERT INTO t VALUES (1, 'a'), (2, 'b'"],
        Arc::new(FailingRewriter("timeout".into())),
    );
    session.start_generation("notes").await.unwrap();
    let before = session.current_artifact().clone();
    let validation_before = session.current_validation().clone();

    let outcome = session.refine("add a third row").await.unwrap();

    assert_eq!(
        outcome,
        RoundOutcome::Rejected {
            reason: "rewrite failed: timeout".into()
        }
    );
    assert_eq!(session.current_artifact(), &before);
    assert_eq!(session.current_validation(), &validation_before);
    assert_eq!(session.phase(), Phase::Ready);

    let log = session.script_log().to_sequence();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].role(), Role::User);
    assert_eq!(log[0].content(), "add a third row");
    assert_eq!(log[1].role(), Role::System);
    assert_eq!(log[1].content(), "Correction failed: rewrite failed: timeout");
}

/// Tenet: without a configured rewriter refinement fails like any other
/// rewrite failure.
#[tokio::test]
async fn unconfigured_rewriter_is_logged() {
    let mut session = scripted_builder(["SELECT 1"]).build();
    session.start_generation("notes").await.unwrap();

    session.refine("anything").await.unwrap();

    assert_eq!(
        session.script_log().last().map(|entry| entry.content().to_string()),
        Some("Correction failed: script rewriter is not configured".to_string())
    );
}

/// Tenet: rewrites go through fence stripping and auto-correction, and are
/// re-validated.
#[tokio::test]
async fn rewrite_output_is_corrected_and_validated() {
    let mut session = session_with_rewriter(
        ["SELECT 1"],
        Arc::new(FixedRewriter::new("```sql\nINSERT INTO t VALUES ('x), (2,\n```")),
    );
    session.start_generation("notes").await.unwrap();
    assert!(session.current_validation().is_clean());

    session.refine("break it").await.unwrap();

    assert_eq!(session.current_artifact().body(), "INSERT INTO t VALUES ('x), (2);\n");
    assert_eq!(
        session.current_validation().messages(),
        vec!["Possibly unterminated string literal on line 1".to_string()]
    );
}

/// Tenet: repeated rounds keep every exchange in order, even identical ones.
#[tokio::test]
async fn rounds_accumulate_in_order() {
    let mut session = session_with_rewriter(["SELECT 1"], Arc::new(FixedRewriter::new("SELECT 2;")));
    session.start_generation("notes").await.unwrap();

    session.refine("again").await.unwrap();
    session.refine("again").await.unwrap();

    let contents: Vec<_> = session
        .script_log()
        .iter()
        .map(|entry| entry.content().to_string())
        .collect();
    assert_eq!(contents, vec!["again", "Script updated.", "again", "Script updated."]);
}

/// Tenet: the source loop stores the rewrite as-is, logs to its own log, and
/// works in any stable phase without changing it.
#[tokio::test]
async fn source_refinement_is_verbatim_and_phase_neutral() {
    let source_rewriter = Arc::new(FixedRewriter::new("  Photosynthesis, shortened.\n"));
    let mut session = scripted_builder(["SELECT 1"])
        .with_source_rewriter(source_rewriter.clone())
        .build();
    session.set_source_text("Photosynthesis converts light into energy.").unwrap();

    let outcome = session.refine_source("shorten it").await.unwrap();

    assert!(outcome.is_applied());
    assert_eq!(session.phase(), Phase::Idle);
    assert_eq!(session.source_text(), "  Photosynthesis, shortened.\n");
    assert!(session.script_log().is_empty());
    assert_eq!(
        session
            .source_log()
            .iter()
            .map(|entry| (entry.role(), entry.content().to_string()))
            .collect::<Vec<_>>(),
        vec![
            (Role::User, "shorten it".to_string()),
            (Role::System, "Source text updated.".to_string()),
        ]
    );
    assert_eq!(
        source_rewriter.calls(),
        vec![(
            "Photosynthesis converts light into energy.".to_string(),
            "shorten it".to_string()
        )]
    );
}

/// Tenet: a failed source rewrite behaves like a failed script rewrite.
#[tokio::test]
async fn failed_source_rewrite_keeps_text() {
    let mut session = scripted_builder(["SELECT 1"])
        .with_source_rewriter(Arc::new(FailingRewriter("rate limited".into())))
        .build();
    session.start_generation("Cell biology").await.unwrap();

    let outcome = session.refine_source("expand").await.unwrap();

    assert!(!outcome.is_applied());
    assert_eq!(session.source_text(), "Cell biology");
    assert_eq!(session.phase(), Phase::Ready);
    assert_eq!(
        session.source_log().last().map(|entry| entry.content().to_string()),
        Some("Correction failed: rewrite failed: rate limited".to_string())
    );
    assert_eq!(
        session.refine_source("").await,
        Err(SessionError::EmptyInstruction)
    );
    assert_eq!(session.source_log().len(), 2);
}

/// Tenet: extraction replaces the source text and returns to the phase it
/// started from; failures are both an error and a notice.
#[tokio::test]
async fn extraction_round_trip() {
    let mut session = scripted_builder(["SELECT 1"])
        .with_extractor(Arc::new(StaticExtractor(Ok("Cell biology notes".into()))))
        .build();

    session.extract_source(b"%PDF-1.7").await.unwrap();
    assert_eq!(session.source_text(), "Cell biology notes");
    assert_eq!(session.phase(), Phase::Idle);

    let source = session.source_text().to_string();
    session.start_generation(&source).await.unwrap();
    session.extract_source(b"%PDF-1.7").await.unwrap();
    assert_eq!(session.phase(), Phase::Ready);

    let mut failing = scripted_builder(["SELECT 1"])
        .with_extractor(Arc::new(StaticExtractor(Err("scanned image".into()))))
        .build();
    let err = failing.extract_source(b"\x89PNG").await.unwrap_err();
    assert_eq!(
        err,
        SessionError::Extraction(CollaboratorError::Extraction("scanned image".into()))
    );
    assert!(err.is_retryable());
    assert_eq!(failing.phase(), Phase::Idle);
    assert_eq!(failing.notices().len(), 1);
    assert_eq!(
        failing.notices()[0].to_string(),
        "Could not read the source document: extraction failed: scanned image"
    );
}

/// Tenet: at most one operation is in flight per shared session; a second
/// one is rejected instead of queued.
#[tokio::test]
async fn second_refinement_is_busy() {
    let gate = Arc::new(GatedRewriter::new("SELECT 2;"));
    let handle = SessionHandle::new(session_with_rewriter(["SELECT 1"], gate.clone()));
    handle.start_generation("notes").await.unwrap();

    let first = tokio::spawn({
        let handle = handle.clone();
        async move { handle.refine("first").await }
    });
    gate.started.notified().await;

    assert_eq!(handle.refine("second").await, Err(SessionError::Busy));
    assert_eq!(handle.refine_source("second").await, Err(SessionError::Busy));
    assert_eq!(handle.snapshot().phase, Phase::Refining);

    gate.release.notify_one();
    assert_eq!(first.await.unwrap(), Ok(RoundOutcome::Applied));

    let (body, log_len) = handle
        .read(|s| (s.current_artifact().body().to_string(), s.script_log().len()))
        .await;
    assert_eq!(body, "SELECT 2;\n");
    assert_eq!(log_len, 2);
    assert_eq!(handle.snapshot().phase, Phase::Ready);
}

/// Tenet: dropping a refinement mid-flight leaves the session busy until it
/// is recovered; recovery logs the interrupted round and keeps the artifact.
#[tokio::test]
async fn interrupted_refinement_is_recoverable() {
    let gate = Arc::new(GatedRewriter::new("SELECT 2;"));
    let mut session = session_with_rewriter(["SELECT 1"], gate.clone());
    session.start_generation("notes").await.unwrap();

    let timed_out = tokio::time::timeout(Duration::from_millis(20), session.refine("slow")).await;
    assert!(timed_out.is_err());
    assert_eq!(session.phase(), Phase::Refining);
    assert_eq!(session.refine("again").await, Err(SessionError::Busy));

    session.recover();

    assert_eq!(session.phase(), Phase::Ready);
    assert_eq!(session.current_artifact().body(), "SELECT 1;\n");
    assert_eq!(
        session.script_log().last().map(|entry| entry.content().to_string()),
        Some("Correction failed: interrupted".to_string())
    );
}

/// Streams one fragment, then never finishes
struct StallingGenerator;

#[async_trait::async_trait]
impl TextGenerator for StallingGenerator {
    async fn generate(&self, _source: &str) -> Result<FragmentStream, CollaboratorError> {
        Ok(stream::iter([Ok("SELECT 1".to_string())])
            .chain(stream::pending())
            .boxed())
    }
}

/// Tenet: an interrupted generation recovers like a failed stream: partial
/// body kept, progress at 100, session `Ready`.
#[tokio::test]
async fn interrupted_generation_is_recoverable() {
    let mut session = GenerationSession::builder(Arc::new(StallingGenerator)).build();

    let timed_out =
        tokio::time::timeout(Duration::from_millis(20), session.start_generation("notes")).await;
    assert!(timed_out.is_err());
    assert_eq!(session.phase(), Phase::Generating);
    assert!(session.current_progress() < 100);

    session.recover();

    assert_eq!(session.phase(), Phase::Ready);
    assert_eq!(session.current_progress(), 100);
    assert_eq!(session.current_artifact().body(), "SELECT 1");
}

/// Tenet: a shared session whose operation was dropped mid-flight is not
/// stuck; the next operation through the handle recovers it and runs.
#[tokio::test]
async fn abandoned_handle_operation_does_not_leave_session_busy() {
    let gate = Arc::new(GatedRewriter::new("SELECT 2;"));
    let handle = SessionHandle::new(session_with_rewriter(["SELECT 1"], gate.clone()));
    handle.start_generation("notes").await.unwrap();

    let timed_out = tokio::time::timeout(Duration::from_millis(20), handle.refine("slow")).await;
    assert!(timed_out.is_err());
    assert_eq!(handle.snapshot().phase, Phase::Refining);

    gate.release.notify_one();
    let outcome = handle.refine("later").await.unwrap();

    assert_eq!(outcome, RoundOutcome::Applied);
    assert_eq!(handle.snapshot().phase, Phase::Ready);
    let log: Vec<String> = handle
        .read(|s| s.script_log().iter().map(|entry| entry.content().to_string()).collect())
        .await;
    assert_eq!(
        log,
        vec![
            "slow".to_string(),
            "Correction failed: interrupted".to_string(),
            "later".to_string(),
            "Script updated.".to_string(),
        ]
    );
    assert_eq!(
        handle.read(|s| s.current_artifact().body().to_string()).await,
        "SELECT 2;\n"
    );
}

/// Tenet: an abandoned generation behind a handle can be recovered
/// explicitly, and a new generation is accepted afterwards.
#[tokio::test]
async fn handle_recovers_abandoned_generation() {
    let handle = SessionHandle::new(GenerationSession::builder(Arc::new(StallingGenerator)).build());

    let timed_out =
        tokio::time::timeout(Duration::from_millis(20), handle.start_generation("notes")).await;
    assert!(timed_out.is_err());
    assert_eq!(handle.snapshot().phase, Phase::Generating);

    handle.recover().await;

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.phase, Phase::Ready);
    assert_eq!(snapshot.progress, 100);
    assert_eq!(
        handle.read(|s| s.current_artifact().body().to_string()).await,
        "SELECT 1"
    );

    let again = tokio::time::timeout(Duration::from_millis(20), handle.start_generation("more")).await;
    assert!(again.is_err(), "a fresh run should be accepted and stall again");
    assert_eq!(handle.snapshot().phase, Phase::Generating);
}
