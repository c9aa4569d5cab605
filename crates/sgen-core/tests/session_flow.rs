//! Functional tests for the generation lifecycle.
//!
//! These exercise a full session against scripted collaborators:
//! - streamed fragments become one corrected, validated, tagged script
//! - stream failures keep what arrived and still finish at 100
//! - finished scripts are saved for authenticated owners, and save failures
//!   never touch the artifact

use pretty_assertions::assert_eq;
use sgen_artifact::Role;
use sgen_core::{
    GenerationSession, Notice, OwnerId, Phase, RoundOutcome, SessionConfig, SessionError,
    TextGenerator,
};
use sgen_test_utils::{
    scripted_builder, session_with_rewriter, FailingGenerator, FixedRewriter, InMemoryHistory,
    ScriptedGenerator,
};
use std::sync::Arc;

const TAGGED_SCRIPT: &str = "```sql\n\
INSERT INTO quizzes (temp_id, title) VALUES ('QZ1', 'Fractions');\n\
INSERT INTO questions (temp_id, quiz_id, body) VALUES ('Q1', 'QZ1', 'What is 1/2 + 1/4?'),\n\
;\n\
```";

fn entries(log: &sgen_artifact::CorrectionLog) -> Vec<(Role, String)> {
    log.iter()
        .map(|entry| (entry.role(), entry.content().to_string()))
        .collect()
}

/// Tenet: two fragments that only form a statement together end up as one
/// well-terminated statement, and a later refinement replaces it wholesale.
#[tokio::test]
async fn generate_then_refine_end_to_end() {
    let rewriter = Arc::new(FixedRewriter::new("INSERT INTO t VALUES (1,'b');"));
    let mut session = session_with_rewriter(
        ["INSERT INTO t VALUES (1,'a'", ");"],
        rewriter.clone(),
    );

    let report = session.start_generation("One row please").await.unwrap();

    assert!(report.completed);
    assert!(report.validation.is_clean());
    assert!(report.notices.is_empty());
    assert_eq!(session.current_artifact().body(), "INSERT INTO t VALUES (1,'a');\n");
    assert_eq!(session.phase(), Phase::Ready);
    assert_eq!(session.current_progress(), 100);

    let outcome = session.refine("fix the value").await.unwrap();

    assert_eq!(outcome, RoundOutcome::Applied);
    assert_eq!(session.current_artifact().body(), "INSERT INTO t VALUES (1,'b');\n");
    assert!(session.current_validation().is_clean());
    assert_eq!(
        entries(session.script_log()),
        vec![
            (Role::User, "fix the value".to_string()),
            (Role::System, "Script updated.".to_string()),
        ]
    );
    assert_eq!(
        rewriter.calls(),
        vec![(
            "INSERT INTO t VALUES (1,'a');\n".to_string(),
            "fix the value".to_string()
        )]
    );
}

/// Tenet: the header is always shown in front of the body, and never edited.
#[tokio::test]
async fn artifact_text_is_header_plus_body() {
    let config = SessionConfig::new().with_header("-- quiz 7");
    let mut session = scripted_builder(["SELECT 1"]).with_config(config).build();

    session.start_generation("notes").await.unwrap();

    assert_eq!(session.current_artifact().text(), "-- quiz 7\n\nSELECT 1;\n");
    assert_eq!(session.snapshot().artifact_text, "-- quiz 7\n\nSELECT 1;\n");
}

/// Tenet: a stream that breaks off keeps the last streamed state, reports the
/// failure as a notice, and still ends at 100 in `Ready`.
#[tokio::test]
async fn stream_failure_keeps_partial_script() {
    let generator = ScriptedGenerator::new(["INSERT INTO t", " VALUES (1"])
        .failing_after(1, "connection reset");
    let mut session = GenerationSession::builder(Arc::new(generator)).build();

    let report = session.start_generation("notes").await.unwrap();

    assert!(!report.completed);
    assert_eq!(report.tag, None);
    assert_eq!(
        report.notices,
        vec![Notice::StreamFailed {
            reason: "stream interrupted: connection reset".into()
        }]
    );
    assert_eq!(session.current_artifact().body(), "INSERT INTO t");
    assert_eq!(session.current_progress(), 100);
    assert_eq!(session.phase(), Phase::Ready);
    assert!(session.script_log().is_empty());
    assert!(session.source_log().is_empty());
}

/// Tenet: a generator that refuses to start is a notice, not an error.
#[tokio::test]
async fn generator_refusal_is_surfaced() {
    let mut session =
        GenerationSession::builder(Arc::new(FailingGenerator("quota exceeded".into()))).build();

    let report = session.start_generation("notes").await.unwrap();

    assert!(!report.completed);
    assert_eq!(
        session.notices(),
        &[Notice::StreamFailed {
            reason: "generator failed: quota exceeded".into()
        }]
    );
    assert!(session.current_artifact().is_empty());
    assert_eq!(session.current_progress(), 100);
}

/// Tenet: finished scripts are saved once, under the tag of their first
/// tagged insert.
#[tokio::test]
async fn owner_gets_one_record_with_derived_tag() {
    let history = Arc::new(InMemoryHistory::new());
    let owner = OwnerId::new("instructor-42");
    let chunks: Vec<String> = TAGGED_SCRIPT
        .as_bytes()
        .chunks(16)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect();
    let mut session = scripted_builder(chunks)
        .with_history(history.clone())
        .with_owner(owner.clone())
        .build();

    let report = session.start_generation("Fractions chapter").await.unwrap();

    assert_eq!(report.tag.as_deref(), Some("QZ1"));
    assert_eq!(session.script_tag(), Some("QZ1"));
    let records = history.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].tag, "QZ1");
    assert_eq!(records[0].owner, owner);
    assert_eq!(records[0].text, session.current_artifact().text());
    assert_eq!(records[0].checksum, session.current_artifact().checksum());
    assert_eq!(session.last_record(), Some(records[0].id));
    assert_eq!(report.record, Some(records[0].id));
    assert_eq!(
        session.current_artifact().body(),
        "INSERT INTO quizzes (temp_id, title) VALUES ('QZ1', 'Fractions');\n\n\
         INSERT INTO questions (temp_id, quiz_id, body) VALUES ('Q1', 'QZ1', 'What is 1/2 + 1/4?');\n"
    );
}

/// Tenet: a failed save is a notice; the artifact and phase are unaffected.
#[tokio::test]
async fn persist_failure_keeps_artifact() {
    let history = Arc::new(InMemoryHistory::failing("disk full"));
    let mut session = scripted_builder(["SELECT 1"])
        .with_history(history.clone())
        .with_owner(OwnerId::new("instructor-42"))
        .build();

    let report = session.start_generation("notes").await.unwrap();

    assert!(report.completed);
    assert_eq!(
        report.notices,
        vec![Notice::PersistFailed {
            reason: "persistence failed: disk full".into()
        }]
    );
    assert_eq!(session.current_artifact().body(), "SELECT 1;\n");
    assert_eq!(session.phase(), Phase::Ready);
    assert_eq!(session.last_record(), None);
    assert!(history.records().is_empty());
}

/// Tenet: without an owner nothing is saved.
#[tokio::test]
async fn anonymous_sessions_are_not_saved() {
    let history = Arc::new(InMemoryHistory::new());
    let mut session = scripted_builder(["SELECT 1"])
        .with_history(history.clone())
        .build();

    let report = session.start_generation("notes").await.unwrap();

    assert_eq!(report.record, None);
    assert!(history.records().is_empty());
}

/// Tenet: regenerating starts from a clean slate: empty script log, fresh
/// source text, and a new stream.
#[tokio::test]
async fn regeneration_resets_script_log() {
    let generator = Arc::new(ScriptedGenerator::new(["SELECT 1"]));
    let mut session = GenerationSession::builder(generator.clone() as Arc<dyn TextGenerator>)
        .with_script_rewriter(Arc::new(FixedRewriter::new("SELECT 2")))
        .build();

    session.start_generation("first").await.unwrap();
    session.refine("use two").await.unwrap();
    assert_eq!(session.script_log().len(), 2);

    session.start_generation("second").await.unwrap();

    assert!(session.script_log().is_empty());
    assert_eq!(session.source_text(), "second");
    assert_eq!(session.current_artifact().body(), "SELECT 1;\n");
    assert_eq!(generator.sources(), vec!["first".to_string(), "second".to_string()]);
}

/// Tenet: rejected operations change nothing.
#[tokio::test]
async fn rejections_leave_no_trace() {
    let mut session = scripted_builder(["SELECT 1"]).build();

    assert_eq!(session.start_generation(" \n\t").await, Err(SessionError::EmptySource));
    assert_eq!(
        session.refine("fix").await,
        Err(SessionError::NotReady { phase: Phase::Idle })
    );
    assert_eq!(session.phase(), Phase::Idle);
    assert_eq!(session.current_progress(), 0);
    assert!(session.script_log().is_empty());

    session.start_generation("notes").await.unwrap();
    assert_eq!(session.refine("   ").await, Err(SessionError::EmptyInstruction));
    assert!(session.script_log().is_empty());
    assert_eq!(session.phase(), Phase::Ready);
}

/// Tenet: validation findings are advisory; the script is still finalized.
#[tokio::test]
async fn defects_are_reported_not_fixed() {
    let mut session = scripted_builder([
        "INSERT INTO questions (topic_id) VALUES ((SELECT id FROM topics WHERE code = 'T1'));\n",
        "INSERT INTO t VALUES ('it''s', 'open);\n",
    ])
    .build();

    let report = session.start_generation("notes").await.unwrap();

    assert_eq!(
        report.validation.messages(),
        vec![
            "Deprecated code-based lookup on line 1: use the temp_id column instead".to_string(),
            "Possibly unterminated string literal on line 3".to_string(),
        ]
    );
    assert_eq!(session.phase(), Phase::Ready);
}
