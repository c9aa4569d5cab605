//! Testing utilities for SGEN workspace
//!
//! Hand-written collaborator fakes and session fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use sgen_artifact::ScriptArtifact;
use sgen_core::{
    CollaboratorError, FragmentStream, GenerationSession, HistoryStore, OwnerId, Rewriter,
    ScriptRecord, SessionBuilder, SourceExtractor, TextGenerator,
};
use std::sync::Arc;
use tokio::sync::Notify;

/// Streams a fixed list of fragments, optionally failing part way through
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    fragments: Vec<String>,
    failure: Option<(usize, String)>,
    sources: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            failure: None,
            sources: Mutex::new(Vec::new()),
        }
    }

    /// Yield an error after `delivered` fragments instead of the rest
    #[must_use]
    pub fn failing_after(mut self, delivered: usize, reason: impl Into<String>) -> Self {
        self.failure = Some((delivered, reason.into()));
        self
    }

    /// Source texts this generator was called with
    pub fn sources(&self) -> Vec<String> {
        self.sources.lock().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, source: &str) -> Result<FragmentStream, CollaboratorError> {
        self.sources.lock().push(source.to_string());

        let delivered = self
            .failure
            .as_ref()
            .map_or(self.fragments.len(), |(delivered, _)| *delivered);
        let mut items: Vec<Result<String, CollaboratorError>> =
            self.fragments.iter().take(delivered).cloned().map(Ok).collect();
        if let Some((_, reason)) = &self.failure {
            items.push(Err(CollaboratorError::Stream(reason.clone())));
        }
        Ok(stream::iter(items).boxed())
    }
}

/// Refuses to open a stream
#[derive(Debug, Clone)]
pub struct FailingGenerator(pub String);

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _source: &str) -> Result<FragmentStream, CollaboratorError> {
        Err(CollaboratorError::Generator(self.0.clone()))
    }
}

/// Always rewrites to the same reply and records its calls
#[derive(Debug, Default)]
pub struct FixedRewriter {
    reply: String,
    calls: Mutex<Vec<(String, String)>>,
}

impl FixedRewriter {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(current, instruction)` pairs received so far
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Rewriter for FixedRewriter {
    async fn rewrite(&self, current: &str, instruction: &str) -> Result<String, CollaboratorError> {
        self.calls
            .lock()
            .push((current.to_string(), instruction.to_string()));
        Ok(self.reply.clone())
    }
}

/// Always fails with `CollaboratorError::Rewrite`
#[derive(Debug, Clone)]
pub struct FailingRewriter(pub String);

#[async_trait]
impl Rewriter for FailingRewriter {
    async fn rewrite(&self, _current: &str, _instruction: &str) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::Rewrite(self.0.clone()))
    }
}

/// Holds every rewrite until released
///
/// `started` is notified when a rewrite begins; the rewrite then waits for
/// `release` before returning its reply.
#[derive(Debug, Default)]
pub struct GatedRewriter {
    reply: String,
    pub started: Notify,
    pub release: Notify,
}

impl GatedRewriter {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            started: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl Rewriter for GatedRewriter {
    async fn rewrite(&self, _current: &str, _instruction: &str) -> Result<String, CollaboratorError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(self.reply.clone())
    }
}

/// History store kept in memory
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    records: Mutex<Vec<ScriptRecord>>,
    failure: Mutex<Option<String>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects every save with `reason`
    pub fn failing(reason: impl Into<String>) -> Self {
        let history = Self::default();
        *history.failure.lock() = Some(reason.into());
        history
    }

    pub fn records(&self) -> Vec<ScriptRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn persist(
        &self,
        artifact: &ScriptArtifact,
        tag: &str,
        owner: &OwnerId,
    ) -> Result<ScriptRecord, CollaboratorError> {
        let failure = self.failure.lock().clone();
        if let Some(reason) = failure {
            return Err(CollaboratorError::Persistence(reason));
        }
        let record = ScriptRecord::new(artifact, tag, owner.clone());
        self.records.lock().push(record.clone());
        Ok(record)
    }

    async fn list_for_owner(&self, owner: &OwnerId) -> Result<Vec<ScriptRecord>, CollaboratorError> {
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|record| &record.owner == owner)
            .cloned()
            .collect())
    }
}

/// Extractor returning a canned result
#[derive(Debug, Clone)]
pub struct StaticExtractor(pub Result<String, String>);

#[async_trait]
impl SourceExtractor for StaticExtractor {
    async fn extract(&self, _document: &[u8]) -> Result<String, CollaboratorError> {
        self.0.clone().map_err(CollaboratorError::Extraction)
    }
}

/// Builder around a generator that streams `fragments`
pub fn scripted_builder<I, S>(fragments: I) -> SessionBuilder
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    GenerationSession::builder(Arc::new(ScriptedGenerator::new(fragments)))
}

/// Session streaming `fragments` with the given script rewriter
pub fn session_with_rewriter<I, S>(fragments: I, rewriter: Arc<dyn Rewriter>) -> GenerationSession
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    scripted_builder(fragments)
        .with_script_rewriter(rewriter)
        .build()
}
