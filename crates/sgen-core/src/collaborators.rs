//! External collaborator boundaries
//!
//! The session only talks to the outside world through these traits. Each
//! implementation owns its own transport, retries and serialization.

use crate::error::CollaboratorError;
use crate::types::{OwnerId, ScriptRecord};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use sgen_artifact::ScriptArtifact;

/// Ordered stream of text fragments; boundaries are arbitrary
pub type FragmentStream = BoxStream<'static, Result<String, CollaboratorError>>;

/// Produces a script as a stream of fragments
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Start generating from source text
    ///
    /// # Errors
    /// Fails if the stream could not be opened. Failures after the first
    /// fragment arrive as `Err` items on the stream.
    async fn generate(&self, source: &str) -> Result<FragmentStream, CollaboratorError>;
}

/// Rewrites a text according to a natural-language instruction
///
/// Returns the full replacement or an error, never a partial result.
#[async_trait]
pub trait Rewriter: Send + Sync {
    /// Rewrite `current` following `instruction`
    ///
    /// # Errors
    /// Any failure of the underlying capability
    async fn rewrite(&self, current: &str, instruction: &str) -> Result<String, CollaboratorError>;
}

/// Saves finished scripts for an owner
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist a finished script
    ///
    /// # Errors
    /// `CollaboratorError::Persistence` when the save did not happen
    async fn persist(
        &self,
        artifact: &ScriptArtifact,
        tag: &str,
        owner: &OwnerId,
    ) -> Result<ScriptRecord, CollaboratorError>;

    /// Records saved for `owner`, oldest first
    ///
    /// # Errors
    /// `CollaboratorError::Persistence` when the store cannot be read
    async fn list_for_owner(&self, owner: &OwnerId) -> Result<Vec<ScriptRecord>, CollaboratorError>;
}

/// Turns an uploaded document into source text
#[async_trait]
pub trait SourceExtractor: Send + Sync {
    /// Extract plain text from document bytes
    ///
    /// # Errors
    /// `CollaboratorError::Extraction` for unreadable documents
    async fn extract(&self, document: &[u8]) -> Result<String, CollaboratorError>;
}

/// Rewriter used when no capability has been configured
#[derive(Debug, Clone)]
pub struct UnconfiguredRewriter {
    capability: &'static str,
}

impl UnconfiguredRewriter {
    #[inline]
    #[must_use]
    pub fn new(capability: &'static str) -> Self {
        Self { capability }
    }
}

#[async_trait]
impl Rewriter for UnconfiguredRewriter {
    async fn rewrite(&self, _current: &str, _instruction: &str) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::Unavailable(self.capability.to_string()))
    }
}

/// Extractor used when no document reader has been configured
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredExtractor;

#[async_trait]
impl SourceExtractor for UnconfiguredExtractor {
    async fn extract(&self, _document: &[u8]) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::Unavailable("source extractor".to_string()))
    }
}

/// Replays a recorded generator output in fixed-size character chunks
///
/// Ignores the source text. Useful for reproducing a session offline.
#[derive(Debug, Clone)]
pub struct ReplayGenerator {
    recorded: String,
    chunk_chars: usize,
}

impl ReplayGenerator {
    /// Replay `recorded` in chunks of `chunk_chars` characters (minimum 1)
    #[must_use]
    pub fn new(recorded: impl Into<String>, chunk_chars: usize) -> Self {
        Self {
            recorded: recorded.into(),
            chunk_chars: chunk_chars.max(1),
        }
    }

    /// Split the recording into chunks on char boundaries
    #[must_use]
    pub fn chunks(&self) -> Vec<String> {
        let chars: Vec<char> = self.recorded.chars().collect();
        chars
            .chunks(self.chunk_chars)
            .map(|chunk| chunk.iter().collect())
            .collect()
    }
}

#[async_trait]
impl TextGenerator for ReplayGenerator {
    async fn generate(&self, _source: &str) -> Result<FragmentStream, CollaboratorError> {
        Ok(stream::iter(self.chunks().into_iter().map(Ok)).boxed())
    }
}
