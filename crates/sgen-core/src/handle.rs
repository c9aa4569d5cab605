//! Shareable session handle
//!
//! Wraps a [`GenerationSession`] in `Arc<tokio::sync::Mutex<_>>`. Mutators
//! never queue behind each other: if an operation is already running they
//! return [`SessionError::Busy`] immediately. Observers watch snapshots
//! instead of taking the lock.
//!
//! A mutator future dropped mid-flight releases the lock but leaves the
//! session in a transient phase. Whoever takes the lock next finds nothing in
//! flight, so claiming the session recovers it first.

use crate::error::SessionError;
use crate::session::GenerationSession;
use crate::types::{GenerationReport, RoundOutcome, SessionSnapshot};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, MutexGuard};

/// Cloneable handle to one session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<GenerationSession>>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    #[must_use]
    pub fn new(session: GenerationSession) -> Self {
        let snapshots = session.subscribe();
        Self {
            inner: Arc::new(Mutex::new(session)),
            snapshots,
        }
    }

    fn claim(&self) -> Result<MutexGuard<'_, GenerationSession>, SessionError> {
        let mut session = self.inner.try_lock().map_err(|_| SessionError::Busy)?;
        if !session.phase().is_stable() {
            session.recover();
        }
        Ok(session)
    }

    /// See [`GenerationSession::recover`]
    ///
    /// Waits for any running operation to finish first, so this only ever
    /// acts on an operation that was abandoned.
    pub async fn recover(&self) {
        self.inner.lock().await.recover();
    }

    /// See [`GenerationSession::start_generation`]
    ///
    /// # Errors
    /// `SessionError::Busy` while another operation holds the session, plus
    /// everything the session itself rejects
    pub async fn start_generation(&self, source: &str) -> Result<GenerationReport, SessionError> {
        let mut session = self.claim()?;
        session.start_generation(source).await
    }

    /// See [`GenerationSession::refine`]
    ///
    /// # Errors
    /// `SessionError::Busy` while another operation holds the session, plus
    /// everything the session itself rejects
    pub async fn refine(&self, instruction: &str) -> Result<RoundOutcome, SessionError> {
        let mut session = self.claim()?;
        session.refine(instruction).await
    }

    /// See [`GenerationSession::refine_source`]
    ///
    /// # Errors
    /// `SessionError::Busy` while another operation holds the session, plus
    /// everything the session itself rejects
    pub async fn refine_source(&self, instruction: &str) -> Result<RoundOutcome, SessionError> {
        let mut session = self.claim()?;
        session.refine_source(instruction).await
    }

    /// See [`GenerationSession::extract_source`]
    ///
    /// # Errors
    /// `SessionError::Busy` while another operation holds the session, plus
    /// everything the session itself rejects
    pub async fn extract_source(&self, document: &[u8]) -> Result<(), SessionError> {
        let mut session = self.claim()?;
        session.extract_source(document).await
    }

    /// Read the session, waiting for any running operation to finish
    pub async fn read<R>(&self, f: impl FnOnce(&GenerationSession) -> R) -> R {
        let session = self.inner.lock().await;
        f(&session)
    }

    /// Latest snapshot, without waiting
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }
}

impl From<GenerationSession> for SessionHandle {
    fn from(session: GenerationSession) -> Self {
        Self::new(session)
    }
}
