//! Public control surface over the scheduler.
//!
//! `UploadController` is the one entry type: construct it with the chunk
//! sequence, a transport, and options, then drive it with `start`,
//! `pause`, `resume`, and `cancel`. All outcomes are observed through
//! the configured callbacks; operations invalid for the current phase
//! are no-ops.

use std::sync::Arc;

use tracing::info;

use chunklift_session::{ProgressUpdate, SessionPhase};

use crate::scheduler::{Scheduler, SessionOptions};
use crate::transport::{CancellationClassifier, ChunkTransport, DowncastClassifier};

/// Drives one upload session over a fixed chunk sequence.
///
/// Methods spawn settlement watchers on the ambient Tokio runtime, so
/// the controller must be used from within one.
pub struct UploadController<C> {
    scheduler: Arc<Scheduler<C>>,
}

impl<C: Send + Sync + 'static> UploadController<C> {
    /// Creates a session over `chunks` with the default cancellation
    /// classifier (recognizes [`ChunkCancelled`](crate::ChunkCancelled)).
    pub fn new(
        chunks: Vec<C>,
        transport: Arc<dyn ChunkTransport<C>>,
        options: SessionOptions,
    ) -> Self {
        Self::with_classifier(chunks, transport, Arc::new(DowncastClassifier), options)
    }

    /// Creates a session with an explicit cancellation classifier.
    pub fn with_classifier(
        chunks: Vec<C>,
        transport: Arc<dyn ChunkTransport<C>>,
        classifier: Arc<dyn CancellationClassifier>,
        options: SessionOptions,
    ) -> Self {
        Self {
            scheduler: Arc::new(Scheduler::new(chunks, transport, classifier, options)),
        }
    }

    /// Begins the session. Valid from Idle; otherwise a no-op.
    pub fn start(&self) {
        {
            let mut state = self.scheduler.lock();
            if state.session.phase() != SessionPhase::Idle {
                return;
            }
            state.session.set_phase(SessionPhase::Running);
            info!(
                total = state.session.total(),
                max_concurrency = state.session.max_concurrency(),
                "upload session started"
            );
        }
        self.scheduler.admit_ready();
    }

    /// Pauses admission. Valid from Running; otherwise a no-op.
    ///
    /// In-flight chunks are left to settle — their settlements still
    /// update completion and retry state, but no new chunk is admitted
    /// until [`resume`](Self::resume).
    pub fn pause(&self) {
        let mut state = self.scheduler.lock();
        if state.session.phase() != SessionPhase::Running {
            return;
        }
        state.session.set_phase(SessionPhase::Paused);
        info!(in_flight = state.session.active(), "upload session paused");
    }

    /// Resumes admission. Valid from Paused; otherwise a no-op.
    pub fn resume(&self) {
        {
            let mut state = self.scheduler.lock();
            if state.session.phase() != SessionPhase::Paused {
                return;
            }
            state.session.set_phase(SessionPhase::Running);
            info!("upload session resumed");
        }
        self.scheduler.admit_ready();
    }

    /// Cancels the session. Valid from Running or Paused; otherwise a
    /// no-op.
    ///
    /// Fires every in-flight chunk's cancel handle exactly once. No
    /// callback of any kind fires afterward, however the outstanding
    /// transport calls eventually settle.
    pub fn cancel(&self) {
        let handles = {
            let mut state = self.scheduler.lock();
            if !matches!(
                state.session.phase(),
                SessionPhase::Running | SessionPhase::Paused
            ) {
                return;
            }
            state.session.set_phase(SessionPhase::Canceled);
            state.tasks.take_cancels()
        };
        info!(in_flight = handles.len(), "upload session canceled");
        self.scheduler.fire_cancels(handles);
    }

    /// Current session phase.
    pub fn phase(&self) -> SessionPhase {
        self.scheduler.lock().session.phase()
    }

    /// Current aggregate progress snapshot.
    pub fn progress(&self) -> ProgressUpdate {
        self.scheduler.lock().progress()
    }
}
