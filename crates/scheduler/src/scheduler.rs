//! The dispatch core: admission, settlement, retry, escalation.
//!
//! All session state lives behind one mutex. Admission and settlement
//! handlers lock it, decide what happened, collect the callbacks to
//! fire, release the lock, and only then dispatch — callbacks never run
//! under the lock, so a callback may safely re-enter the controller.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use chunklift_session::{
    FailureCallback, ProgressCallback, ProgressUpdate, SessionPhase, SessionState,
    SuccessCallback, TaskStore,
};

use crate::transport::{CancellationClassifier, ChunkTransport, TransportFailure};

/// Construction-time options for an upload session.
pub struct SessionOptions {
    /// Concurrency ceiling. Zero is treated as 1.
    pub max_concurrency: usize,
    /// Non-cancellation failures tolerated per chunk before the session
    /// fails.
    pub retry_budget: u32,
    /// Invoked with an aggregate snapshot after each completion and at
    /// success.
    pub on_progress: Option<ProgressCallback>,
    /// Invoked once, with the triggering error, if the session fails.
    pub on_fail: Option<FailureCallback>,
    /// Invoked once when every chunk has completed.
    pub on_succeed: Option<SuccessCallback>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            retry_budget: 3,
            on_progress: None,
            on_fail: None,
            on_succeed: None,
        }
    }
}

/// Mutable session state, guarded by the scheduler's mutex.
pub(crate) struct SchedState {
    pub(crate) session: SessionState,
    pub(crate) tasks: TaskStore,
}

impl SchedState {
    pub(crate) fn progress(&self) -> ProgressUpdate {
        ProgressUpdate::aggregate(
            self.session.completed(),
            self.session.total(),
            self.session.active(),
        )
    }
}

/// Callback decided under the lock, dispatched after releasing it.
enum Notification {
    Progress(ProgressUpdate),
    Succeeded,
    Failed(TransportFailure),
}

/// One step of the admission loop.
enum AdmitStep {
    /// A pending chunk claimed a slot; call the transport for it.
    Launch(usize),
    /// Every chunk is complete; the session just succeeded.
    Finish(ProgressUpdate),
    /// Slot-limited, queue-exhausted, or not running.
    Done,
}

pub(crate) struct Scheduler<C> {
    chunks: Vec<C>,
    transport: Arc<dyn ChunkTransport<C>>,
    classifier: Arc<dyn CancellationClassifier>,
    on_progress: Option<ProgressCallback>,
    on_fail: Option<FailureCallback>,
    on_succeed: Option<SuccessCallback>,
    inner: Mutex<SchedState>,
}

impl<C: Send + Sync + 'static> Scheduler<C> {
    pub(crate) fn new(
        chunks: Vec<C>,
        transport: Arc<dyn ChunkTransport<C>>,
        classifier: Arc<dyn CancellationClassifier>,
        options: SessionOptions,
    ) -> Self {
        let total = chunks.len();
        Self {
            chunks,
            transport,
            classifier,
            on_progress: options.on_progress,
            on_fail: options.on_fail,
            on_succeed: options.on_succeed,
            inner: Mutex::new(SchedState {
                session: SessionState::new(total, options.max_concurrency, options.retry_budget),
                tasks: TaskStore::new(total),
            }),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SchedState> {
        self.inner.lock().unwrap()
    }

    /// Admits pending chunks until the ceiling is reached or none
    /// remain, then performs the success transition once the session is
    /// drained.
    ///
    /// Batch loop rather than recursion: reaching the ceiling (or an
    /// empty queue) is the termination condition, so one call admits a
    /// whole batch.
    pub(crate) fn admit_ready(self: &Arc<Self>) {
        loop {
            let step = {
                let mut state = self.lock();
                if state.session.phase() != SessionPhase::Running {
                    AdmitStep::Done
                } else {
                    match state.tasks.next_pending() {
                        Some(index) if state.session.has_free_slot() => {
                            state.session.begin_flight();
                            state.tasks.mark_in_flight(index);
                            AdmitStep::Launch(index)
                        }
                        Some(_) => AdmitStep::Done,
                        None if state.session.active() == 0 && state.session.all_completed() => {
                            state.session.set_phase(SessionPhase::Succeeded);
                            AdmitStep::Finish(state.progress())
                        }
                        None => AdmitStep::Done,
                    }
                }
            };

            match step {
                AdmitStep::Launch(index) => self.launch(index),
                AdmitStep::Finish(update) => {
                    info!(total = update.total, "upload session succeeded");
                    self.dispatch(Notification::Progress(update));
                    self.dispatch(Notification::Succeeded);
                    return;
                }
                AdmitStep::Done => return,
            }
        }
    }

    /// Calls the transport for an already-claimed chunk and spawns its
    /// settlement watcher.
    fn launch(self: &Arc<Self>, index: usize) {
        debug!(index, "chunk admitted");
        let handle = self.transport.upload(index, &self.chunks[index]);
        let cancel = handle.cancel;
        let settlement = handle.settlement;

        {
            let mut state = self.lock();
            state.tasks.store_cancel(index, cancel.clone());
            if state.session.phase() == SessionPhase::Canceled {
                // cancel() raced this admission: the session-wide sweep
                // ran before the token existed, so fire it here.
                state.tasks.clear_cancel(index);
                drop(state);
                cancel.cancel();
            }
        }

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = settlement.await;
            scheduler.on_settled(index, outcome);
        });
    }

    /// Handles the settlement of chunk `index`, in whatever order
    /// settlements arrive.
    fn on_settled(self: &Arc<Self>, index: usize, outcome: Result<(), TransportFailure>) {
        let mut notes: Vec<Notification> = Vec::new();
        let mut readmit = false;

        {
            let mut state = self.lock();
            let phase = state.session.phase();

            match outcome {
                Ok(()) => {
                    state.tasks.mark_completed(index);
                    state.session.record_completion();
                    state.session.end_flight();
                    debug!(index, completed = state.session.completed(), "chunk completed");
                    if !phase.is_terminal() {
                        notes.push(Notification::Progress(state.progress()));
                        readmit = true;
                    }
                }
                Err(failure) if self.classifier.is_cancellation(&failure) => {
                    // A cancelled chunk is neither completed nor
                    // retried; just release its slot.
                    state.tasks.clear_cancel(index);
                    state.session.end_flight();
                    debug!(index, "chunk settled as cancelled");
                }
                Err(failure) => {
                    let budget = state.session.retry_budget();
                    let attempts_so_far =
                        state.tasks.get(index).map_or(budget, |t| t.retry_count());

                    if phase.is_terminal() {
                        // Late settlement: slot bookkeeping only.
                        state.tasks.clear_cancel(index);
                        state.session.end_flight();
                    } else if attempts_so_far < budget {
                        let retries = state.tasks.record_retry(index);
                        state.session.end_flight();
                        warn!(index, retries, error = %failure, "chunk failed, requeued");
                        readmit = true;
                    } else {
                        state.tasks.mark_failed(index);
                        state.session.end_flight();
                        state.session.set_phase(SessionPhase::Failed);
                        error!(index, error = %failure, "chunk failed permanently");
                        notes.push(Notification::Failed(failure));
                    }
                }
            }
        }

        for note in notes {
            self.dispatch(note);
        }
        if readmit {
            self.admit_ready();
        }
    }

    fn dispatch(&self, note: Notification) {
        match note {
            Notification::Progress(update) => {
                if let Some(cb) = &self.on_progress {
                    cb(update);
                }
            }
            Notification::Succeeded => {
                if let Some(cb) = &self.on_succeed {
                    cb();
                }
            }
            Notification::Failed(failure) => {
                if let Some(cb) = &self.on_fail {
                    cb(failure.as_ref());
                }
            }
        }
    }

    /// Fires every live cancel handle exactly once.
    pub(crate) fn fire_cancels(&self, handles: Vec<CancellationToken>) {
        for handle in handles {
            handle.cancel();
        }
    }
}
