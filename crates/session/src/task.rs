//! Per-chunk task records.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Lifecycle of a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for a free slot.
    Pending,
    /// A transport call for this index is outstanding.
    InFlight,
    /// The transport call resolved successfully.
    Completed,
    /// Exhausted its retry budget; the session is failing.
    Failed,
}

/// State of one chunk index.
///
/// Owned exclusively by [`TaskStore`]; the scheduler mutates it through
/// the store's transition methods only.
#[derive(Debug)]
pub struct ChunkTask {
    index: usize,
    status: TaskStatus,
    retry_count: u32,
    cancel: Option<CancellationToken>,
}

impl ChunkTask {
    fn new(index: usize) -> Self {
        Self {
            index,
            status: TaskStatus::Pending,
            retry_count: 0,
            cancel: None,
        }
    }

    /// Immutable position in the original chunk sequence.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Non-cancellation failures recorded against this chunk so far.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Whether a cancel capability is currently held for this chunk.
    pub fn has_cancel(&self) -> bool {
        self.cancel.is_some()
    }
}

/// Arena of chunk tasks, indexed by chunk position.
///
/// Each record is freshly constructed for its index — no two slots share
/// state, and the store never clones one record into another.
#[derive(Debug)]
pub struct TaskStore {
    tasks: Vec<ChunkTask>,
}

impl TaskStore {
    pub fn new(total: usize) -> Self {
        Self {
            tasks: (0..total).map(ChunkTask::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ChunkTask> {
        self.tasks.get(index)
    }

    /// Lowest-index pending task, if any.
    ///
    /// A retried chunk re-enters contention at its original index, so
    /// admission order always follows the original sequence.
    pub fn next_pending(&self) -> Option<usize> {
        self.tasks
            .iter()
            .find(|t| t.status == TaskStatus::Pending)
            .map(|t| t.index)
    }

    /// Promotes a pending task to in-flight.
    ///
    /// The cancel capability is stored separately via
    /// [`store_cancel`](Self::store_cancel) once the transport returns it.
    pub fn mark_in_flight(&mut self, index: usize) {
        let task = &mut self.tasks[index];
        debug_assert_eq!(task.status, TaskStatus::Pending);
        task.status = TaskStatus::InFlight;
    }

    /// Attaches the transport's cancel capability to an in-flight task.
    pub fn store_cancel(&mut self, index: usize, cancel: CancellationToken) {
        let task = &mut self.tasks[index];
        debug_assert_eq!(task.status, TaskStatus::InFlight);
        debug_assert!(task.cancel.is_none());
        task.cancel = Some(cancel);
    }

    /// Drops the cancel capability without changing status or retries.
    pub fn clear_cancel(&mut self, index: usize) {
        self.tasks[index].cancel = None;
    }

    /// Marks a settled task completed and releases its cancel capability.
    pub fn mark_completed(&mut self, index: usize) {
        let task = &mut self.tasks[index];
        task.status = TaskStatus::Completed;
        task.cancel = None;
    }

    /// Records one failed attempt and requeues the task for re-admission.
    ///
    /// Returns the new retry count.
    pub fn record_retry(&mut self, index: usize) -> u32 {
        let task = &mut self.tasks[index];
        debug_assert_eq!(task.status, TaskStatus::InFlight);
        task.retry_count += 1;
        task.status = TaskStatus::Pending;
        task.cancel = None;
        task.retry_count
    }

    /// Marks a task permanently failed and releases its cancel capability.
    pub fn mark_failed(&mut self, index: usize) {
        let task = &mut self.tasks[index];
        task.status = TaskStatus::Failed;
        task.cancel = None;
    }

    /// Takes every live cancel capability, leaving none behind.
    ///
    /// Used by session cancellation so each handle can be fired exactly
    /// once.
    pub fn take_cancels(&mut self) -> Vec<CancellationToken> {
        self.tasks.iter_mut().filter_map(|t| t.cancel.take()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_store_all_pending() {
        let store = TaskStore::new(3);
        assert_eq!(store.len(), 3);
        for i in 0..3 {
            let task = store.get(i).unwrap();
            assert_eq!(task.index(), i);
            assert_eq!(task.status(), TaskStatus::Pending);
            assert_eq!(task.retry_count(), 0);
            assert!(!task.has_cancel());
        }
    }

    #[test]
    fn empty_store() {
        let store = TaskStore::new(0);
        assert!(store.is_empty());
        assert!(store.next_pending().is_none());
    }

    #[test]
    fn next_pending_is_lowest_index() {
        let mut store = TaskStore::new(4);
        assert_eq!(store.next_pending(), Some(0));

        store.mark_in_flight(0);
        assert_eq!(store.next_pending(), Some(1));

        store.mark_in_flight(1);
        store.mark_completed(1);
        assert_eq!(store.next_pending(), Some(2));
    }

    #[test]
    fn retried_chunk_reenters_at_original_index() {
        let mut store = TaskStore::new(4);
        store.mark_in_flight(0);
        store.mark_completed(0);
        store.mark_in_flight(1);
        store.mark_in_flight(2);

        // Index 1 fails and is requeued: it must come back before 3.
        let retries = store.record_retry(1);
        assert_eq!(retries, 1);
        assert_eq!(store.next_pending(), Some(1));
    }

    #[test]
    fn slots_do_not_alias() {
        let mut store = TaskStore::new(3);
        store.mark_in_flight(1);
        let _ = store.record_retry(1);

        assert_eq!(store.get(0).unwrap().retry_count(), 0);
        assert_eq!(store.get(1).unwrap().retry_count(), 1);
        assert_eq!(store.get(2).unwrap().retry_count(), 0);
        assert_eq!(store.get(0).unwrap().status(), TaskStatus::Pending);
        assert_eq!(store.get(2).unwrap().status(), TaskStatus::Pending);
    }

    #[test]
    fn cancel_capability_lifecycle() {
        let mut store = TaskStore::new(2);
        store.mark_in_flight(0);
        store.store_cancel(0, CancellationToken::new());
        assert!(store.get(0).unwrap().has_cancel());

        store.mark_completed(0);
        assert!(!store.get(0).unwrap().has_cancel());
    }

    #[test]
    fn record_retry_clears_cancel_and_requeues() {
        let mut store = TaskStore::new(1);
        store.mark_in_flight(0);
        store.store_cancel(0, CancellationToken::new());

        let retries = store.record_retry(0);
        assert_eq!(retries, 1);
        let task = store.get(0).unwrap();
        assert_eq!(task.status(), TaskStatus::Pending);
        assert!(!task.has_cancel());
    }

    #[test]
    fn take_cancels_returns_only_live_handles() {
        let mut store = TaskStore::new(4);
        store.mark_in_flight(0);
        store.store_cancel(0, CancellationToken::new());
        store.mark_in_flight(2);
        store.store_cancel(2, CancellationToken::new());

        let handles = store.take_cancels();
        assert_eq!(handles.len(), 2);
        assert!(!store.get(0).unwrap().has_cancel());
        assert!(!store.get(2).unwrap().has_cancel());

        // A second take yields nothing.
        assert!(store.take_cancels().is_empty());
    }

    #[test]
    fn mark_failed_is_terminal_for_the_slot() {
        let mut store = TaskStore::new(2);
        store.mark_in_flight(0);
        store.mark_failed(0);
        assert_eq!(store.get(0).unwrap().status(), TaskStatus::Failed);
        // The failed slot no longer shows up as pending.
        assert_eq!(store.next_pending(), Some(1));
    }
}
