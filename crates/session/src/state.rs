//! Session-level counters and phase machine.

use serde::{Deserialize, Serialize};

/// Phase of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Created but not yet started.
    Idle,
    /// Admitting chunks and processing settlements.
    Running,
    /// No new admissions; in-flight chunks are left to settle.
    Paused,
    /// Every chunk completed.
    Succeeded,
    /// One chunk exhausted its retry budget.
    Failed,
    /// Deliberately canceled.
    Canceled,
}

impl SessionPhase {
    /// Terminal phases accept no further operations.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionPhase::Succeeded | SessionPhase::Failed | SessionPhase::Canceled
        )
    }
}

/// Counters and configuration for one upload session.
///
/// `completed` is monotone non-decreasing and never exceeds `total`;
/// `active` never exceeds `max_concurrency`. The increment/decrement of
/// `active` brackets exactly one outstanding transport call.
#[derive(Debug)]
pub struct SessionState {
    total: usize,
    completed: usize,
    active: usize,
    phase: SessionPhase,
    max_concurrency: usize,
    retry_budget: u32,
}

impl SessionState {
    /// Creates the state for `total` chunks.
    ///
    /// A `max_concurrency` of zero is treated as 1.
    pub fn new(total: usize, max_concurrency: usize, retry_budget: u32) -> Self {
        Self {
            total,
            completed: 0,
            active: 0,
            phase: SessionPhase::Idle,
            max_concurrency: max_concurrency.max(1),
            retry_budget,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn retry_budget(&self) -> u32 {
        self.retry_budget
    }

    pub fn set_phase(&mut self, phase: SessionPhase) {
        self.phase = phase;
    }

    pub fn has_free_slot(&self) -> bool {
        self.active < self.max_concurrency
    }

    /// Claims a slot for one outstanding transport call.
    pub fn begin_flight(&mut self) {
        debug_assert!(self.active < self.max_concurrency);
        self.active += 1;
    }

    /// Releases the slot of a settled transport call.
    pub fn end_flight(&mut self) {
        debug_assert!(self.active > 0);
        self.active -= 1;
    }

    pub fn record_completion(&mut self) {
        debug_assert!(self.completed < self.total);
        self.completed += 1;
    }

    pub fn all_completed(&self) -> bool {
        self.completed == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_idle() {
        let state = SessionState::new(5, 2, 3);
        assert_eq!(state.phase(), SessionPhase::Idle);
        assert_eq!(state.total(), 5);
        assert_eq!(state.completed(), 0);
        assert_eq!(state.active(), 0);
        assert_eq!(state.max_concurrency(), 2);
        assert_eq!(state.retry_budget(), 3);
    }

    #[test]
    fn zero_concurrency_clamped_to_one() {
        let state = SessionState::new(5, 0, 3);
        assert_eq!(state.max_concurrency(), 1);
    }

    #[test]
    fn flight_brackets_respect_the_ceiling() {
        let mut state = SessionState::new(5, 2, 3);
        assert!(state.has_free_slot());
        state.begin_flight();
        assert!(state.has_free_slot());
        state.begin_flight();
        assert!(!state.has_free_slot());

        state.end_flight();
        assert!(state.has_free_slot());
        assert_eq!(state.active(), 1);
    }

    #[test]
    fn completion_counter_reaches_total() {
        let mut state = SessionState::new(2, 1, 0);
        assert!(!state.all_completed());
        state.record_completion();
        state.record_completion();
        assert!(state.all_completed());
        assert_eq!(state.completed(), 2);
    }

    #[test]
    fn empty_session_is_already_complete() {
        let state = SessionState::new(0, 1, 3);
        assert!(state.all_completed());
    }

    #[test]
    fn terminal_phases() {
        assert!(!SessionPhase::Idle.is_terminal());
        assert!(!SessionPhase::Running.is_terminal());
        assert!(!SessionPhase::Paused.is_terminal());
        assert!(SessionPhase::Succeeded.is_terminal());
        assert!(SessionPhase::Failed.is_terminal());
        assert!(SessionPhase::Canceled.is_terminal());
    }
}
