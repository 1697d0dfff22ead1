//! Aggregate progress reporting.

use serde::{Deserialize, Serialize};

/// Snapshot of overall session progress.
///
/// `percentage` is non-decreasing across the life of a session and
/// reaches exactly 100 if and only if the session succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Completion percentage, 0.0–100.0. Defined as 100 when `total`
    /// is zero.
    pub percentage: f64,
    /// Chunks completed so far.
    pub completed: usize,
    /// Total chunks in the session.
    pub total: usize,
    /// Chunks currently in flight.
    pub in_flight: usize,
}

impl ProgressUpdate {
    /// Derives a snapshot from the session counters.
    pub fn aggregate(completed: usize, total: usize, in_flight: usize) -> Self {
        let percentage = if total == 0 {
            100.0
        } else {
            completed as f64 / total as f64 * 100.0
        };
        Self {
            percentage,
            completed,
            total,
            in_flight,
        }
    }
}

/// Callback invoked with aggregate progress.
pub type ProgressCallback = Box<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Callback invoked once if the session fails, with the triggering error.
pub type FailureCallback =
    Box<dyn Fn(&(dyn std::error::Error + Send + Sync)) + Send + Sync>;

/// Callback invoked once when every chunk has completed.
pub type SuccessCallback = Box<dyn Fn() + Send + Sync>;
