//! Session state primitives for chunked upload scheduling.
//!
//! This crate holds the per-chunk task arena, the session-level counters
//! and phase machine, and aggregate progress reporting. No scheduling
//! logic lives here — every mutation is driven by the scheduler crate,
//! which is the only writer.

pub mod progress;
pub mod state;
pub mod task;

pub use progress::{FailureCallback, ProgressCallback, ProgressUpdate, SuccessCallback};
pub use state::{SessionPhase, SessionState};
pub use task::{ChunkTask, TaskStatus, TaskStore};
