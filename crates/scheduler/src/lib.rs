//! Bounded-concurrency chunk upload scheduling.
//!
//! This crate implements the **dispatch logic** for uploading a fixed,
//! ordered sequence of opaque chunk handles. It is a library crate with
//! no transport dependencies — the application provides a
//! [`ChunkTransport`] implementation that bridges to the actual wire
//! protocol.
//!
//! # Lifecycle
//!
//! 1. **Start** — seed admissions up to the concurrency ceiling
//! 2. **Settle** — each outcome frees a slot and admits the next chunk
//! 3. **Retry** — non-cancellation failures requeue at the original index
//! 4. **Escalate** — an exhausted retry budget fails the whole session
//! 5. **Pause / resume / cancel** — interrupt or resume the schedule

pub mod controller;
pub mod scheduler;
pub mod transport;

// Re-export primary types for convenience.
pub use chunklift_session::{ProgressUpdate, SessionPhase, TaskStatus};
pub use controller::UploadController;
pub use scheduler::SessionOptions;
pub use transport::{
    CancellationClassifier, ChunkCancelled, ChunkTransport, DowncastClassifier, Settlement,
    TransportFailure, UploadHandle,
};
