//! Collaborator traits: chunk transport and cancellation classification.
//!
//! `ChunkTransport` is implemented by the application to bridge
//! scheduling to the actual wire protocol. Using a trait keeps dispatch
//! logic decoupled from transport and testable with mocks.

use std::error::Error;
use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

/// Failure value produced by a transport settlement.
///
/// Opaque to the scheduler; only the [`CancellationClassifier`] inspects
/// it.
pub type TransportFailure = Box<dyn Error + Send + Sync>;

/// Settlement future for one outstanding chunk upload.
pub type Settlement = Pin<Box<dyn Future<Output = Result<(), TransportFailure>> + Send>>;

/// Handle to one in-flight chunk upload.
pub struct UploadHandle {
    /// Resolves once, when the transport finishes or aborts the call.
    pub settlement: Settlement,
    /// Requests a cooperative abort of the call.
    pub cancel: CancellationToken,
}

/// Performs the transfer of a single chunk.
pub trait ChunkTransport<C>: Send + Sync {
    /// Starts uploading `chunk` (position `index` in the original
    /// sequence) and returns its settlement plus a cancel capability.
    ///
    /// Contract: firing `cancel` before settlement must make the
    /// settlement resolve to a failure the session's classifier
    /// recognizes as a cancellation; firing it after settlement is a
    /// no-op.
    fn upload(&self, index: usize, chunk: &C) -> UploadHandle;
}

/// Failure settled by a transport whose upload was deliberately aborted.
#[derive(Debug, thiserror::Error)]
#[error("chunk upload cancelled")]
pub struct ChunkCancelled;

/// Distinguishes deliberate cancellations from real failures.
///
/// Cancellations are never counted toward the retry budget and never
/// surfaced through the failure callback.
pub trait CancellationClassifier: Send + Sync {
    fn is_cancellation(&self, failure: &TransportFailure) -> bool;
}

/// Default classifier: a failure is a cancellation iff it is a
/// [`ChunkCancelled`].
#[derive(Debug, Default)]
pub struct DowncastClassifier;

impl CancellationClassifier for DowncastClassifier {
    fn is_cancellation(&self, failure: &TransportFailure) -> bool {
        failure.downcast_ref::<ChunkCancelled>().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("connection reset")]
    struct ConnectionReset;

    #[test]
    fn downcast_classifier_recognizes_cancellation() {
        let classifier = DowncastClassifier;
        let failure: TransportFailure = Box::new(ChunkCancelled);
        assert!(classifier.is_cancellation(&failure));
    }

    #[test]
    fn downcast_classifier_rejects_other_failures() {
        let classifier = DowncastClassifier;
        let failure: TransportFailure = Box::new(ConnectionReset);
        assert!(!classifier.is_cancellation(&failure));
    }
}
