//! Progress reporting and cooperative cancellation

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Final outcome of a batch operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// Candidates successfully added or updated.
    pub added_or_updated: usize,

    /// Candidates that could not be processed.
    pub failed: usize,

    /// Entries removed from the document.
    pub removed: usize,

    /// Per-game and whole-pass error descriptions, in occurrence order.
    pub errors: Vec<String>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errors.is_empty()
    }
}

/// Receives incremental progress from a batch operation. Implementations
/// must tolerate being called from a worker thread.
pub trait ProgressSink: Send + Sync {
    /// Called before each candidate is processed.
    fn progress(&self, _current: usize, _total: usize, _label: &str) {}

    /// Called once when the operation finishes.
    fn completed(&self, _report: &SyncReport) {}
}

/// Sink that discards everything.
pub struct NullProgress;

impl ProgressSink for NullProgress {}

/// Cooperative cancellation flag, checked once per candidate in batch
/// loops. Cancellation never interrupts an in-flight file write; work done
/// before the flag was observed is still committed.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Rearm the token for the next operation.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_success() {
        let report = SyncReport::default();
        assert!(report.is_success());

        let report = SyncReport {
            failed: 1,
            ..Default::default()
        };
        assert!(!report.is_success());
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        let shared = token.clone();
        shared.cancel();
        assert!(token.is_cancelled());

        token.reset();
        assert!(!token.is_cancelled());
    }
}
