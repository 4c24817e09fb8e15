use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between a caller and a running scan.
///
/// Scans check the token between per-file units of work, never in the middle
/// of parsing a single file. Cloning is cheap; all clones observe the same
/// flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Returns `Err(IndexError::Cancelled)` once the token has been cancelled.
    pub fn check(&self) -> Result<(), crate::types::IndexError> {
        if self.is_cancelled() {
            Err(crate::types::IndexError::Cancelled)
        } else {
            Ok(())
        }
    }
}
