//! Coarse, cooperative cancellation of a run

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag checked between iterations
///
/// Clones observe the same flag. Cancelling never interrupts a phase that is
/// already running; the loop stops before the next iteration starts.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear a request so the next run starts fresh
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
