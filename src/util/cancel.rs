//! Cooperative cancellation token
//!
//! The benchmark has exactly one shutdown signal: the sampler raises it when
//! the time budget is spent, and every worker polls it once per loop
//! iteration. A token is an `Arc<AtomicBool>` handed to each thread at spawn
//! time rather than a process-wide global, so independent runs (and tests)
//! never interfere with each other.
//!
//! Relaxed ordering is sufficient on both sides: the flag is the only
//! cross-thread signal and eventual visibility is all the shutdown contract
//! requires. No data is published through it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable handle to a shared stop flag
///
/// Clones share the same underlying flag. Raising the flag is idempotent.
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a new token in the "running" state
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Raise the stop flag
    #[inline]
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Check whether the stop flag has been raised
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
