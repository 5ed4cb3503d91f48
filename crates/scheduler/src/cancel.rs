//! Cancellation token for in-flight derivations
//!
//! A derivation checks its token between steps and stops early once a newer
//! derivation has been started.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Cancellation token for cooperative cancellation
///
/// Clones share the same underlying state, so the gate that handed out a
/// token can cancel the work holding the clone.
///
/// # Example
///
/// ```
/// use pdf_overlay_scheduler::CancellationToken;
///
/// let token = CancellationToken::new();
/// let derivation_token = token.clone();
///
/// token.cancel();
/// assert!(derivation_token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token in the non-cancelled state
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancel this token and every clone of it
    ///
    /// Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
