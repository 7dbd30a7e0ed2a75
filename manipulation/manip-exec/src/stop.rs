//! Operator stop requests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A shared flag that asks running motions to stop at the next checkpoint.
///
/// Clones share the same flag, so the operator side keeps one clone and the
/// engine another.
///
/// # Example
///
/// ```
/// use manip_exec::StopSignal;
///
/// let stop = StopSignal::new();
/// let operator = stop.clone();
///
/// operator.request_stop();
/// assert!(stop.is_stop_requested());
///
/// stop.reset();
/// assert!(!operator.is_stop_requested());
/// ```
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// Creates a signal with no stop requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop.
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` if a stop has been requested.
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears a stop request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
