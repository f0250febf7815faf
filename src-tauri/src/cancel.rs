//! Shared cancellation flag for the blocking workers (injector, countdown,
//! permission polling).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable, best-effort cancellation flag.
///
/// Cancelling never interrupts work already in progress; workers check
/// the flag between units of work.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
