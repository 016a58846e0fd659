use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation was cancelled")]
pub struct Cancelled;

/// Cooperative cancellation shared between a long-running scan and its controller.
///
/// Scans call [`CancellationToken::safepoint`] between units of work; the controller may call
/// [`CancellationToken::cancel`] from any thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn safepoint(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            log::trace!("safepoint observed cancellation");
            return Err(Cancelled);
        }
        Ok(())
    }
}
