use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative stop signal for a running pipeline.
///
/// Clones share the flag. Once cancelled, the dispatcher stops pulling new
/// items; work already queued still drains.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the pipeline can run again.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}
