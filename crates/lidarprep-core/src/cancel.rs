//! Cooperative stop signal shared between a batch and its workers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{LidarError, Result};

/// Shared, clonable stop flag.
///
/// Raising the flag never interrupts anything by itself: readers, strategies and
/// writers poll it at their own checkpoints and wind down when they see it.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Idempotent.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Poll point for loops that propagate errors with `?`
    pub fn check(&self) -> Result<()> {
        if self.is_stopped() {
            Err(LidarError::Cancelled)
        } else {
            Ok(())
        }
    }
}
