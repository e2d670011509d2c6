//! Cancellation and progress collaborators for a refresh pass.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Cancelled;
use crate::refresh::Stage;

/// Lines scanned between cancellation checks inside a detector loop.
pub(crate) const CHECK_EVERY: usize = 64;

/// Handle to cancel an in-progress refresh.
///
/// Clones share the same flag, so a UI thread can hold one clone and cancel
/// while the refresh runs with another.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancel_flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    #[inline]
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Check only every [`CHECK_EVERY`] iterations of a scanning loop.
    #[inline]
    pub(crate) fn check_at(&self, iteration: usize) -> Result<(), Cancelled> {
        if iteration % CHECK_EVERY == 0 {
            self.check()
        } else {
            Ok(())
        }
    }
}

/// Side channel for stage progress.
///
/// Called between stages on the refreshing thread. Implementations must
/// return quickly; nothing in the pipeline depends on them.
pub trait Progress {
    /// `fraction` is the share of the pass completed, in `0.0..=1.0`.
    fn report(&mut self, stage: Stage, fraction: f64);
}

/// Progress sink that ignores every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&mut self, _stage: Stage, _fraction: f64) {}
}

impl<F> Progress for F
where
    F: FnMut(Stage, f64),
{
    fn report(&mut self, stage: Stage, fraction: f64) {
        self(stage, fraction);
    }
}
