//! One-shot loop duration timer.

use super::handshake::{LoopHandshake, TimerOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

/// Fires [`LoopHandshake::on_timer_fired`] once after the loop duration.
///
/// Dropping the timer disposes it.
#[derive(Debug)]
pub struct LoopTimer {
    handle: Option<JoinHandle<TimerOutcome>>,
    duration: Duration,
}

impl LoopTimer {
    /// Arms the handshake and schedules the callback.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn arm(duration: Duration, handshake: Arc<LoopHandshake>) -> Self {
        handshake.arm();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            trace!(?duration, "Loop timer fired");
            handshake.on_timer_fired()
        });
        Self {
            handle: Some(handle),
            duration,
        }
    }

    /// The duration the timer was armed with.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Returns true while the callback has neither run nor been disposed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancels the pending callback. Safe to call more than once.
    ///
    /// Returns true if this call released the timer.
    pub fn dispose(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for LoopTimer {
    fn drop(&mut self) {
        self.dispose();
    }
}
