//! Deferred-cancellation handshake between the loop timer and the first
//! collection cycle.
//!
//! The loop timer must not cut the first cycle short. When it fires before
//! the first cycle is done it only records that cancellation is owed; the
//! loop driver requests it once the first cycle completes. Both decisions
//! are taken under one lock so exactly one side requests cancellation.

use crate::cancellation::CancellationToken;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Reason recorded on the token when the loop duration runs out.
pub const LOOP_ELAPSED_REASON: &str = "Loop duration elapsed";

/// Where the loop is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// No timer armed.
    Idle,
    /// The duration timer is armed.
    Armed,
    /// The loop is running and the first cycle has not completed.
    WaitingForFirstCompletion,
    /// The timer fired during the first cycle; cancellation is owed.
    CancellationPending,
    /// The timer fired after the first cycle; cancellation is being requested.
    TimerFiredInitialComplete,
    /// Cancellation has been requested.
    Cancelled,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Armed => write!(f, "armed"),
            Self::WaitingForFirstCompletion => write!(f, "waiting_for_first_completion"),
            Self::CancellationPending => write!(f, "cancellation_pending"),
            Self::TimerFiredInitialComplete => write!(f, "timer_fired_initial_complete"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// What happened when the timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    /// The first cycle was done; cancellation was requested.
    CancellationRequested,
    /// The first cycle is still running; cancellation is deferred.
    Deferred,
    /// The loop was not armed or is already cancelled.
    Ignored,
}

#[derive(Debug)]
struct HandshakeState {
    state: LoopState,
    initial_completed: bool,
    needs_cancellation: bool,
}

impl HandshakeState {
    const fn idle() -> Self {
        Self {
            state: LoopState::Idle,
            initial_completed: false,
            needs_cancellation: false,
        }
    }
}

/// Shared between the loop timer, the loop driver and the run context.
pub struct LoopHandshake {
    inner: Mutex<HandshakeState>,
    token: Arc<CancellationToken>,
}

impl LoopHandshake {
    /// Creates an idle handshake that cancels `token`.
    #[must_use]
    pub fn new(token: Arc<CancellationToken>) -> Self {
        Self {
            inner: Mutex::new(HandshakeState::idle()),
            token,
        }
    }

    /// Returns the token this handshake cancels.
    #[must_use]
    pub fn token(&self) -> &Arc<CancellationToken> {
        &self.token
    }

    /// Clears both flags and returns to [`LoopState::Idle`].
    pub fn reset(&self) {
        *self.inner.lock() = HandshakeState::idle();
    }

    /// Marks the duration timer as armed.
    pub fn arm(&self) {
        let mut inner = self.inner.lock();
        if inner.state == LoopState::Idle {
            inner.state = LoopState::Armed;
        }
    }

    /// Marks the loop as started with its first cycle in flight.
    pub fn begin_loop(&self) {
        let mut inner = self.inner.lock();
        if inner.state == LoopState::Armed && !inner.initial_completed {
            inner.state = LoopState::WaitingForFirstCompletion;
        }
    }

    /// Called by the loop timer when the loop duration has elapsed.
    pub fn on_timer_fired(&self) -> TimerOutcome {
        let mut inner = self.inner.lock();
        match inner.state {
            LoopState::Idle | LoopState::Cancelled | LoopState::TimerFiredInitialComplete => {
                return TimerOutcome::Ignored;
            }
            LoopState::CancellationPending => return TimerOutcome::Deferred,
            LoopState::Armed | LoopState::WaitingForFirstCompletion => {}
        }

        if inner.initial_completed {
            inner.state = LoopState::TimerFiredInitialComplete;
            drop(inner);
            info!("Loop duration elapsed, requesting cancellation");
            self.token.cancel(LOOP_ELAPSED_REASON);
            self.inner.lock().state = LoopState::Cancelled;
            TimerOutcome::CancellationRequested
        } else {
            inner.needs_cancellation = true;
            inner.state = LoopState::CancellationPending;
            info!("Loop duration elapsed during the first cycle, deferring cancellation");
            TimerOutcome::Deferred
        }
    }

    /// Called by the loop driver once the first cycle has completed.
    ///
    /// Returns true if this call requested the cancellation owed by an
    /// earlier timer firing.
    pub fn mark_initial_completed(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.initial_completed {
            return false;
        }
        inner.initial_completed = true;

        if inner.needs_cancellation {
            inner.state = LoopState::Cancelled;
            drop(inner);
            info!("First cycle completed after the loop duration, requesting cancellation");
            self.token.cancel(LOOP_ELAPSED_REASON);
            return true;
        }

        if inner.state == LoopState::WaitingForFirstCompletion {
            inner.state = LoopState::Armed;
        }
        debug!("First cycle completed");
        false
    }

    /// Checks the token at a cycle boundary.
    ///
    /// Returns true if cancellation has been requested by anyone.
    pub fn observe_cancellation(&self) -> bool {
        if !self.token.is_cancelled() {
            return false;
        }
        let mut inner = self.inner.lock();
        if inner.state != LoopState::Cancelled {
            trace!(from = %inner.state, "Observed cancellation");
            inner.state = LoopState::Cancelled;
        }
        true
    }

    /// Returns whether the first cycle has completed.
    #[must_use]
    pub fn initial_completed(&self) -> bool {
        self.inner.lock().initial_completed
    }

    /// Returns whether cancellation is owed to a timer that already fired.
    #[must_use]
    pub fn needs_cancellation(&self) -> bool {
        self.inner.lock().needs_cancellation
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> LoopState {
        self.inner.lock().state
    }
}

impl fmt::Debug for LoopHandshake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("LoopHandshake")
            .field("state", &inner.state)
            .field("initial_completed", &inner.initial_completed)
            .field("needs_cancellation", &inner.needs_cancellation)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
