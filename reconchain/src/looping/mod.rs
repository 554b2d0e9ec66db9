//! Looped collection: duration timer, deferred-cancellation handshake and
//! the built-in cycle loop.

mod handshake;
mod manager;
mod timer;

pub use handshake::{LoopHandshake, LoopState, TimerOutcome, LOOP_ELAPSED_REASON};
pub use manager::{CycleLoopManager, CycleRunner};
pub use timer::LoopTimer;
