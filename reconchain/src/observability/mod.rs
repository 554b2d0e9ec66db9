//! Observability utilities.

mod subscriber;
mod wide_events;

pub use subscriber::{init_tracing, LogFormat, DEFAULT_LOG_FILTER};
pub use wide_events::{emit_run_summary, run_payload};
