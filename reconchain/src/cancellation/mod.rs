//! Cooperative cancellation shared by the pipeline, the loop timer and the
//! collection task.

mod token;

pub use token::{CancelCallback, CancellationToken};
