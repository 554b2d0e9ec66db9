//! Run context management.
//!
//! This module provides:
//! - [`RunContext`], the single mutable state a chain threads through its links
//! - [`RunSnapshot`] for capturing and comparing that state
//! - [`RunIdentity`] for correlating logs and reports

#[cfg(test)]
mod context_tests;
mod identity;
mod run;
mod snapshot;

pub use identity::RunIdentity;
pub use run::{RunContext, RunFault, RunFlags};
pub use snapshot::RunSnapshot;
