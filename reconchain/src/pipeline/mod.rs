//! Link chain execution.
//!
//! This module provides:
//! - The [`Link`] steps of a collection run and their collaborators
//! - [`LinkChain`], which runs links in order and short-circuits on fault
//! - [`RunReport`] describing what ran

mod chain;
mod links;

pub use chain::{run_collection, LinkChain, LinkRecord, RunReport};
pub use links::{
    process_user_name, strip_domain, IdentitySource, Link, Links, DEFAULT_LOOP_DURATION,
    DEFAULT_LOOP_INTERVAL,
};
