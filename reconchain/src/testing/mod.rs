//! Testing utilities for reconchain runs.
//!
//! This module provides:
//! - An in-memory directory with configurable domains, trusts and forests
//! - Scripted collection tasks and cycle runners
//! - Assertions over run reports

mod assertions;
mod fakes;
mod mocks;

pub use assertions::{
    assert_link_status, assert_links_ran, assert_only_cleanup_after, assert_run_faulted,
};
pub use fakes::FakeDirectory;
pub use mocks::{CountingCycleRunner, ScriptedCollectionTask};
