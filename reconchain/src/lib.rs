//! # Reconchain
//!
//! Orchestration for directory reconnaissance runs.
//!
//! A run threads one mutable [`context::RunContext`] through a fixed chain of
//! links: setup, connectivity check, domain discovery, collection, optional
//! looping and teardown. Reconchain provides:
//!
//! - **Link chain execution**: strict ordering with fault short-circuiting
//!   that still runs cleanup links
//! - **Trust discovery**: breadth-first walk of domain trusts, forest
//!   enumeration or a single domain
//! - **Looped collection**: a duration timer that never truncates the first
//!   cycle, with cooperative cancellation
//! - **Cache gateway**: load-on-start and save-on-finish of the object cache
//!
//! The directory binding and the collection engine are supplied by the
//! caller through [`directory::DirectoryAccess`] and
//! [`collection::CollectionTask`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reconchain::prelude::*;
//!
//! let links = Links::new(directory, collector, Arc::new(CycleLoopManager::new(runner)));
//! let options = RunOptions::new().with_domain("corp.local").with_recurse_domains();
//!
//! let mut ctx = RunContext::new(options);
//! let report = LinkChain::for_context(&ctx).run(&links, &mut ctx).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cache;
pub mod cancellation;
pub mod collection;
pub mod config;
pub mod context;
pub mod core;
pub mod directory;
pub mod discovery;
pub mod errors;
pub mod looping;
pub mod observability;
pub mod pipeline;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cache::{CacheGateway, CacheStats, ObjectCache};
    pub use crate::cancellation::CancellationToken;
    pub use crate::collection::{
        CollectionRequest, CollectionTask, LoopManager, LoopRequest, TaskHandle,
    };
    pub use crate::config::RunOptions;
    pub use crate::context::{RunContext, RunFlags, RunIdentity, RunSnapshot};
    pub use crate::core::{
        CollectionMethod, CollectionMethodOption, EnumerationDomain, LinkStatus,
    };
    pub use crate::directory::{ConnectionStatus, DirectoryAccess, Domain, DomainTrust, TrustType};
    pub use crate::discovery::{DiscoveryMode, TrustDiscovery};
    pub use crate::errors::{FaultKind, ReconError};
    pub use crate::looping::{CycleLoopManager, CycleRunner, LoopHandshake, LoopState, LoopTimer};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{run_collection, Link, LinkChain, Links, RunReport};
}
