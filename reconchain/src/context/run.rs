//! The mutable state threaded through every link of a run.

use super::{RunIdentity, RunSnapshot};
use crate::cache::ObjectCache;
use crate::cancellation::CancellationToken;
use crate::collection::{CollectionRequest, TaskHandle};
use crate::config::RunOptions;
use crate::core::{CollectionMethod, EnumerationDomain};
use crate::errors::FaultKind;
use crate::looping::{LoopHandshake, LoopTimer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Boolean switches controlling branch behavior.
///
/// The loop handshake flags live in [`LoopHandshake`] so the timer task
/// can update them under a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunFlags {
    /// Set by the first link that fails; never cleared.
    pub is_faulted: bool,
    /// Keep collecting after the base run.
    pub loop_enabled: bool,
    /// Enumerate the whole forest.
    pub search_forest: bool,
    /// Walk trusts recursively.
    pub recurse_domains: bool,
    /// No output files are written.
    pub no_output: bool,
    /// The cache is never persisted.
    pub mem_cache: bool,
}

impl RunFlags {
    /// Copies the switches from run options.
    #[must_use]
    pub fn from_options(options: &RunOptions) -> Self {
        Self {
            is_faulted: false,
            loop_enabled: options.loop_enabled,
            search_forest: options.search_forest,
            recurse_domains: options.recurse_domains,
            no_output: options.no_output,
            mem_cache: options.mem_cache,
        }
    }
}

/// The first fault recorded on a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFault {
    /// Category of the fault.
    pub kind: FaultKind,
    /// Human readable description.
    pub message: String,
}

/// Mutable state of one run.
///
/// Owned by the caller driving the chain; links borrow it mutably one at
/// a time.
pub struct RunContext {
    /// Identity used in log spans and reports.
    pub identity: RunIdentity,
    /// Options the run was started with.
    pub options: RunOptions,
    /// Target domain. Resolved during initialization when empty.
    pub domain_name: Option<String>,
    /// Enumeration targets.
    pub domains: Vec<EnumerationDomain>,
    /// Methods to collect; narrowed when looping starts.
    pub resolved_collection_methods: CollectionMethod,
    /// Branch switches.
    pub flags: RunFlags,
    /// Total loop duration.
    pub loop_duration: Duration,
    /// Pause between loop cycles.
    pub loop_interval: Duration,
    /// Wall-clock end of the loop.
    pub loop_end: DateTime<Utc>,
    /// Loop duration timer, when armed.
    pub timer: Option<LoopTimer>,
    /// Cooperative cancellation for the run. May be cancelled by the caller.
    pub cancellation: Arc<CancellationToken>,
    /// Deferred-cancellation handshake bound to `cancellation`.
    pub handshake: Arc<LoopHandshake>,
    /// In-flight or most recent collection.
    pub collection_task: Option<TaskHandle>,
    /// Identity used for session collection.
    pub current_user_name: String,
    /// Object cache handed to collection.
    pub cache: Arc<ObjectCache>,
    /// Cache file location, once the cache has been initialized.
    pub cache_path: Option<PathBuf>,
    /// First fault recorded, if any.
    pub fault: Option<RunFault>,
}

impl RunContext {
    /// Creates a context for the given options.
    #[must_use]
    pub fn new(options: RunOptions) -> Self {
        let cancellation = Arc::new(CancellationToken::new());
        let handshake = Arc::new(LoopHandshake::new(cancellation.clone()));
        Self {
            identity: RunIdentity::new(),
            domain_name: options.domain.clone().filter(|d| !d.trim().is_empty()),
            domains: Vec::new(),
            resolved_collection_methods: options.resolved_collection_methods(),
            flags: RunFlags::from_options(&options),
            loop_duration: options.loop_duration(),
            loop_interval: options.loop_interval(),
            loop_end: Utc::now(),
            timer: None,
            cancellation,
            handshake,
            collection_task: None,
            current_user_name: String::new(),
            cache: Arc::new(ObjectCache::new()),
            cache_path: None,
            fault: None,
            options,
        }
    }

    /// Uses a caller-owned cancellation token, which may already be cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.handshake = Arc::new(LoopHandshake::new(token.clone()));
        self.cancellation = token;
        self
    }

    /// Uses a specific run identity.
    #[must_use]
    pub fn with_identity(mut self, identity: RunIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Marks the run as faulted and logs the reason.
    ///
    /// Only the first fault is kept.
    pub fn fault(&mut self, kind: FaultKind, message: impl Into<String>) {
        let message = message.into();
        error!(critical = true, kind = %kind, run_id = %self.identity.run_id, "{message}");
        self.flags.is_faulted = true;
        if self.fault.is_none() {
            self.fault = Some(RunFault { kind, message });
        }
    }

    /// Returns true once any link has faulted the run.
    #[must_use]
    pub fn is_faulted(&self) -> bool {
        self.flags.is_faulted
    }

    /// Returns whether the first collection cycle has completed.
    #[must_use]
    pub fn initial_completed(&self) -> bool {
        self.handshake.initial_completed()
    }

    /// Returns whether cancellation is owed to an elapsed loop timer.
    #[must_use]
    pub fn needs_cancellation(&self) -> bool {
        self.handshake.needs_cancellation()
    }

    /// Builds the request handed to the collection task.
    #[must_use]
    pub fn collection_request(&self) -> CollectionRequest {
        CollectionRequest {
            run_id: self.identity.run_id,
            domains: self.domains.clone(),
            methods: self.resolved_collection_methods,
            current_user_name: self.current_user_name.clone(),
            cache: self.cache.clone(),
            cancellation: self.cancellation.clone(),
            cycle: 1,
        }
    }

    /// Captures the observable state of the context.
    #[must_use]
    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            run_id: self.identity.run_id,
            domain_name: self.domain_name.clone(),
            domains: self.domains.clone(),
            resolved_collection_methods: self.resolved_collection_methods,
            flags: self.flags,
            initial_completed: self.initial_completed(),
            needs_cancellation: self.needs_cancellation(),
            loop_duration_secs: self.loop_duration.as_secs(),
            loop_interval_secs: self.loop_interval.as_secs(),
            loop_end: self.loop_end,
            timer_armed: self.timer.is_some(),
            has_collection_task: self.collection_task.is_some(),
            current_user_name: self.current_user_name.clone(),
            cache_path: self.cache_path.clone(),
            cancelled: self.cancellation.is_cancelled(),
            fault: self.fault.clone(),
        }
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.identity.run_id)
            .field("domain_name", &self.domain_name)
            .field("domains", &self.domains.len())
            .field("methods", &self.resolved_collection_methods)
            .field("flags", &self.flags)
            .field("handshake", &self.handshake)
            .field("timer_armed", &self.timer.is_some())
            .field("has_collection_task", &self.collection_task.is_some())
            .field("fault", &self.fault)
            .finish_non_exhaustive()
    }
}
