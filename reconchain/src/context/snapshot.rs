//! Serializable snapshot of a run context.

use super::{RunFault, RunFlags};
use crate::core::{CollectionMethod, EnumerationDomain};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Point-in-time copy of the observable parts of a [`super::RunContext`].
///
/// Handles (timer, collection task, cache) are reduced to presence flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// Run ID.
    pub run_id: Uuid,
    /// Target domain.
    pub domain_name: Option<String>,
    /// Enumeration targets.
    pub domains: Vec<EnumerationDomain>,
    /// Methods to collect.
    pub resolved_collection_methods: CollectionMethod,
    /// Branch switches.
    pub flags: RunFlags,
    /// Handshake: first cycle done.
    pub initial_completed: bool,
    /// Handshake: cancellation owed.
    pub needs_cancellation: bool,
    /// Loop duration in seconds.
    pub loop_duration_secs: u64,
    /// Loop interval in seconds.
    pub loop_interval_secs: u64,
    /// Wall-clock end of the loop.
    pub loop_end: DateTime<Utc>,
    /// Whether a loop timer is held.
    pub timer_armed: bool,
    /// Whether a collection task handle is held.
    pub has_collection_task: bool,
    /// Session identity.
    pub current_user_name: String,
    /// Cache file location.
    pub cache_path: Option<PathBuf>,
    /// Whether cancellation was requested.
    pub cancelled: bool,
    /// First fault, if any.
    pub fault: Option<RunFault>,
}

impl RunSnapshot {
    /// Serializes the snapshot to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
