//! In-memory object cache shared by collection cycles.

use crate::errors::ReconError;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version written into every serialized cache. Blobs with another version
/// are rejected on load.
pub const CACHE_VERSION: u32 = 1;

/// Concurrent lookup tables reused across runs.
///
/// The collection engine owns the meaning of the keys; the chain only loads
/// the cache at startup, hands it to the collection task and saves it at
/// the end of the run.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectCache {
    #[serde(default)]
    value_to_id: DashMap<String, String>,
    #[serde(default)]
    id_to_type: DashMap<String, String>,
    #[serde(default)]
    machine_sids: DashMap<String, String>,
    #[serde(default)]
    sid_to_domain: DashMap<String, String>,
    cache_version: u32,
}

/// Entry counts of an [`ObjectCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Distinguished name or account name to identifier mappings.
    pub value_to_id: usize,
    /// Identifier to object type mappings.
    pub id_to_type: usize,
    /// Machine SIDs keyed by host.
    pub machine_sids: usize,
    /// Domain names keyed by SID.
    pub sid_to_domain: usize,
}

impl CacheStats {
    /// Total number of entries.
    #[must_use]
    pub fn total(&self) -> usize {
        self.value_to_id + self.id_to_type + self.machine_sids + self.sid_to_domain
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ID to type mappings, {} name to SID mappings, {} machine SID mappings, {} SID to domain mappings",
            self.id_to_type, self.value_to_id, self.machine_sids, self.sid_to_domain
        )
    }
}

impl Default for ObjectCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            value_to_id: DashMap::new(),
            id_to_type: DashMap::new(),
            machine_sids: DashMap::new(),
            sid_to_domain: DashMap::new(),
            cache_version: CACHE_VERSION,
        }
    }

    /// Restores a cache from a serialized blob.
    pub fn load(bytes: &[u8]) -> Result<Self, ReconError> {
        let cache: Self = serde_json::from_slice(bytes)?;
        if cache.cache_version != CACHE_VERSION {
            return Err(ReconError::Cache(format!(
                "cache version {} does not match expected version {CACHE_VERSION}",
                cache.cache_version
            )));
        }
        Ok(cache)
    }

    /// Serializes the cache.
    pub fn save(&self) -> Result<Vec<u8>, ReconError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Returns entry counts.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            value_to_id: self.value_to_id.len(),
            id_to_type: self.id_to_type.len(),
            machine_sids: self.machine_sids.len(),
            sid_to_domain: self.sid_to_domain.len(),
        }
    }

    /// Returns true if no table has entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stats().total() == 0
    }

    /// Maps a value to an identifier.
    pub fn add_converted_value(&self, value: impl Into<String>, id: impl Into<String>) {
        self.value_to_id.insert(value.into(), id.into());
    }

    /// Looks up the identifier of a value.
    #[must_use]
    pub fn get_converted_value(&self, value: &str) -> Option<String> {
        self.value_to_id.get(value).map(|v| v.value().clone())
    }

    /// Records the object type of an identifier.
    pub fn add_type(&self, id: impl Into<String>, object_type: impl Into<String>) {
        self.id_to_type.insert(id.into(), object_type.into());
    }

    /// Looks up the object type of an identifier.
    #[must_use]
    pub fn get_type(&self, id: &str) -> Option<String> {
        self.id_to_type.get(id).map(|v| v.value().clone())
    }

    /// Records the local machine SID of a host.
    pub fn add_machine_sid(&self, host: impl Into<String>, sid: impl Into<String>) {
        self.machine_sids.insert(host.into(), sid.into());
    }

    /// Looks up the local machine SID of a host.
    #[must_use]
    pub fn get_machine_sid(&self, host: &str) -> Option<String> {
        self.machine_sids.get(host).map(|v| v.value().clone())
    }

    /// Maps a domain SID to its name. SIDs are stored uppercased.
    pub fn add_sid_to_domain(&self, sid: &str, domain: impl Into<String>) {
        self.sid_to_domain.insert(sid.to_uppercase(), domain.into());
    }

    /// Looks up the domain name of a SID.
    #[must_use]
    pub fn get_domain_from_sid(&self, sid: &str) -> Option<String> {
        self.sid_to_domain
            .get(&sid.to_uppercase())
            .map(|v| v.value().clone())
    }
}
