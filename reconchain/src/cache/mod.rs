//! Persistent object cache and its file gateway.

mod gateway;
mod object_cache;

pub use gateway::CacheGateway;
pub use object_cache::{CacheStats, ObjectCache, CACHE_VERSION};
