//! Error types for reconchain runs.
//!
//! Most faults never leave the pipeline as errors: links log them and set
//! the run's fault flag so that cleanup links still execute. [`ReconError`]
//! is what collaborators return, and what a run finally raises when the
//! awaited collection task fails.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The category a fault belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Inconsistent options or an unusable output directory.
    Configuration,
    /// The directory could not be reached.
    Connectivity,
    /// A required domain or forest object could not be resolved.
    Resolution,
    /// The collection task failed.
    Collection,
    /// The cache file could not be read or written.
    Cache,
    /// The run was cancelled.
    Cancelled,
    /// Anything else.
    Internal,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Connectivity => write!(f, "connectivity"),
            Self::Resolution => write!(f, "resolution"),
            Self::Collection => write!(f, "collection"),
            Self::Cache => write!(f, "cache"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// The main error type for reconchain operations.
#[derive(Debug, Error)]
pub enum ReconError {
    /// Options are inconsistent or the environment is unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The directory service could not be reached.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// A domain, forest or identifier could not be resolved.
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// The collection task reported a failure.
    #[error("Collection failed: {0}")]
    Collection(String),

    /// The cache could not be loaded or saved.
    #[error("Cache error: {0}")]
    Cache(String),

    /// The operation was cancelled before it completed.
    #[error("Run cancelled: {0}")]
    Cancelled(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReconError {
    /// Creates a resolution error.
    #[must_use]
    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution(message.into())
    }

    /// Creates a collection error.
    #[must_use]
    pub fn collection(message: impl Into<String>) -> Self {
        Self::Collection(message.into())
    }

    /// Returns the fault category of this error.
    #[must_use]
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::Configuration(_) => FaultKind::Configuration,
            Self::Connectivity(_) => FaultKind::Connectivity,
            Self::Resolution(_) => FaultKind::Resolution,
            Self::Collection(_) => FaultKind::Collection,
            Self::Cache(_) | Self::Serialization(_) => FaultKind::Cache,
            Self::Cancelled(_) => FaultKind::Cancelled,
            Self::Io(_) | Self::Internal(_) => FaultKind::Internal,
        }
    }
}

impl From<serde_json::Error> for ReconError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
