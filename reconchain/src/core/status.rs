//! Link status enum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The outcome of a single link in a chain run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// The link ran and left the run healthy.
    Completed,
    /// The link was not run because the run had already faulted.
    Skipped,
    /// The link ran and faulted the run.
    Faulted,
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Skipped => write!(f, "skipped"),
            Self::Faulted => write!(f, "faulted"),
        }
    }
}

impl LinkStatus {
    /// Returns true if the link actually executed.
    #[must_use]
    pub fn ran(&self) -> bool {
        matches!(self, Self::Completed | Self::Faulted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_status_display() {
        assert_eq!(LinkStatus::Completed.to_string(), "completed");
        assert_eq!(LinkStatus::Skipped.to_string(), "skipped");
        assert_eq!(LinkStatus::Faulted.to_string(), "faulted");
    }

    #[test]
    fn test_link_status_ran() {
        assert!(LinkStatus::Completed.ran());
        assert!(LinkStatus::Faulted.ran());
        assert!(!LinkStatus::Skipped.ran());
    }

    #[test]
    fn test_link_status_serialize() {
        let json = serde_json::to_string(&LinkStatus::Skipped).unwrap();
        assert_eq!(json, r#""skipped""#);
    }
}
