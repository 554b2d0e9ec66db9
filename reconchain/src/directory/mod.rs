//! Directory access seam.
//!
//! The LDAP binding layer lives outside this crate. Everything the chain
//! needs from it goes through [`DirectoryAccess`].

use crate::errors::ReconError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A domain object returned by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Domain {
    /// DNS name of the domain.
    pub name: String,
}

impl Domain {
    /// Creates a new domain object.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// The kind of a trust relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrustType {
    /// Parent/child trust inside a forest.
    ParentChild,
    /// Shortcut trust between domains of one forest.
    CrossLink,
    /// Trust between forest roots.
    Forest,
    /// Trust to a domain outside the forest.
    External,
    /// Type not reported.
    #[default]
    Unknown,
}

impl fmt::Display for TrustType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParentChild => write!(f, "ParentChild"),
            Self::CrossLink => write!(f, "CrossLink"),
            Self::Forest => write!(f, "Forest"),
            Self::External => write!(f, "External"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// One outgoing trust of a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainTrust {
    /// Name of the trusted domain.
    pub target_domain_name: String,
    /// SID of the trusted domain, if the directory could resolve it.
    pub target_domain_sid: Option<String>,
    /// Kind of trust.
    pub trust_type: TrustType,
}

impl DomainTrust {
    /// Creates a trust with a resolved target SID.
    #[must_use]
    pub fn new(name: impl Into<String>, sid: impl Into<String>, trust_type: TrustType) -> Self {
        Self {
            target_domain_name: name.into(),
            target_domain_sid: Some(sid.into()),
            trust_type,
        }
    }

    /// Creates a trust whose target SID could not be resolved.
    #[must_use]
    pub fn unresolved(name: impl Into<String>, trust_type: TrustType) -> Self {
        Self {
            target_domain_name: name.into(),
            target_domain_sid: None,
            trust_type,
        }
    }
}

/// Result of a reachability probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    /// Whether the directory answered.
    pub ok: bool,
    /// Probe message; carries the failure reason when `ok` is false.
    pub message: String,
}

impl ConnectionStatus {
    /// A successful probe.
    #[must_use]
    pub fn connected() -> Self {
        Self {
            ok: true,
            message: String::new(),
        }
    }

    /// A failed probe with a reason.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Access to the directory service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectoryAccess: Send + Sync {
    /// Resolves the domain the current machine belongs to.
    async fn resolve_current_domain(&self) -> Result<Domain, ReconError>;

    /// Resolves a domain by name.
    async fn resolve_domain(&self, name: &str) -> Result<Domain, ReconError>;

    /// Performs a lightweight reachability probe against a domain.
    async fn test_connectivity(&self, domain_name: &str) -> ConnectionStatus;

    /// Lazily enumerates the trusts of a domain.
    fn trusts_of(&self, domain_name: &str) -> BoxStream<'static, DomainTrust>;

    /// Lists the domains in the forest of `domain`.
    async fn forest_of(&self, domain: &Domain) -> Result<Vec<Domain>, ReconError>;

    /// Resolves the security identifier of a domain object.
    async fn resolve_security_identifier(&self, domain: &Domain) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trust_constructors() {
        let trust = DomainTrust::new("lab.local", "S-1-5-21-7", TrustType::External);
        assert_eq!(trust.target_domain_sid.as_deref(), Some("S-1-5-21-7"));

        let trust = DomainTrust::unresolved("ghost.local", TrustType::Forest);
        assert!(trust.target_domain_sid.is_none());
    }

    #[test]
    fn test_connection_status() {
        assert!(ConnectionStatus::connected().ok);
        let failed = ConnectionStatus::failed("server unavailable");
        assert!(!failed.ok);
        assert_eq!(failed.message, "server unavailable");
    }

    #[test]
    fn test_trust_type_display() {
        assert_eq!(TrustType::ParentChild.to_string(), "ParentChild");
        assert_eq!(TrustType::default(), TrustType::Unknown);
    }
}
