//! In-memory directory fake.

use crate::directory::{ConnectionStatus, DirectoryAccess, Domain, DomainTrust, TrustType};
use crate::errors::ReconError;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Clone)]
enum TrustEdge {
    /// SID looked up from the registered domains when queried.
    Named { target: String, trust_type: TrustType },
    /// Returned as given.
    Explicit(DomainTrust),
}

/// A directory backed by in-memory tables.
///
/// Domain names are matched case-insensitively. Every trust query and
/// connectivity probe is counted.
#[derive(Debug, Default)]
pub struct FakeDirectory {
    current: Option<String>,
    domains: HashMap<String, (String, Option<String>)>,
    trusts: HashMap<String, Vec<TrustEdge>>,
    forests: HashMap<String, Vec<String>>,
    connectivity_failure: Option<String>,
    trust_queries: Mutex<HashMap<String, usize>>,
    probes: Mutex<Vec<String>>,
}

impl FakeDirectory {
    /// Creates a directory whose current domain is `current`.
    #[must_use]
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            current: Some(current.into()),
            ..Self::default()
        }
    }

    /// Creates a directory where the current domain cannot be resolved.
    #[must_use]
    pub fn without_current_domain() -> Self {
        Self::default()
    }

    /// Registers a domain with a resolvable SID.
    #[must_use]
    pub fn with_domain(mut self, name: impl Into<String>, sid: impl Into<String>) -> Self {
        let name = name.into();
        self.domains
            .insert(name.to_lowercase(), (name, Some(sid.into())));
        self
    }

    /// Registers a domain whose SID cannot be resolved.
    #[must_use]
    pub fn with_unresolvable_domain(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.domains.insert(name.to_lowercase(), (name, None));
        self
    }

    /// Adds a trust from `from` to `to`, reporting the SID registered for `to`.
    #[must_use]
    pub fn with_trust(mut self, from: &str, to: impl Into<String>, trust_type: TrustType) -> Self {
        self.trusts
            .entry(from.to_lowercase())
            .or_default()
            .push(TrustEdge::Named {
                target: to.into(),
                trust_type,
            });
        self
    }

    /// Adds a trust returned exactly as given.
    #[must_use]
    pub fn with_trust_edge(mut self, from: &str, trust: DomainTrust) -> Self {
        self.trusts
            .entry(from.to_lowercase())
            .or_default()
            .push(TrustEdge::Explicit(trust));
        self
    }

    /// Declares the forest containing `domain`.
    #[must_use]
    pub fn with_forest(mut self, domain: &str, members: &[&str]) -> Self {
        self.forests.insert(
            domain.to_lowercase(),
            members.iter().map(|m| (*m).to_string()).collect(),
        );
        self
    }

    /// Makes every connectivity probe fail with `message`.
    #[must_use]
    pub fn with_connectivity_failure(mut self, message: impl Into<String>) -> Self {
        self.connectivity_failure = Some(message.into());
        self
    }

    /// Number of trust queries made for a domain.
    #[must_use]
    pub fn trust_queries(&self, domain_name: &str) -> usize {
        self.trust_queries
            .lock()
            .get(&domain_name.to_lowercase())
            .copied()
            .unwrap_or(0)
    }

    /// Domains passed to connectivity probes, in order.
    #[must_use]
    pub fn probes(&self) -> Vec<String> {
        self.probes.lock().clone()
    }

    fn sid_of(&self, name: &str) -> Option<String> {
        self.domains
            .get(&name.to_lowercase())
            .and_then(|(_, sid)| sid.clone())
    }
}

#[async_trait]
impl DirectoryAccess for FakeDirectory {
    async fn resolve_current_domain(&self) -> Result<Domain, ReconError> {
        self.current
            .as_deref()
            .map(Domain::new)
            .ok_or_else(|| ReconError::resolution("current domain is not available"))
    }

    async fn resolve_domain(&self, name: &str) -> Result<Domain, ReconError> {
        self.domains
            .get(&name.to_lowercase())
            .map(|(canonical, _)| Domain::new(canonical.clone()))
            .ok_or_else(|| ReconError::resolution(format!("domain {name} not found")))
    }

    async fn test_connectivity(&self, domain_name: &str) -> ConnectionStatus {
        self.probes.lock().push(domain_name.to_string());
        match &self.connectivity_failure {
            Some(message) => ConnectionStatus::failed(message.clone()),
            None => ConnectionStatus::connected(),
        }
    }

    fn trusts_of(&self, domain_name: &str) -> BoxStream<'static, DomainTrust> {
        *self
            .trust_queries
            .lock()
            .entry(domain_name.to_lowercase())
            .or_insert(0) += 1;

        let trusts: Vec<DomainTrust> = self
            .trusts
            .get(&domain_name.to_lowercase())
            .map(|edges| {
                edges
                    .iter()
                    .map(|edge| match edge {
                        TrustEdge::Named { target, trust_type } => match self.sid_of(target) {
                            Some(sid) => DomainTrust::new(target.clone(), sid, *trust_type),
                            None => DomainTrust::unresolved(target.clone(), *trust_type),
                        },
                        TrustEdge::Explicit(trust) => trust.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        stream::iter(trusts).boxed()
    }

    async fn forest_of(&self, domain: &Domain) -> Result<Vec<Domain>, ReconError> {
        self.forests
            .get(&domain.name.to_lowercase())
            .map(|members| members.iter().map(Domain::new).collect())
            .ok_or_else(|| ReconError::resolution(format!("no forest known for {}", domain.name)))
    }

    async fn resolve_security_identifier(&self, domain: &Domain) -> Option<String> {
        self.sid_of(&domain.name)
    }
}
