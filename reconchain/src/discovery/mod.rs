//! Domain discovery.
//!
//! Produces the ordered list of domains a run enumerates. Three modes are
//! supported, picked from the run flags in priority order:
//!
//! - **Recurse**: breadth-first walk of the trust graph from the current domain
//! - **Forest**: every domain of the configured domain's forest
//! - **Single**: only the configured (or current) domain

use crate::context::RunFlags;
use crate::core::{dedup_by_sid, EnumerationDomain};
use crate::directory::{DirectoryAccess, Domain};
use crate::errors::ReconError;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// How the domain list is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    /// Walk trusts recursively from the current domain.
    Recurse,
    /// Enumerate the forest of the configured domain.
    Forest,
    /// Enumerate the configured domain only.
    Single,
}

impl DiscoveryMode {
    /// Picks the mode from the run flags. Recursion wins over forest search.
    #[must_use]
    pub fn from_flags(flags: &RunFlags) -> Self {
        if flags.recurse_domains {
            Self::Recurse
        } else if flags.search_forest {
            Self::Forest
        } else {
            Self::Single
        }
    }

    /// Returns true for the modes that cross domain boundaries.
    #[must_use]
    pub fn is_cross_domain(&self) -> bool {
        !matches!(self, Self::Single)
    }
}

impl fmt::Display for DiscoveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recurse => write!(f, "RecurseDomains"),
            Self::Forest => write!(f, "SearchForest"),
            Self::Single => write!(f, "SingleDomain"),
        }
    }
}

/// Builds enumeration targets from the directory.
#[derive(Clone)]
pub struct TrustDiscovery {
    directory: Arc<dyn DirectoryAccess>,
}

impl fmt::Debug for TrustDiscovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustDiscovery").finish_non_exhaustive()
    }
}

impl TrustDiscovery {
    /// Creates a discovery over the given directory.
    #[must_use]
    pub fn new(directory: Arc<dyn DirectoryAccess>) -> Self {
        Self { directory }
    }

    /// Runs discovery in the given mode.
    ///
    /// `domain_name` is the configured domain; the current domain is used
    /// when it is absent. Recursion always starts from the current domain.
    pub async fn discover(
        &self,
        mode: DiscoveryMode,
        domain_name: Option<&str>,
    ) -> Result<Vec<EnumerationDomain>, ReconError> {
        match mode {
            DiscoveryMode::Recurse => self.recursive_domains().await,
            DiscoveryMode::Forest => self.forest_domains(domain_name).await,
            DiscoveryMode::Single => self.single_domain(domain_name).await,
        }
    }

    /// Walks the trust graph breadth-first from the current domain.
    ///
    /// Every trust edge contributes an entry with uppercased name and SID.
    /// Each SID is queued at most once, so cycles terminate. Trusts whose
    /// target SID cannot be resolved are skipped. The result keeps the first
    /// entry seen per SID.
    pub async fn recursive_domains(&self) -> Result<Vec<EnumerationDomain>, ReconError> {
        let start = self
            .directory
            .resolve_current_domain()
            .await
            .map_err(|e| ReconError::resolution(format!("unable to get current domain ({e})")))?;
        let start_sid = self
            .directory
            .resolve_security_identifier(&start)
            .await
            .ok_or_else(|| {
                ReconError::resolution(format!("unable to resolve SID of domain {}", start.name))
            })?;

        let mut results = vec![EnumerationDomain::new(
            start.name.to_uppercase(),
            start_sid.to_uppercase(),
        )];
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(String, String)> = VecDeque::new();

        visited.insert(start_sid.to_uppercase());
        queue.push_back((start_sid, start.name));

        while let Some((domain_sid, domain_name)) = queue.pop_front() {
            trace!(domain = %domain_name, sid = %domain_sid, "Enumerating trusts");
            let mut trusts = self.directory.trusts_of(&domain_name);

            while let Some(trust) = trusts.next().await {
                let Some(target_sid) = trust.target_domain_sid.as_deref() else {
                    debug!(
                        domain = %trust.target_domain_name,
                        "Skipping trusted domain with unresolvable SID"
                    );
                    continue;
                };

                let name = trust.target_domain_name.to_uppercase();
                let sid = target_sid.to_uppercase();
                debug!(
                    name = %name,
                    sid = %sid,
                    trust_type = %trust.trust_type,
                    "Got trusted domain"
                );
                results.push(EnumerationDomain::new(name, sid.clone()));

                if visited.insert(sid) {
                    queue.push_back((target_sid.to_string(), trust.target_domain_name.clone()));
                }
            }
        }

        debug!(visited = visited.len(), edges = results.len(), "Trust walk finished");
        Ok(dedup_by_sid(results))
    }

    /// Lists the SID-resolvable domains of the configured domain's forest.
    pub async fn forest_domains(
        &self,
        domain_name: Option<&str>,
    ) -> Result<Vec<EnumerationDomain>, ReconError> {
        let domain = self.resolve(domain_name).await.map_err(|e| {
            ReconError::resolution(format!("unable to get domain object for forest search ({e})"))
        })?;
        let members = self.directory.forest_of(&domain).await.map_err(|e| {
            ReconError::resolution(format!("unable to get forest object for forest search ({e})"))
        })?;

        let mut domains = Vec::with_capacity(members.len());
        for member in members {
            match self.directory.resolve_security_identifier(&member).await {
                Some(sid) => domains.push(EnumerationDomain::new(member.name, sid)),
                None => debug!(domain = %member.name, "Skipping forest domain with unresolvable SID"),
            }
        }
        Ok(domains)
    }

    /// Returns the configured domain as a single entry.
    ///
    /// The SID falls back to [`EnumerationDomain::UNKNOWN_SID`] when it
    /// cannot be resolved.
    pub async fn single_domain(
        &self,
        domain_name: Option<&str>,
    ) -> Result<Vec<EnumerationDomain>, ReconError> {
        let domain = self.resolve(domain_name).await.map_err(|e| {
            ReconError::resolution(format!(
                "unable to resolve a domain to use, manually specify one or check spelling ({e})"
            ))
        })?;

        let entry = match self.directory.resolve_security_identifier(&domain).await {
            Some(sid) => EnumerationDomain::new(domain.name, sid),
            None => EnumerationDomain::unresolved(domain.name),
        };
        Ok(vec![entry])
    }

    async fn resolve(&self, domain_name: Option<&str>) -> Result<Domain, ReconError> {
        match domain_name.filter(|name| !name.trim().is_empty()) {
            Some(name) => self.directory.resolve_domain(name).await,
            None => self.directory.resolve_current_domain().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{DomainTrust, MockDirectoryAccess, TrustType};
    use crate::testing::FakeDirectory;
    use pretty_assertions::assert_eq;

    fn sids(domains: &[EnumerationDomain]) -> Vec<String> {
        domains.iter().map(|d| d.domain_sid().to_string()).collect()
    }

    fn names(domains: &[EnumerationDomain]) -> Vec<String> {
        domains.iter().map(|d| d.name().to_string()).collect()
    }

    #[test]
    fn test_mode_priority() {
        let mut flags = RunFlags::default();
        assert_eq!(DiscoveryMode::from_flags(&flags), DiscoveryMode::Single);

        flags.search_forest = true;
        assert_eq!(DiscoveryMode::from_flags(&flags), DiscoveryMode::Forest);

        flags.recurse_domains = true;
        assert_eq!(DiscoveryMode::from_flags(&flags), DiscoveryMode::Recurse);
        assert!(DiscoveryMode::Recurse.is_cross_domain());
        assert!(!DiscoveryMode::Single.is_cross_domain());
    }

    #[tokio::test]
    async fn test_recursion_two_domain_cycle() {
        let directory = FakeDirectory::new("a.local")
            .with_domain("a.local", "s-1-5-21-a")
            .with_domain("b.local", "s-1-5-21-b")
            .with_trust("a.local", "b.local", TrustType::External)
            .with_trust("b.local", "a.local", TrustType::External);
        let directory = Arc::new(directory);

        let discovery = TrustDiscovery::new(directory.clone());
        let domains = discovery.recursive_domains().await.unwrap();

        assert_eq!(names(&domains), vec!["A.LOCAL", "B.LOCAL"]);
        assert_eq!(sids(&domains), vec!["S-1-5-21-A", "S-1-5-21-B"]);
        assert_eq!(directory.trust_queries("a.local"), 1);
        assert_eq!(directory.trust_queries("b.local"), 1);
    }

    #[tokio::test]
    async fn test_recursion_visits_each_sid_once() {
        // a -> b, a -> c, b -> c, c -> d, d -> a, d -> b
        let directory = Arc::new(
            FakeDirectory::new("a.local")
                .with_domain("a.local", "S-A")
                .with_domain("b.local", "S-B")
                .with_domain("c.local", "S-C")
                .with_domain("d.local", "S-D")
                .with_trust("a.local", "b.local", TrustType::ParentChild)
                .with_trust("a.local", "c.local", TrustType::ParentChild)
                .with_trust("b.local", "c.local", TrustType::CrossLink)
                .with_trust("c.local", "d.local", TrustType::Forest)
                .with_trust("d.local", "a.local", TrustType::Forest)
                .with_trust("d.local", "b.local", TrustType::External),
        );

        let domains = TrustDiscovery::new(directory.clone())
            .recursive_domains()
            .await
            .unwrap();

        assert_eq!(sids(&domains), vec!["S-A", "S-B", "S-C", "S-D"]);
        for name in ["a.local", "b.local", "c.local", "d.local"] {
            assert_eq!(directory.trust_queries(name), 1, "{name} queried more than once");
        }
    }

    #[tokio::test]
    async fn test_recursion_keeps_first_name_per_sid() {
        let directory = Arc::new(
            FakeDirectory::new("root.local")
                .with_domain("root.local", "S-ROOT")
                .with_domain("child.root.local", "S-CHILD")
                .with_trust("root.local", "child.root.local", TrustType::ParentChild)
                .with_trust_edge(
                    "child.root.local",
                    DomainTrust::new("CHILD-ALIAS", "s-child", TrustType::Unknown),
                ),
        );

        let domains = TrustDiscovery::new(directory)
            .recursive_domains()
            .await
            .unwrap();
        assert_eq!(names(&domains), vec!["ROOT.LOCAL", "CHILD.ROOT.LOCAL"]);
    }

    #[tokio::test]
    async fn test_recursion_skips_unresolvable_trust_sid() {
        let directory = Arc::new(
            FakeDirectory::new("a.local")
                .with_domain("a.local", "S-A")
                .with_domain("c.local", "S-C")
                .with_trust_edge(
                    "a.local",
                    DomainTrust::unresolved("ghost.local", TrustType::External),
                )
                .with_trust("a.local", "c.local", TrustType::External),
        );

        let domains = TrustDiscovery::new(directory.clone())
            .recursive_domains()
            .await
            .unwrap();
        assert_eq!(sids(&domains), vec!["S-A", "S-C"]);
        assert_eq!(directory.trust_queries("ghost.local"), 0);
    }

    #[tokio::test]
    async fn test_recursion_fails_without_current_domain() {
        let directory = Arc::new(FakeDirectory::without_current_domain());
        let result = TrustDiscovery::new(directory).recursive_domains().await;
        assert!(matches!(result, Err(ReconError::Resolution(_))));
    }

    #[tokio::test]
    async fn test_forest_skips_unresolvable_members() {
        let directory = Arc::new(
            FakeDirectory::new("corp.local")
                .with_domain("corp.local", "S-CORP")
                .with_domain("emea.corp.local", "S-EMEA")
                .with_unresolvable_domain("legacy.corp.local")
                .with_domain("apac.corp.local", "S-APAC")
                .with_forest(
                    "corp.local",
                    &["corp.local", "emea.corp.local", "legacy.corp.local", "apac.corp.local"],
                ),
        );

        let domains = TrustDiscovery::new(directory)
            .forest_domains(Some("corp.local"))
            .await
            .unwrap();

        assert_eq!(
            names(&domains),
            vec!["corp.local", "emea.corp.local", "apac.corp.local"]
        );
        assert_eq!(sids(&domains), vec!["S-CORP", "S-EMEA", "S-APAC"]);
    }

    #[tokio::test]
    async fn test_forest_fails_when_forest_unavailable() {
        let directory = Arc::new(FakeDirectory::new("corp.local").with_domain("corp.local", "S-CORP"));
        let result = TrustDiscovery::new(directory)
            .forest_domains(Some("corp.local"))
            .await;
        assert!(matches!(result, Err(ReconError::Resolution(_))));
    }

    #[tokio::test]
    async fn test_single_domain_resolved_sid() {
        let directory = Arc::new(FakeDirectory::new("corp.local").with_domain("corp.local", "S-CORP"));
        let domains = TrustDiscovery::new(directory)
            .single_domain(Some("corp.local"))
            .await
            .unwrap();
        assert_eq!(domains, vec![EnumerationDomain::new("corp.local", "S-CORP")]);
    }

    #[tokio::test]
    async fn test_single_domain_unknown_sid() {
        let directory = Arc::new(
            FakeDirectory::new("corp.local").with_unresolvable_domain("corp.local"),
        );
        let domains = TrustDiscovery::new(directory)
            .single_domain(None)
            .await
            .unwrap();
        assert_eq!(domains.len(), 1);
        assert_eq!(domains[0].name(), "corp.local");
        assert_eq!(domains[0].domain_sid(), EnumerationDomain::UNKNOWN_SID);
    }

    #[tokio::test]
    async fn test_single_domain_unresolvable_domain_fails() {
        let mut directory = MockDirectoryAccess::new();
        directory
            .expect_resolve_domain()
            .withf(|name| name == "typo.local")
            .returning(|name| Err(ReconError::resolution(format!("{name} not found"))));
        directory.expect_resolve_security_identifier().never();

        let result = TrustDiscovery::new(Arc::new(directory))
            .single_domain(Some("typo.local"))
            .await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("typo.local not found"));
    }

    #[tokio::test]
    async fn test_discover_dispatches_on_mode() {
        let directory = Arc::new(
            FakeDirectory::new("a.local")
                .with_domain("a.local", "S-A")
                .with_domain("b.local", "S-B")
                .with_trust("a.local", "b.local", TrustType::External),
        );
        let discovery = TrustDiscovery::new(directory);

        let single = discovery.discover(DiscoveryMode::Single, None).await.unwrap();
        assert_eq!(single.len(), 1);

        let recursive = discovery.discover(DiscoveryMode::Recurse, None).await.unwrap();
        assert_eq!(recursive.len(), 2);
    }
}
