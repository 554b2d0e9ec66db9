//! Enumeration targets.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// A domain selected for enumeration.
///
/// Identity is the domain SID, compared case-insensitively. The name is
/// informational only.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnumerationDomain {
    name: String,
    domain_sid: String,
}

impl EnumerationDomain {
    /// SID placeholder for a domain whose identifier could not be resolved.
    pub const UNKNOWN_SID: &'static str = "Unknown";

    /// Creates a new enumeration domain.
    #[must_use]
    pub fn new(name: impl Into<String>, domain_sid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain_sid: domain_sid.into(),
        }
    }

    /// Creates an entry for a domain whose SID is unknown.
    #[must_use]
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self::new(name, Self::UNKNOWN_SID)
    }

    /// Returns the domain name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the domain SID.
    #[must_use]
    pub fn domain_sid(&self) -> &str {
        &self.domain_sid
    }

    /// Returns true if the SID is the unknown placeholder.
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        self.domain_sid == Self::UNKNOWN_SID
    }

    /// Returns the SID with ASCII letters uppercased, matching equality.
    #[must_use]
    pub fn identity_key(&self) -> String {
        self.domain_sid.to_ascii_uppercase()
    }
}

impl PartialEq for EnumerationDomain {
    fn eq(&self, other: &Self) -> bool {
        self.domain_sid.eq_ignore_ascii_case(&other.domain_sid)
    }
}

impl Hash for EnumerationDomain {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity_key().hash(state);
    }
}

/// Collapses a list to one entry per SID, keeping the first occurrence.
#[must_use]
pub fn dedup_by_sid(domains: Vec<EnumerationDomain>) -> Vec<EnumerationDomain> {
    let mut seen = HashSet::with_capacity(domains.len());
    domains
        .into_iter()
        .filter(|domain| seen.insert(domain.identity_key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_identity_is_case_insensitive_sid() {
        let a = EnumerationDomain::new("CORP.LOCAL", "S-1-5-21-1");
        let b = EnumerationDomain::new("corp", "s-1-5-21-1");
        let c = EnumerationDomain::new("CORP.LOCAL", "S-1-5-21-2");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_unresolved() {
        let domain = EnumerationDomain::unresolved("lab.local");
        assert!(domain.is_unresolved());
        assert_eq!(domain.domain_sid(), "Unknown");
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let domains = vec![
            EnumerationDomain::new("A", "S-1"),
            EnumerationDomain::new("B", "S-2"),
            EnumerationDomain::new("A-ALIAS", "s-1"),
            EnumerationDomain::new("C", "S-3"),
            EnumerationDomain::new("B-ALIAS", "S-2"),
        ];
        let names: Vec<_> = dedup_by_sid(domains)
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_dedup_agrees_with_equality_on_non_ascii_sids() {
        let sharp = EnumerationDomain::new("A", "S-1-\u{df}");
        let double_s = EnumerationDomain::new("B", "S-1-SS");
        let lower = EnumerationDomain::new("C", "s-1-\u{df}");

        assert_ne!(sharp, double_s);
        assert_eq!(sharp, lower);

        let names: Vec<_> = dedup_by_sid(vec![sharp, double_s, lower])
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_serialize_pascal_case() {
        let domain = EnumerationDomain::new("CORP.LOCAL", "S-1-5-21-9");
        let json = serde_json::to_value(&domain).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"Name": "CORP.LOCAL", "DomainSid": "S-1-5-21-9"})
        );
    }
}
