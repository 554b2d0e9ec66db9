//! Collection method flags and option resolution.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::str::FromStr;

/// A flag-combinable set of collection methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionMethod(u32);

impl CollectionMethod {
    /// No collection.
    pub const NONE: Self = Self(0);
    /// Group memberships.
    pub const GROUP: Self = Self(1 << 0);
    /// Network sessions.
    pub const SESSION: Self = Self(1 << 1);
    /// Privileged logged-on users.
    pub const LOGGED_ON: Self = Self(1 << 2);
    /// Domain trusts.
    pub const TRUSTS: Self = Self(1 << 3);
    /// Access control lists.
    pub const ACL: Self = Self(1 << 4);
    /// Object properties.
    pub const OBJECT_PROPS: Self = Self(1 << 5);
    /// Remote Desktop Users group.
    pub const RDP: Self = Self(1 << 6);
    /// Distributed COM Users group.
    pub const DCOM: Self = Self(1 << 7);
    /// Local Administrators group.
    pub const LOCAL_ADMIN: Self = Self(1 << 8);
    /// Remote Management Users group.
    pub const PS_REMOTE: Self = Self(1 << 9);
    /// Service principal name targets.
    pub const SPN_TARGETS: Self = Self(1 << 10);
    /// Containers and OUs.
    pub const CONTAINER: Self = Self(1 << 11);
    /// Local groups derived from group policy.
    pub const GPO_LOCAL_GROUP: Self = Self(1 << 12);
    /// User rights assignments.
    pub const USER_RIGHTS: Self = Self(1 << 13);
    /// Certificate authority registry values.
    pub const CA_REGISTRY: Self = Self(1 << 14);
    /// Domain controller registry values.
    pub const DC_REGISTRY: Self = Self(1 << 15);
    /// Certificate services objects.
    pub const CERT_SERVICES: Self = Self(1 << 16);
    /// WebClient service status.
    pub const WEB_CLIENT_SERVICE: Self = Self(1 << 17);
    /// LDAP signing and channel binding.
    pub const LDAP_SERVICES: Self = Self(1 << 18);
    /// SMB signing information.
    pub const SMB_INFO: Self = Self(1 << 19);
    /// NTLM registry values.
    pub const NTLM_REGISTRY: Self = Self(1 << 20);

    /// All local group collections.
    pub const LOCAL_GROUP: Self =
        Self(Self::DCOM.0 | Self::RDP.0 | Self::LOCAL_ADMIN.0 | Self::PS_REMOTE.0);

    /// Everything collected by contacting computers directly.
    pub const COMPUTER_ONLY: Self = Self(
        Self::LOCAL_GROUP.0
            | Self::SESSION.0
            | Self::USER_RIGHTS.0
            | Self::CA_REGISTRY.0
            | Self::DC_REGISTRY.0
            | Self::WEB_CLIENT_SERVICE.0
            | Self::SMB_INFO.0
            | Self::NTLM_REGISTRY.0,
    );

    /// Everything collected from domain controllers only.
    pub const DC_ONLY: Self = Self(
        Self::ACL.0
            | Self::CONTAINER.0
            | Self::GROUP.0
            | Self::OBJECT_PROPS.0
            | Self::TRUSTS.0
            | Self::GPO_LOCAL_GROUP.0
            | Self::CERT_SERVICES.0
            | Self::LDAP_SERVICES.0,
    );

    /// The default collection set.
    pub const DEFAULT: Self = Self(
        Self::GROUP.0
            | Self::SESSION.0
            | Self::TRUSTS.0
            | Self::ACL.0
            | Self::OBJECT_PROPS.0
            | Self::LOCAL_GROUP.0
            | Self::SPN_TARGETS.0
            | Self::CONTAINER.0
            | Self::CERT_SERVICES.0
            | Self::LDAP_SERVICES.0
            | Self::SMB_INFO.0,
    );

    /// Every collection method.
    pub const ALL: Self = Self(
        Self::DEFAULT.0
            | Self::LOGGED_ON.0
            | Self::GPO_LOCAL_GROUP.0
            | Self::USER_RIGHTS.0
            | Self::CA_REGISTRY.0
            | Self::DC_REGISTRY.0
            | Self::WEB_CLIENT_SERVICE.0
            | Self::NTLM_REGISTRY.0,
    );

    /// Methods that are safe to repeat on every loop cycle.
    pub const LOOP_SAFE: Self = Self(
        Self::SESSION.0 | Self::LOGGED_ON.0 | Self::LOCAL_GROUP.0 | Self::USER_RIGHTS.0,
    );

    const NAMED: [(Self, &'static str); 21] = [
        (Self::GROUP, "Group"),
        (Self::SESSION, "Session"),
        (Self::LOGGED_ON, "LoggedOn"),
        (Self::TRUSTS, "Trusts"),
        (Self::ACL, "ACL"),
        (Self::OBJECT_PROPS, "ObjectProps"),
        (Self::RDP, "RDP"),
        (Self::DCOM, "DCOM"),
        (Self::LOCAL_ADMIN, "LocalAdmin"),
        (Self::PS_REMOTE, "PSRemote"),
        (Self::SPN_TARGETS, "SPNTargets"),
        (Self::CONTAINER, "Container"),
        (Self::GPO_LOCAL_GROUP, "GPOLocalGroup"),
        (Self::USER_RIGHTS, "UserRights"),
        (Self::CA_REGISTRY, "CARegistry"),
        (Self::DC_REGISTRY, "DCRegistry"),
        (Self::CERT_SERVICES, "CertServices"),
        (Self::WEB_CLIENT_SERVICE, "WebClientService"),
        (Self::LDAP_SERVICES, "LdapServices"),
        (Self::SMB_INFO, "SmbInfo"),
        (Self::NTLM_REGISTRY, "NTLMRegistry"),
    ];

    /// Returns the raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if no method is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true if every method in `other` is also set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if any method in `other` is set in `self`.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Narrows the set to the methods that can be repeated in loop mode.
    ///
    /// Falls back to session collection when nothing loop-safe is selected.
    #[must_use]
    pub fn loop_methods(self) -> Self {
        let narrowed = self & Self::LOOP_SAFE;
        if narrowed.is_empty() {
            Self::SESSION
        } else {
            narrowed
        }
    }

    /// Returns the names of the individual methods that are set.
    #[must_use]
    pub fn individual_flags(self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl BitOr for CollectionMethod {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CollectionMethod {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for CollectionMethod {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for CollectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "None");
        }
        write!(f, "{}", self.individual_flags().join(", "))
    }
}

/// A collection method as named in run options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CollectionMethodOption {
    /// Collects nothing on its own.
    None,
    /// See [`CollectionMethod::GROUP`].
    Group,
    /// See [`CollectionMethod::SESSION`].
    Session,
    /// See [`CollectionMethod::LOGGED_ON`].
    LoggedOn,
    /// See [`CollectionMethod::TRUSTS`].
    Trusts,
    /// See [`CollectionMethod::ACL`].
    Acl,
    /// See [`CollectionMethod::OBJECT_PROPS`].
    ObjectProps,
    /// See [`CollectionMethod::RDP`].
    Rdp,
    /// See [`CollectionMethod::DCOM`].
    Dcom,
    /// See [`CollectionMethod::LOCAL_ADMIN`].
    LocalAdmin,
    /// See [`CollectionMethod::PS_REMOTE`].
    PsRemote,
    /// See [`CollectionMethod::SPN_TARGETS`].
    SpnTargets,
    /// See [`CollectionMethod::CONTAINER`].
    Container,
    /// See [`CollectionMethod::GPO_LOCAL_GROUP`].
    GpoLocalGroup,
    /// See [`CollectionMethod::LOCAL_GROUP`].
    LocalGroup,
    /// See [`CollectionMethod::USER_RIGHTS`].
    UserRights,
    /// See [`CollectionMethod::DEFAULT`].
    Default,
    /// See [`CollectionMethod::DC_ONLY`].
    DcOnly,
    /// See [`CollectionMethod::COMPUTER_ONLY`].
    ComputerOnly,
    /// See [`CollectionMethod::CA_REGISTRY`].
    CaRegistry,
    /// See [`CollectionMethod::DC_REGISTRY`].
    DcRegistry,
    /// See [`CollectionMethod::CERT_SERVICES`].
    CertServices,
    /// See [`CollectionMethod::WEB_CLIENT_SERVICE`].
    WebClientService,
    /// See [`CollectionMethod::LDAP_SERVICES`].
    LdapServices,
    /// See [`CollectionMethod::SMB_INFO`].
    SmbInfo,
    /// See [`CollectionMethod::NTLM_REGISTRY`].
    NtlmRegistry,
    /// See [`CollectionMethod::ALL`].
    All,
}

impl CollectionMethodOption {
    const ALL_OPTIONS: [Self; 27] = [
        Self::None,
        Self::Group,
        Self::Session,
        Self::LoggedOn,
        Self::Trusts,
        Self::Acl,
        Self::ObjectProps,
        Self::Rdp,
        Self::Dcom,
        Self::LocalAdmin,
        Self::PsRemote,
        Self::SpnTargets,
        Self::Container,
        Self::GpoLocalGroup,
        Self::LocalGroup,
        Self::UserRights,
        Self::Default,
        Self::DcOnly,
        Self::ComputerOnly,
        Self::CaRegistry,
        Self::DcRegistry,
        Self::CertServices,
        Self::WebClientService,
        Self::LdapServices,
        Self::SmbInfo,
        Self::NtlmRegistry,
        Self::All,
    ];

    /// Returns the canonical option name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Group => "Group",
            Self::Session => "Session",
            Self::LoggedOn => "LoggedOn",
            Self::Trusts => "Trusts",
            Self::Acl => "ACL",
            Self::ObjectProps => "ObjectProps",
            Self::Rdp => "RDP",
            Self::Dcom => "DCOM",
            Self::LocalAdmin => "LocalAdmin",
            Self::PsRemote => "PSRemote",
            Self::SpnTargets => "SPNTargets",
            Self::Container => "Container",
            Self::GpoLocalGroup => "GPOLocalGroup",
            Self::LocalGroup => "LocalGroup",
            Self::UserRights => "UserRights",
            Self::Default => "Default",
            Self::DcOnly => "DCOnly",
            Self::ComputerOnly => "ComputerOnly",
            Self::CaRegistry => "CARegistry",
            Self::DcRegistry => "DCRegistry",
            Self::CertServices => "CertServices",
            Self::WebClientService => "WebClientService",
            Self::LdapServices => "LdapServices",
            Self::SmbInfo => "SmbInfo",
            Self::NtlmRegistry => "NTLMRegistry",
            Self::All => "All",
        }
    }

    /// Returns the flags this option selects.
    #[must_use]
    pub const fn methods(self) -> CollectionMethod {
        match self {
            Self::None => CollectionMethod::NONE,
            Self::Group => CollectionMethod::GROUP,
            Self::Session => CollectionMethod::SESSION,
            Self::LoggedOn => CollectionMethod::LOGGED_ON,
            Self::Trusts => CollectionMethod::TRUSTS,
            Self::Acl => CollectionMethod::ACL,
            Self::ObjectProps => CollectionMethod::OBJECT_PROPS,
            Self::Rdp => CollectionMethod::RDP,
            Self::Dcom => CollectionMethod::DCOM,
            Self::LocalAdmin => CollectionMethod::LOCAL_ADMIN,
            Self::PsRemote => CollectionMethod::PS_REMOTE,
            Self::SpnTargets => CollectionMethod::SPN_TARGETS,
            Self::Container => CollectionMethod::CONTAINER,
            Self::GpoLocalGroup => CollectionMethod::GPO_LOCAL_GROUP,
            Self::LocalGroup => CollectionMethod::LOCAL_GROUP,
            Self::UserRights => CollectionMethod::USER_RIGHTS,
            Self::Default => CollectionMethod::DEFAULT,
            Self::DcOnly => CollectionMethod::DC_ONLY,
            Self::ComputerOnly => CollectionMethod::COMPUTER_ONLY,
            Self::CaRegistry => CollectionMethod::CA_REGISTRY,
            Self::DcRegistry => CollectionMethod::DC_REGISTRY,
            Self::CertServices => CollectionMethod::CERT_SERVICES,
            Self::WebClientService => CollectionMethod::WEB_CLIENT_SERVICE,
            Self::LdapServices => CollectionMethod::LDAP_SERVICES,
            Self::SmbInfo => CollectionMethod::SMB_INFO,
            Self::NtlmRegistry => CollectionMethod::NTLM_REGISTRY,
            Self::All => CollectionMethod::ALL,
        }
    }
}

impl fmt::Display for CollectionMethodOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionMethodOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL_OPTIONS
            .iter()
            .copied()
            .find(|option| option.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown collection method: {trimmed}"))
    }
}

impl TryFrom<String> for CollectionMethodOption {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CollectionMethodOption> for String {
    fn from(option: CollectionMethodOption) -> Self {
        option.as_str().to_string()
    }
}

/// Unions the selected options into a single flag set.
///
/// An empty selection resolves to [`CollectionMethod::DEFAULT`].
#[must_use]
pub fn resolve_collection_methods(options: &[CollectionMethodOption]) -> CollectionMethod {
    if options.is_empty() {
        return CollectionMethod::DEFAULT;
    }
    options
        .iter()
        .fold(CollectionMethod::NONE, |acc, option| acc | option.methods())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_local_group_is_composite() {
        let local = CollectionMethod::LOCAL_GROUP;
        assert!(local.contains(CollectionMethod::RDP));
        assert!(local.contains(CollectionMethod::DCOM));
        assert!(local.contains(CollectionMethod::LOCAL_ADMIN));
        assert!(local.contains(CollectionMethod::PS_REMOTE));
        assert!(!local.contains(CollectionMethod::SESSION));
    }

    #[test]
    fn test_all_contains_every_alias() {
        assert!(CollectionMethod::ALL.contains(CollectionMethod::DEFAULT));
        assert!(CollectionMethod::ALL.contains(CollectionMethod::DC_ONLY));
        assert!(CollectionMethod::ALL.contains(CollectionMethod::COMPUTER_ONLY));
        assert_eq!(CollectionMethod::ALL.individual_flags().len(), 21);
    }

    #[test]
    fn test_loop_methods_narrows() {
        let narrowed = CollectionMethod::DEFAULT.loop_methods();
        assert!(narrowed.contains(CollectionMethod::SESSION));
        assert!(narrowed.contains(CollectionMethod::LOCAL_GROUP));
        assert!(!narrowed.intersects(CollectionMethod::ACL | CollectionMethod::GROUP));
    }

    #[test]
    fn test_loop_methods_fallback() {
        let narrowed = CollectionMethod::DC_ONLY.loop_methods();
        assert_eq!(narrowed, CollectionMethod::SESSION);
    }

    #[test]
    fn test_display() {
        let methods = CollectionMethod::GROUP | CollectionMethod::ACL;
        assert_eq!(methods.to_string(), "Group, ACL");
        assert_eq!(CollectionMethod::NONE.to_string(), "None");
    }

    #[test]
    fn test_option_parse_case_insensitive() {
        assert_eq!(
            "dconly".parse::<CollectionMethodOption>().unwrap(),
            CollectionMethodOption::DcOnly
        );
        assert_eq!(
            " ntlmregistry ".parse::<CollectionMethodOption>().unwrap(),
            CollectionMethodOption::NtlmRegistry
        );
        assert!("eventlogs".parse::<CollectionMethodOption>().is_err());
    }

    #[test]
    fn test_option_serde() {
        let options: Vec<CollectionMethodOption> =
            serde_json::from_str(r#"["acl", "Session"]"#).unwrap();
        assert_eq!(
            options,
            vec![CollectionMethodOption::Acl, CollectionMethodOption::Session]
        );

        let json = serde_json::to_string(&CollectionMethodOption::SpnTargets).unwrap();
        assert_eq!(json, r#""SPNTargets""#);
    }

    #[test]
    fn test_resolve_collection_methods() {
        assert_eq!(resolve_collection_methods(&[]), CollectionMethod::DEFAULT);

        let resolved = resolve_collection_methods(&[
            CollectionMethodOption::Group,
            CollectionMethodOption::LocalGroup,
            CollectionMethodOption::None,
        ]);
        assert_eq!(
            resolved,
            CollectionMethod::GROUP | CollectionMethod::LOCAL_GROUP
        );

        assert_eq!(
            resolve_collection_methods(&[CollectionMethodOption::None]),
            CollectionMethod::NONE
        );
    }
}
