//! Run options.
//!
//! [`RunOptions`] is what a caller hands to a run: target domain, credential
//! presence, looping, discovery mode and output/cache locations. It can be
//! built fluently or loaded from JSON.

use crate::core::{resolve_collection_methods, CollectionMethod, CollectionMethodOption};
use crate::errors::ReconError;
use chrono::Local;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Extension used for persisted cache files.
pub const CACHE_EXTENSION: &str = "bin";

/// Options for a single reconnaissance run.
#[derive(Clone, Serialize, Deserialize)]
pub struct RunOptions {
    /// Target domain. Resolved from the current machine when empty.
    #[serde(default)]
    pub domain: Option<String>,
    /// LDAP username. Must be paired with a password.
    #[serde(default)]
    pub ldap_username: Option<String>,
    /// LDAP password. Must be paired with a username.
    #[serde(default)]
    pub ldap_password: Option<String>,
    /// User name to use for session collection instead of the process identity.
    #[serde(default)]
    pub override_user_name: Option<String>,
    /// Selected collection methods. Empty means the default set.
    #[serde(default)]
    pub collection_methods: Vec<CollectionMethodOption>,
    /// Whether to keep collecting in a loop after the first run.
    #[serde(default)]
    pub loop_enabled: bool,
    /// Total loop duration in seconds (0 means the default of two hours).
    #[serde(default)]
    pub loop_duration_secs: u64,
    /// Pause between loop cycles in seconds (0 means the default of 30 seconds).
    #[serde(default)]
    pub loop_interval_secs: u64,
    /// Enumerate every domain in the forest.
    #[serde(default)]
    pub search_forest: bool,
    /// Walk domain trusts recursively.
    #[serde(default)]
    pub recurse_domains: bool,
    /// Disable file output.
    #[serde(default)]
    pub no_output: bool,
    /// Keep the cache in memory only.
    #[serde(default)]
    pub mem_cache: bool,
    /// Directory for output and cache files.
    #[serde(default = "default_output_directory")]
    pub output_directory: PathBuf,
    /// Prefix applied to every output file name.
    #[serde(default)]
    pub output_prefix: Option<String>,
    /// Explicit cache file name.
    #[serde(default)]
    pub cache_file_name: Option<String>,
    /// Replace output file names with random ones.
    #[serde(default)]
    pub randomize_filenames: bool,
}

fn default_output_directory() -> PathBuf {
    PathBuf::from(".")
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            domain: None,
            ldap_username: None,
            ldap_password: None,
            override_user_name: None,
            collection_methods: Vec::new(),
            loop_enabled: false,
            loop_duration_secs: 0,
            loop_interval_secs: 0,
            search_forest: false,
            recurse_domains: false,
            no_output: false,
            mem_cache: false,
            output_directory: default_output_directory(),
            output_prefix: None,
            cache_file_name: None,
            randomize_filenames: false,
        }
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("domain", &self.domain)
            .field("ldap_username", &self.ldap_username)
            .field("has_ldap_password", &self.ldap_password.is_some())
            .field("override_user_name", &self.override_user_name)
            .field("collection_methods", &self.collection_methods)
            .field("loop_enabled", &self.loop_enabled)
            .field("loop_duration_secs", &self.loop_duration_secs)
            .field("loop_interval_secs", &self.loop_interval_secs)
            .field("search_forest", &self.search_forest)
            .field("recurse_domains", &self.recurse_domains)
            .field("no_output", &self.no_output)
            .field("mem_cache", &self.mem_cache)
            .field("output_directory", &self.output_directory)
            .field("output_prefix", &self.output_prefix)
            .field("cache_file_name", &self.cache_file_name)
            .finish_non_exhaustive()
    }
}

impl RunOptions {
    /// Creates options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ReconError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads options from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ReconError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Sets the target domain.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the LDAP username.
    #[must_use]
    pub fn with_ldap_username(mut self, username: impl Into<String>) -> Self {
        self.ldap_username = Some(username.into());
        self
    }

    /// Sets the LDAP password.
    #[must_use]
    pub fn with_ldap_password(mut self, password: impl Into<String>) -> Self {
        self.ldap_password = Some(password.into());
        self
    }

    /// Sets the session user name override.
    #[must_use]
    pub fn with_override_user_name(mut self, name: impl Into<String>) -> Self {
        self.override_user_name = Some(name.into());
        self
    }

    /// Sets the collection methods.
    #[must_use]
    pub fn with_collection_methods(mut self, methods: Vec<CollectionMethodOption>) -> Self {
        self.collection_methods = methods;
        self
    }

    /// Enables looping with the given duration and interval.
    ///
    /// Zero values are replaced with defaults when the run initializes.
    #[must_use]
    pub fn with_loop(mut self, duration: Duration, interval: Duration) -> Self {
        self.loop_enabled = true;
        self.loop_duration_secs = duration.as_secs();
        self.loop_interval_secs = interval.as_secs();
        self
    }

    /// Enables forest-wide enumeration.
    #[must_use]
    pub fn with_search_forest(mut self) -> Self {
        self.search_forest = true;
        self
    }

    /// Enables recursive trust enumeration.
    #[must_use]
    pub fn with_recurse_domains(mut self) -> Self {
        self.recurse_domains = true;
        self
    }

    /// Disables file output.
    #[must_use]
    pub fn with_no_output(mut self) -> Self {
        self.no_output = true;
        self
    }

    /// Keeps the cache in memory only.
    #[must_use]
    pub fn with_mem_cache(mut self) -> Self {
        self.mem_cache = true;
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn with_output_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_directory = dir.into();
        self
    }

    /// Sets the output file prefix.
    #[must_use]
    pub fn with_output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.output_prefix = Some(prefix.into());
        self
    }

    /// Sets an explicit cache file name.
    #[must_use]
    pub fn with_cache_file_name(mut self, name: impl Into<String>) -> Self {
        self.cache_file_name = Some(name.into());
        self
    }

    /// Returns true if username and password are both set or both unset.
    #[must_use]
    pub fn has_consistent_credentials(&self) -> bool {
        self.ldap_username.is_some() == self.ldap_password.is_some()
    }

    /// Resolves the configured collection methods into flags.
    #[must_use]
    pub fn resolved_collection_methods(&self) -> CollectionMethod {
        resolve_collection_methods(&self.collection_methods)
    }

    /// Returns the configured loop duration.
    #[must_use]
    pub fn loop_duration(&self) -> Duration {
        Duration::from_secs(self.loop_duration_secs)
    }

    /// Returns the configured loop interval.
    #[must_use]
    pub fn loop_interval(&self) -> Duration {
        Duration::from_secs(self.loop_interval_secs)
    }

    /// Builds the full path of an output file.
    ///
    /// The extension is appended unless the name already carries it. JSON
    /// and zip outputs get a random name when randomization is enabled. An
    /// optional timestamp and the configured prefix are prepended.
    #[must_use]
    pub fn resolve_file_name(&self, name: &str, extension: &str, add_timestamp: bool) -> PathBuf {
        let mut file_name = if extension.is_empty() || name.ends_with(&format!(".{extension}")) {
            name.to_string()
        } else {
            format!("{name}.{extension}")
        };

        if self.randomize_filenames && matches!(extension, "json" | "zip") {
            file_name = format!("{}.{extension}", random_file_stem());
        }

        if add_timestamp {
            file_name = format!("{}_{file_name}", Local::now().format("%Y%m%d%H%M%S"));
        }

        if let Some(prefix) = self.output_prefix.as_deref().filter(|p| !p.is_empty()) {
            file_name = format!("{prefix}_{file_name}");
        }

        self.output_directory.join(file_name)
    }

    /// Returns the cache file path for the given domain.
    ///
    /// Uses the explicit cache file name when set, otherwise a name derived
    /// from a hash of the uppercased domain.
    #[must_use]
    pub fn cache_path(&self, domain: Option<&str>) -> PathBuf {
        if let Some(name) = self.cache_file_name.as_deref().filter(|n| !n.is_empty()) {
            return self.output_directory.join(name);
        }
        let key = domain.unwrap_or("default").to_uppercase();
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        self.resolve_file_name(&digest[..16], CACHE_EXTENSION, false)
    }
}

/// Generates a random 8.3-style file name.
#[must_use]
pub fn random_file_name() -> String {
    let ext: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(3)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    format!("{}.{ext}", random_file_stem())
}

fn random_file_stem() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let options = RunOptions::new();
        assert!(options.domain.is_none());
        assert!(!options.loop_enabled);
        assert_eq!(options.output_directory, PathBuf::from("."));
        assert_eq!(options.resolved_collection_methods(), CollectionMethod::DEFAULT);
    }

    #[test]
    fn test_credentials_consistency() {
        assert!(RunOptions::new().has_consistent_credentials());
        assert!(RunOptions::new()
            .with_ldap_username("svc")
            .with_ldap_password("pw")
            .has_consistent_credentials());
        assert!(!RunOptions::new()
            .with_ldap_username("svc")
            .has_consistent_credentials());
        assert!(!RunOptions::new()
            .with_ldap_password("pw")
            .has_consistent_credentials());
    }

    #[test]
    fn test_debug_redacts_password() {
        let options = RunOptions::new()
            .with_ldap_username("svc")
            .with_ldap_password("hunter2");
        let rendered = format!("{options:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("has_ldap_password: true"));
    }

    #[test]
    fn test_from_json_str() {
        let options = RunOptions::from_json_str(
            r#"{
                "domain": "corp.local",
                "collection_methods": ["DCOnly", "session"],
                "loop_enabled": true,
                "loop_duration_secs": 600,
                "recurse_domains": true
            }"#,
        )
        .unwrap();

        assert_eq!(options.domain.as_deref(), Some("corp.local"));
        assert!(options.loop_enabled);
        assert_eq!(options.loop_duration(), Duration::from_secs(600));
        assert_eq!(options.loop_interval(), Duration::ZERO);
        assert!(options.recurse_domains);
        assert_eq!(
            options.resolved_collection_methods(),
            CollectionMethod::DC_ONLY | CollectionMethod::SESSION
        );
    }

    #[test]
    fn test_from_json_rejects_unknown_method() {
        let result = RunOptions::from_json_str(r#"{"collection_methods": ["Bogus"]}"#);
        assert!(matches!(result, Err(ReconError::Serialization(_))));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(&path, r#"{"search_forest": true, "no_output": true}"#).unwrap();

        let options = RunOptions::from_json_file(&path).unwrap();
        assert!(options.search_forest);
        assert!(options.no_output);
    }

    #[test]
    fn test_resolve_file_name() {
        let options = RunOptions::new().with_output_directory("/out");
        assert_eq!(
            options.resolve_file_name("computers", "json", false),
            PathBuf::from("/out/computers.json")
        );
        assert_eq!(
            options.resolve_file_name("computers.json", "json", false),
            PathBuf::from("/out/computers.json")
        );
        assert_eq!(
            options.resolve_file_name("probe.tmp", "", false),
            PathBuf::from("/out/probe.tmp")
        );
    }

    #[test]
    fn test_resolve_file_name_with_prefix_and_timestamp() {
        let options = RunOptions::new()
            .with_output_directory("/out")
            .with_output_prefix("acme");
        let path = options.resolve_file_name("users", "json", true);
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("acme_"));
        assert!(name.ends_with("_users.json"));
        // acme_ + 14-digit timestamp + _users.json
        assert_eq!(name.len(), "acme_".len() + 14 + "_users.json".len());
    }

    #[test]
    fn test_randomized_file_name() {
        let mut options = RunOptions::new().with_output_directory("/out");
        options.randomize_filenames = true;
        let path = options.resolve_file_name("users", "json", false);
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(!name.contains("users"));
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn test_cache_path_is_stable_per_domain() {
        let options = RunOptions::new().with_output_directory("/cache");
        let a = options.cache_path(Some("corp.local"));
        let b = options.cache_path(Some("CORP.LOCAL"));
        let c = options.cache_path(Some("lab.local"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.extension().unwrap(), "bin");
        assert!(a.starts_with("/cache"));
    }

    #[test]
    fn test_cache_path_explicit_name() {
        let options = RunOptions::new()
            .with_output_directory("/cache")
            .with_cache_file_name("shared.bin");
        assert_eq!(
            options.cache_path(Some("corp.local")),
            PathBuf::from("/cache/shared.bin")
        );
    }

    #[test]
    fn test_random_file_name_shape() {
        let name = random_file_name();
        let (stem, ext) = name.split_once('.').unwrap();
        assert_eq!(stem.len(), 8);
        assert_eq!(ext.len(), 3);
        assert_ne!(random_file_name(), random_file_name());
    }
}
