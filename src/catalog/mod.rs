//! Operating system catalog.
//!
//! Maps a distribution family and version to its release codename, and a
//! family to the way Puppet gets packaged for it. The catalog is plain data:
//! build it once with [`OsCatalog::builtin`] and pass it by reference to
//! whatever resolves build contexts.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Directory holding `puppet` and `facter` for puppet-agent installs.
const AIO_BIN_DIR: &str = "/opt/puppetlabs/bin";
/// Directory holding the vendored ruby (`gem`, `r10k`) for puppet-agent installs.
const AIO_RUBY_BIN_DIR: &str = "/opt/puppetlabs/puppet/bin";
/// System binary directory used when Puppet is installed as a gem.
const SYSTEM_BIN_DIR: &str = "/usr/bin";

/// How Puppet gets onto an image of a given family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Packaging {
    /// puppet-agent from apt.puppetlabs.com (Debian, Ubuntu).
    Apt,
    /// puppet-agent from yum.puppetlabs.com (CentOS).
    Yum,
    /// facter and puppet gems on top of the system ruby (Alpine).
    Gem,
    /// Family not in the catalog. The base image has to provide Puppet.
    Unknown,
}

impl Packaging {
    /// Install locations of the Puppet binaries for this packaging scheme.
    ///
    /// Unknown families get the puppet-agent layout.
    pub fn paths(self) -> PuppetPaths {
        match self {
            Packaging::Gem => PuppetPaths {
                puppet: SYSTEM_BIN_DIR,
                gem: SYSTEM_BIN_DIR,
                r10k: SYSTEM_BIN_DIR,
            },
            Packaging::Apt | Packaging::Yum | Packaging::Unknown => PuppetPaths {
                puppet: AIO_BIN_DIR,
                gem: AIO_RUBY_BIN_DIR,
                r10k: AIO_RUBY_BIN_DIR,
            },
        }
    }

    /// Whether this scheme installs the all-in-one puppet-agent package.
    pub fn uses_puppet_agent(self) -> bool {
        matches!(self, Packaging::Apt | Packaging::Yum)
    }
}

impl fmt::Display for Packaging {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Packaging::Apt => write!(f, "apt"),
            Packaging::Yum => write!(f, "yum"),
            Packaging::Gem => write!(f, "gem"),
            Packaging::Unknown => write!(f, "unknown"),
        }
    }
}

/// Directories containing the `puppet`, `gem` and `r10k` executables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PuppetPaths {
    pub puppet: &'static str,
    pub gem: &'static str,
    pub r10k: &'static str,
}

/// Catalog entry for one distribution family.
#[derive(Debug, Clone)]
pub struct FamilyEntry {
    packaging: Packaging,
    codenames: BTreeMap<String, String>,
    environment: BTreeMap<String, String>,
}

impl FamilyEntry {
    /// Create an entry with no codenames and no extra environment.
    pub fn new(packaging: Packaging) -> Self {
        Self {
            packaging,
            codenames: BTreeMap::new(),
            environment: BTreeMap::new(),
        }
    }

    /// Add a `version => codename` mapping.
    pub fn codename(mut self, version: impl Into<String>, codename: impl Into<String>) -> Self {
        self.codenames.insert(version.into(), codename.into());
        self
    }

    /// Add an environment entry every image of this family receives.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }
}

/// Read-only table of known distribution families.
#[derive(Debug, Clone, Default)]
pub struct OsCatalog {
    families: BTreeMap<String, FamilyEntry>,
}

impl OsCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog of distributions `image-build` knows how to provision.
    pub fn builtin() -> Self {
        Self::new()
            .with_family(
                "ubuntu",
                FamilyEntry::new(Packaging::Apt)
                    .codename("16.04", "xenial")
                    .codename("14.04", "trusty")
                    .codename("12.04", "precise"),
            )
            .with_family(
                "debian",
                FamilyEntry::new(Packaging::Apt)
                    .codename("9", "stretch")
                    .codename("8", "jessie")
                    .codename("7", "wheezy"),
            )
            .with_family("centos", FamilyEntry::new(Packaging::Yum))
            .with_family(
                "alpine",
                FamilyEntry::new(Packaging::Gem)
                    .env("facter_version", "2.4.6")
                    .env("puppet_version", "4.8.1"),
            )
    }

    /// Add or replace a family entry.
    pub fn with_family(mut self, family: impl Into<String>, entry: FamilyEntry) -> Self {
        self.families.insert(family.into(), entry);
        self
    }

    /// Whether `family` has an entry. Matching is case-sensitive.
    pub fn knows(&self, family: &str) -> bool {
        self.families.contains_key(family)
    }

    /// Release codename for `family` at `version`, if the catalog has one.
    pub fn lookup_codename(&self, family: &str, version: &str) -> Option<&str> {
        self.families
            .get(family)
            .and_then(|entry| entry.codenames.get(version))
            .map(String::as_str)
    }

    /// Packaging scheme for `family`, [`Packaging::Unknown`] if unrecognized.
    pub fn packaging(&self, family: &str) -> Packaging {
        self.families
            .get(family)
            .map(|entry| entry.packaging)
            .unwrap_or(Packaging::Unknown)
    }

    /// Family-level environment entries (e.g. pinned gem versions).
    pub fn environment(&self, family: &str) -> Option<&BTreeMap<String, String>> {
        self.families.get(family).map(|entry| &entry.environment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_codenames() {
        let catalog = OsCatalog::builtin();
        let expected = [
            ("ubuntu", "16.04", "xenial"),
            ("ubuntu", "14.04", "trusty"),
            ("ubuntu", "12.04", "precise"),
            ("debian", "8", "jessie"),
            ("debian", "7", "wheezy"),
        ];
        for (family, version, codename) in expected {
            assert_eq!(catalog.lookup_codename(family, version), Some(codename));
        }
    }

    #[test]
    fn test_unknown_version_has_no_codename() {
        let catalog = OsCatalog::builtin();
        assert_eq!(catalog.lookup_codename("ubuntu", "10.04"), None);
        assert_eq!(catalog.lookup_codename("alpine", "3.4"), None);
        assert_eq!(catalog.lookup_codename("fedora", "25"), None);
    }

    #[test]
    fn test_family_match_is_case_sensitive() {
        let catalog = OsCatalog::builtin();
        assert!(catalog.knows("debian"));
        assert!(!catalog.knows("Debian"));
        assert_eq!(catalog.packaging("Debian"), Packaging::Unknown);
    }

    #[test]
    fn test_alpine_environment() {
        let catalog = OsCatalog::builtin();
        let env = catalog.environment("alpine").unwrap();
        assert!(env.contains_key("facter_version"));
        assert!(env.contains_key("puppet_version"));
        assert!(catalog.environment("debian").unwrap().is_empty());
    }

    #[test]
    fn test_paths_per_packaging() {
        assert_eq!(Packaging::Gem.paths().puppet, "/usr/bin");
        assert_eq!(Packaging::Apt.paths().puppet, "/opt/puppetlabs/bin");
        assert_eq!(Packaging::Yum.paths().r10k, "/opt/puppetlabs/puppet/bin");
        assert_eq!(Packaging::Unknown.paths(), Packaging::Apt.paths());
    }

    #[test]
    fn test_substitute_catalog() {
        let catalog = OsCatalog::new().with_family(
            "fedora",
            FamilyEntry::new(Packaging::Yum).codename("25", "twenty-five"),
        );
        assert_eq!(catalog.lookup_codename("fedora", "25"), Some("twenty-five"));
        assert!(!catalog.knows("debian"));
    }
}
