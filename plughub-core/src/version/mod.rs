//! Plugin version model
//!
//! Versions follow the Python packaging scheme (PEP 440): an optional
//! epoch, any number of release components, then optional pre-release
//! (`a`, `b`, `rc`), post-release, development and local segments.
//! Parsing and ordering are delegated to `pep440_rs`. Tags taken from
//! version control may carry a leading `v`, which is stripped first.
//!
//! Missing trailing release components compare as zero, so `1.0` and
//! `1.0.0` are equal (and hash equal). The string form keeps the
//! components as given, with the other segments in normalized spelling.

mod specifier;

pub use specifier::{Specifier, SpecifierSet};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{HubError, Result};

/// A parsed plugin version
#[derive(Debug, Clone)]
pub struct Version {
    inner: pep440_rs::Version,
}

impl Version {
    /// Parse a version string, accepting an optional leading `v`
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let unprefixed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        let inner = pep440_rs::Version::from_str(unprefixed).map_err(|_| {
            HubError::InvalidVersionFormat {
                input: input.to_string(),
            }
        })?;

        Ok(Self { inner })
    }

    /// Create a final release from its components
    pub fn new(release: &[u64]) -> Self {
        Self {
            inner: pep440_rs::Version::new(release.iter().copied()),
        }
    }

    /// Release components exactly as parsed
    pub fn release(&self) -> Vec<u64> {
        self.inner.release().iter().copied().collect()
    }

    pub fn epoch(&self) -> u64 {
        self.inner.epoch()
    }

    pub fn major(&self) -> u64 {
        self.component(0)
    }

    pub fn minor(&self) -> u64 {
        self.component(1)
    }

    pub fn micro(&self) -> u64 {
        self.component(2)
    }

    fn component(&self, index: usize) -> u64 {
        self.inner.release().get(index).copied().unwrap_or(0)
    }

    /// True for pre-releases and development releases
    pub fn is_prerelease(&self) -> bool {
        self.inner.any_prerelease()
    }

    pub fn is_postrelease(&self) -> bool {
        self.inner.is_post()
    }

    pub(crate) fn from_pep440(inner: pep440_rs::Version) -> Self {
        Self { inner }
    }

    pub(crate) fn as_pep440(&self) -> &pep440_rs::Version {
        &self.inner
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

// Only the parts every equal version shares: epoch and the release without
// trailing zeros.
impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.epoch().hash(state);

        let release = self.inner.release();
        let len = release
            .iter()
            .rposition(|&c| c != 0)
            .map(|i| i + 1)
            .unwrap_or(0);
        release[..len].hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl FromStr for Version {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Version::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse_tag_with_v_prefix() {
        let version = v("v1.2.3");
        assert_eq!(version.release(), vec![1, 2, 3]);
        assert_eq!(version.major(), 1);
        assert_eq!(version.minor(), 2);
        assert_eq!(version.micro(), 3);
        assert_eq!(version.to_string(), "1.2.3");
        assert_eq!(version, v("1.2.3"));
        assert_eq!(v(" V2.0 "), v("2.0"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in ["", "v", "abc", "1..2", "1.2.x", "1.0-foo", ".1", "vv1.0"] {
            let err = Version::parse(input).unwrap_err();
            assert!(
                matches!(err, HubError::InvalidVersionFormat { .. }),
                "expected InvalidVersionFormat for {input:?}"
            );
        }
    }

    #[test]
    fn test_epoch() {
        let version = v("1!2.0");
        assert_eq!(version.epoch(), 1);
        assert_eq!(version.release(), vec![2, 0]);
        assert_eq!(version.to_string(), "1!2.0");
        assert!(version > v("99.0"));
        assert_eq!(v("2.0").epoch(), 0);
    }

    #[test]
    fn test_canonical_form_round_trips() {
        for input in [
            "1.0.0",
            "2.1.6",
            "0.9",
            "1.0a1",
            "1.0b2",
            "1.0rc1",
            "1.0.post2",
            "1.0.dev3",
            "1.0a1.dev1",
            "1.0+ubuntu.1",
        ] {
            let version = v(input);
            assert_eq!(version.to_string(), input);
            assert_eq!(v(&version.to_string()), version);
        }
    }

    #[test]
    fn test_normalizes_spelling() {
        assert_eq!(v("1.0-alpha.1").to_string(), "1.0a1");
        assert_eq!(v("1.0.0-beta2").to_string(), "1.0.0b2");
        assert_eq!(v("1.0c1").to_string(), "1.0rc1");
        assert_eq!(v("1.0-1").to_string(), "1.0.post1");
    }

    #[test]
    fn test_trailing_zeros_are_equal() {
        assert_eq!(v("1.0"), v("1.0.0"));
        assert_eq!(v("1"), v("1.0.0.0"));
        assert_ne!(v("1.0"), v("1.0.1"));

        let mut set = HashSet::new();
        set.insert(v("1.0"));
        assert!(set.contains(&v("1.0.0")));

        // Display still keeps the given components
        assert_eq!(v("1.0").to_string(), "1.0");
    }

    #[test]
    fn test_numeric_ordering() {
        assert!(v("1.10.0") > v("1.9.0"));
        assert!(v("2.0") > v("1.99.99"));
        assert!(v("1.0.1") > v("1.0"));
        assert_eq!(Version::new(&[1, 2]), v("1.2.0"));
    }

    #[test]
    fn test_prerelease_sorts_before_release() {
        let mut versions = vec![
            v("1.0.post1"),
            v("1.0"),
            v("1.0rc1"),
            v("1.0b1"),
            v("1.0a2"),
            v("1.0a1"),
            v("1.0a1.dev1"),
            v("1.0.dev1"),
            v("1.0+local"),
        ];
        versions.sort();

        let ordered: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
        assert_eq!(
            ordered,
            vec![
                "1.0.dev1",
                "1.0a1.dev1",
                "1.0a1",
                "1.0a2",
                "1.0b1",
                "1.0rc1",
                "1.0",
                "1.0+local",
                "1.0.post1",
            ]
        );
    }

    #[test]
    fn test_prerelease_flags() {
        assert!(v("1.0rc1").is_prerelease());
        assert!(v("1.0.dev0").is_prerelease());
        assert!(!v("1.0.post1").is_prerelease());
        assert!(v("1.0.post1").is_postrelease());
    }

    #[test]
    fn test_serde_as_string() {
        let version: Version = serde_json::from_str("\"v2.1.6\"").unwrap();
        assert_eq!(version, v("2.1.6"));
        assert_eq!(serde_json::to_string(&version).unwrap(), "\"2.1.6\"");
        assert!(serde_json::from_str::<Version>("\"nope\"").is_err());
    }
}
