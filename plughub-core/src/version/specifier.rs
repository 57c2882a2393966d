//! Compatibility specifiers
//!
//! A specifier set is a comma separated list of clauses, all of which
//! must hold. The catalog only ever uses the compatible release operator
//! (`~=1.0` meaning `>=1.0, ==1.*`), but every PEP 440 operator is
//! understood. Clause math comes from `pep440_rs`.

use pep440_rs::{Operator, VersionSpecifier};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::Version;
use crate::error::{HubError, Result};

/// A single clause, e.g. `>=1.2` or `==2.*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    inner: VersionSpecifier,
}

impl Specifier {
    /// Parse a single clause
    pub fn parse(input: &str) -> Result<Self> {
        let inner =
            VersionSpecifier::from_str(input.trim()).map_err(|err| HubError::InvalidSpecifier {
                input: input.to_string(),
                reason: err.to_string(),
            })?;

        Ok(Self { inner })
    }

    /// Check the clause math alone, pre-release or not
    pub fn contains(&self, candidate: &Version) -> bool {
        self.inner.contains(candidate.as_pep440())
    }

    pub fn version(&self) -> Version {
        Version::from_pep440(self.inner.version().clone())
    }

    /// Whether this clause opts in to pre-releases
    ///
    /// Inclusive clauses naming a pre-release (`>=2.0rc1`, `==1.1b2`) do;
    /// exclusions and strict bounds never do.
    pub fn admits_prereleases(&self) -> bool {
        let inclusive = matches!(
            self.inner.operator(),
            Operator::Equal
                | Operator::EqualStar
                | Operator::ExactEqual
                | Operator::TildeEqual
                | Operator::LessThanEqual
                | Operator::GreaterThanEqual
        );
        inclusive && self.inner.version().any_prerelease()
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

/// A set of clauses joined by AND
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecifierSet {
    clauses: Vec<Specifier>,
}

impl SpecifierSet {
    /// Parse a comma separated list of clauses
    ///
    /// An empty string yields a set that admits every final release.
    pub fn parse(input: &str) -> Result<Self> {
        let clauses = input
            .split(',')
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(|clause| {
                Specifier::parse(clause).map_err(|err| match err {
                    HubError::InvalidSpecifier { reason, .. } => HubError::InvalidSpecifier {
                        input: input.to_string(),
                        reason,
                    },
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { clauses })
    }

    /// Check whether `version` satisfies every clause
    ///
    /// Pre-release and development versions are rejected unless some
    /// clause names a pre-release itself, the same default the Python
    /// packaging library applies.
    pub fn contains(&self, version: &Version) -> bool {
        if version.is_prerelease() && !self.admits_prereleases() {
            return false;
        }
        self.clauses.iter().all(|clause| clause.contains(version))
    }

    pub fn admits_prereleases(&self) -> bool {
        self.clauses.iter().any(Specifier::admits_prereleases)
    }

    pub fn clauses(&self) -> &[Specifier] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clauses: Vec<String> = self.clauses.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", clauses.join(","))
    }
}

impl FromStr for SpecifierSet {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self> {
        SpecifierSet::parse(s)
    }
}

impl Serialize for SpecifierSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SpecifierSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SpecifierSet::parse(&raw).map_err(serde::de::Error::custom)
    }
}
