//! Semantic version parsing, precedence, and comparison.
//!
//! Precedence follows SemVer 2.0:
//! - `major`, `minor`, `patch` compare numerically
//! - a version with a prerelease sorts before the same version without one
//! - prerelease identifiers compare left to right: numeric identifiers
//!   numerically, alphanumeric ones lexically, numeric before alphanumeric,
//!   and a shorter prefix-equal sequence first
//! - build metadata never participates in precedence or equality

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use depsolve_util::errors::{DepsolveError, DepsolveResult};
use semver::{BuildMetadata, Prerelease};

/// An immutable semantic version.
#[derive(Debug, Clone)]
pub struct SemanticVersion {
    major: u64,
    minor: u64,
    patch: u64,
    pre: Prerelease,
    build: BuildMetadata,
}

impl SemanticVersion {
    /// A release version without prerelease or build labels.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: Prerelease::EMPTY,
            build: BuildMetadata::EMPTY,
        }
    }

    /// Build a version from numeric parts plus optional labels.
    ///
    /// Labels are dot-separated identifiers over `[0-9A-Za-z-]`. Numeric
    /// prerelease identifiers must not carry a leading zero.
    pub fn with_labels(
        major: u64,
        minor: u64,
        patch: u64,
        prerelease: Option<&str>,
        build_metadata: Option<&str>,
    ) -> DepsolveResult<Self> {
        let pre = match prerelease {
            Some(label) => parse_prerelease(label).map_err(|reason| DepsolveError::InvalidVersion {
                input: format!("{major}.{minor}.{patch}-{label}"),
                reason,
            })?,
            None => Prerelease::EMPTY,
        };
        let build = match build_metadata {
            Some(label) => parse_build(label).map_err(|reason| DepsolveError::InvalidVersion {
                input: format!("{major}.{minor}.{patch}+{label}"),
                reason,
            })?,
            None => BuildMetadata::EMPTY,
        };
        Ok(Self {
            major,
            minor,
            patch,
            pre,
            build,
        })
    }

    /// Parse a canonical `MAJOR.MINOR.PATCH[-PRERELEASE][+BUILD]` string.
    ///
    /// Returns `None` for anything that is not a canonical version; use
    /// [`FromStr`] when the failure reason matters.
    pub fn parse(input: &str) -> Option<Self> {
        input.parse().ok()
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    /// The prerelease label without its leading `-`.
    pub fn prerelease(&self) -> Option<&str> {
        (!self.pre.is_empty()).then(|| self.pre.as_str())
    }

    /// The build metadata without its leading `+`.
    pub fn build_metadata(&self) -> Option<&str> {
        (!self.build.is_empty()).then(|| self.build.as_str())
    }

    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }
}

fn parse_prerelease(label: &str) -> Result<Prerelease, String> {
    if label.is_empty() {
        return Err("empty prerelease label".to_string());
    }
    Prerelease::new(label).map_err(|e| e.to_string())
}

fn parse_build(label: &str) -> Result<BuildMetadata, String> {
    if label.is_empty() {
        return Err("empty build metadata".to_string());
    }
    BuildMetadata::new(label).map_err(|e| e.to_string())
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemanticVersion {}

impl Hash for SemanticVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.major.hash(state);
        self.minor.hash(state);
        self.patch.hash(state);
        self.pre.hash(state);
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            // An empty prerelease sorts after every non-empty one.
            .then_with(|| self.pre.cmp(&other.pre))
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre.is_empty() {
            write!(f, "-{}", self.pre)?;
        }
        if !self.build.is_empty() {
            write!(f, "+{}", self.build)?;
        }
        Ok(())
    }
}

impl FromStr for SemanticVersion {
    type Err = DepsolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        semver::Version::parse(s)
            .map(Self::from)
            .map_err(|e| DepsolveError::InvalidVersion {
                input: s.to_string(),
                reason: e.to_string(),
            })
    }
}

impl From<semver::Version> for SemanticVersion {
    fn from(v: semver::Version) -> Self {
        Self {
            major: v.major,
            minor: v.minor,
            patch: v.patch,
            pre: v.pre,
            build: v.build,
        }
    }
}
