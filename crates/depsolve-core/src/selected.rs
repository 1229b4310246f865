//! Concrete versions offered by a project's version catalog.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::value::Value;
use crate::version::SemanticVersion;

/// A concrete version of a project, paired with caller metadata such as a
/// source URL, tag name or checksum.
///
/// Identity is carried by the semantic version alone; metadata is
/// descriptive. A selected version without a semantic version (a branch or
/// local checkout) is identified by its metadata instead.
#[derive(Debug, Clone)]
pub struct SelectedVersion<M: Value> {
    semantic_version: Option<SemanticVersion>,
    metadata: M,
}

impl<M: Value> SelectedVersion<M> {
    pub fn new(semantic_version: SemanticVersion, metadata: M) -> Self {
        Self {
            semantic_version: Some(semantic_version),
            metadata,
        }
    }

    /// A version that lies outside any semantic versioning scheme.
    pub fn unversioned(metadata: M) -> Self {
        Self {
            semantic_version: None,
            metadata,
        }
    }

    pub fn semantic_version(&self) -> Option<&SemanticVersion> {
        self.semantic_version.as_ref()
    }

    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    pub fn is_unversioned(&self) -> bool {
        self.semantic_version.is_none()
    }
}

impl<M: Value> PartialEq for SelectedVersion<M> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<M: Value> Eq for SelectedVersion<M> {}

impl<M: Value> Ord for SelectedVersion<M> {
    /// Unversioned entries order below every versioned one.
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.semantic_version, &other.semantic_version) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => self.metadata.cmp(&other.metadata),
        }
    }
}

impl<M: Value> PartialOrd for SelectedVersion<M> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<M: Value> Hash for SelectedVersion<M> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.semantic_version {
            Some(version) => version.hash(state),
            None => self.metadata.hash(state),
        }
    }
}

impl<M: Value> fmt::Display for SelectedVersion<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.semantic_version {
            Some(version) => write!(f, "{version} ({})", self.metadata),
            None => write!(f, "unversioned ({})", self.metadata),
        }
    }
}

/// The catalog of candidate versions for one project, in caller order.
#[derive(Debug, Clone)]
pub struct SelectedVersionList<M: Value> {
    versions: Vec<SelectedVersion<M>>,
}

impl<M: Value> SelectedVersionList<M> {
    pub fn new(versions: Vec<SelectedVersion<M>>) -> Self {
        Self { versions }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SelectedVersion<M>> {
        self.versions.iter()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Newest first. The sort is stable, so entries of equal precedence keep
    /// the catalog's order and unversioned entries come last.
    pub fn sorted_newest_first(&self) -> Vec<SelectedVersion<M>> {
        let mut versions = self.versions.clone();
        versions.sort_by(|a, b| b.cmp(a));
        versions
    }

    pub fn into_vec(self) -> Vec<SelectedVersion<M>> {
        self.versions
    }
}

impl<M: Value> Default for SelectedVersionList<M> {
    fn default() -> Self {
        Self {
            versions: Vec::new(),
        }
    }
}

impl<M: Value> FromIterator<SelectedVersion<M>> for SelectedVersionList<M> {
    fn from_iter<I: IntoIterator<Item = SelectedVersion<M>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<M: Value> IntoIterator for SelectedVersionList<M> {
    type Item = SelectedVersion<M>;
    type IntoIter = std::vec::IntoIter<SelectedVersion<M>>;

    fn into_iter(self) -> Self::IntoIter {
        self.versions.into_iter()
    }
}

impl<M: Value> fmt::Display for SelectedVersionList<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version list:")?;
        for version in &self.versions {
            write!(f, "\n{version}")?;
        }
        Ok(())
    }
}
