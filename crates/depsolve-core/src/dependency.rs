use std::fmt;

use crate::project::ProjectIdentifier;
use crate::requirement::Requirement;
use crate::selected::SelectedVersion;
use crate::value::Value;

/// A declared dependency: a project and the requirement its version must meet.
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency<P: Value, M: Value> {
    pub project: ProjectIdentifier<P>,
    pub requirement: Requirement<M>,
}

impl<P: Value, M: Value> Dependency<P, M> {
    pub fn new(project: impl Into<ProjectIdentifier<P>>, requirement: Requirement<M>) -> Self {
        Self {
            project: project.into(),
            requirement,
        }
    }
}

impl<P: Value, M: Value> fmt::Display for Dependency<P, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.project, self.requirement)
    }
}

/// The dependencies a manifest declares, in declaration order.
///
/// One entry per project is expected. Duplicates are not rejected here; the
/// resolver merges their requirements like any other pair of constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyList<P: Value, M: Value> {
    dependencies: Vec<Dependency<P, M>>,
}

impl<P: Value, M: Value> DependencyList<P, M> {
    pub fn new(dependencies: Vec<Dependency<P, M>>) -> Self {
        Self { dependencies }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Dependency<P, M>> {
        self.dependencies.iter()
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// The requirement declared for `project`, if any.
    pub fn requirement_for(&self, project: &ProjectIdentifier<P>) -> Option<&Requirement<M>> {
        self.dependencies
            .iter()
            .find(|d| &d.project == project)
            .map(|d| &d.requirement)
    }

    pub fn push(&mut self, dependency: Dependency<P, M>) {
        self.dependencies.push(dependency);
    }
}

impl<P: Value, M: Value> Default for DependencyList<P, M> {
    fn default() -> Self {
        Self {
            dependencies: Vec::new(),
        }
    }
}

impl<P: Value, M: Value> FromIterator<Dependency<P, M>> for DependencyList<P, M> {
    fn from_iter<I: IntoIterator<Item = Dependency<P, M>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<P: Value, M: Value> IntoIterator for DependencyList<P, M> {
    type Item = Dependency<P, M>;
    type IntoIter = std::vec::IntoIter<Dependency<P, M>>;

    fn into_iter(self) -> Self::IntoIter {
        self.dependencies.into_iter()
    }
}

impl<'a, P: Value, M: Value> IntoIterator for &'a DependencyList<P, M> {
    type Item = &'a Dependency<P, M>;
    type IntoIter = std::slice::Iter<'a, Dependency<P, M>>;

    fn into_iter(self) -> Self::IntoIter {
        self.dependencies.iter()
    }
}

impl<P: Value, M: Value> fmt::Display for DependencyList<P, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dependency list:")?;
        for dependency in &self.dependencies {
            write!(f, "\n{dependency}")?;
        }
        Ok(())
    }
}

/// A project pinned to one selected version; a node of a resolved graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResolvedDependency<P: Value, M: Value> {
    pub project: ProjectIdentifier<P>,
    pub version: SelectedVersion<M>,
}

impl<P: Value, M: Value> ResolvedDependency<P, M> {
    pub fn new(project: ProjectIdentifier<P>, version: SelectedVersion<M>) -> Self {
        Self { project, version }
    }
}

impl<P: Value, M: Value> fmt::Display for ResolvedDependency<P, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.project, self.version)
    }
}
