//! Resolution session cache for avoiding redundant lookups.
//!
//! Candidate lists and dependency lists survive backtracking: a branch that is
//! abandoned and later revisited reuses what was already fetched. A failed
//! availability lookup is kept too, so the lookup is never repeated.

use std::collections::HashMap;
use std::sync::Arc;

use depsolve_core::{DependencyList, ProjectIdentifier, SelectedVersion, Value};
use depsolve_util::errors::DepsolveError;

/// Memoized lookups for one resolution.
#[derive(Debug)]
pub struct FetchCache<P: Value, M: Value> {
    /// Candidates per project, newest first.
    versions: HashMap<ProjectIdentifier<P>, Arc<Vec<SelectedVersion<M>>>>,
    dependencies: HashMap<(ProjectIdentifier<P>, SelectedVersion<M>), Arc<DependencyList<P, M>>>,
    /// Availability lookups that failed ahead of the search reaching them.
    failures: HashMap<ProjectIdentifier<P>, DepsolveError>,
}

impl<P: Value, M: Value> FetchCache<P, M> {
    pub fn new() -> Self {
        Self {
            versions: HashMap::new(),
            dependencies: HashMap::new(),
            failures: HashMap::new(),
        }
    }

    pub fn versions(&self, project: &ProjectIdentifier<P>) -> Option<Arc<Vec<SelectedVersion<M>>>> {
        self.versions.get(project).cloned()
    }

    pub fn has_versions(&self, project: &ProjectIdentifier<P>) -> bool {
        self.versions.contains_key(project)
    }

    /// Whether availability of `project` was looked up, successfully or not.
    pub fn is_fetched(&self, project: &ProjectIdentifier<P>) -> bool {
        self.versions.contains_key(project) || self.failures.contains_key(project)
    }

    pub fn insert_failure(&mut self, project: ProjectIdentifier<P>, error: DepsolveError) {
        self.failures.insert(project, error);
    }

    /// Hand out the stored lookup failure for `project`, once.
    pub fn take_failure(&mut self, project: &ProjectIdentifier<P>) -> Option<DepsolveError> {
        self.failures.remove(project)
    }

    pub fn insert_versions(
        &mut self,
        project: ProjectIdentifier<P>,
        versions: Vec<SelectedVersion<M>>,
    ) -> Arc<Vec<SelectedVersion<M>>> {
        let versions = Arc::new(versions);
        self.versions.insert(project, Arc::clone(&versions));
        versions
    }

    pub fn dependencies(
        &self,
        project: &ProjectIdentifier<P>,
        version: &SelectedVersion<M>,
    ) -> Option<Arc<DependencyList<P, M>>> {
        self.dependencies
            .get(&(project.clone(), version.clone()))
            .cloned()
    }

    pub fn insert_dependencies(
        &mut self,
        project: ProjectIdentifier<P>,
        version: SelectedVersion<M>,
        dependencies: DependencyList<P, M>,
    ) -> Arc<DependencyList<P, M>> {
        let dependencies = Arc::new(dependencies);
        self.dependencies
            .insert((project, version), Arc::clone(&dependencies));
        dependencies
    }

    /// Number of `(projects, dependency lists)` held.
    pub fn len(&self) -> (usize, usize) {
        (self.versions.len(), self.dependencies.len())
    }

    pub fn clear(&mut self) {
        self.versions.clear();
        self.dependencies.clear();
        self.failures.clear();
    }
}

impl<P: Value, M: Value> Default for FetchCache<P, M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use depsolve_core::{Dependency, Requirement, SemanticVersion};

    use super::*;

    fn sv(version: &str, meta: &str) -> SelectedVersion<String> {
        SelectedVersion::new(SemanticVersion::parse(version).unwrap(), meta.to_string())
    }

    #[test]
    fn versions_round_trip() {
        let mut cache: FetchCache<String, String> = FetchCache::new();
        let project = ProjectIdentifier::new("lib".to_string());
        assert!(!cache.has_versions(&project));

        cache.insert_versions(project.clone(), vec![sv("1.0.0", "a")]);
        assert!(cache.has_versions(&project));
        assert_eq!(cache.versions(&project).map(|v| v.len()), Some(1));
        assert_eq!(cache.len(), (1, 0));
    }

    #[test]
    fn dependencies_keyed_by_semantic_version() {
        let mut cache: FetchCache<String, String> = FetchCache::new();
        let project = ProjectIdentifier::new("app".to_string());
        let deps = DependencyList::new(vec![Dependency::new("lib".to_string(), Requirement::Any)]);
        cache.insert_dependencies(project.clone(), sv("1.0.0", "tag"), deps);

        // Metadata is descriptive, so another tag of the same release hits.
        assert!(cache.dependencies(&project, &sv("1.0.0", "other-tag")).is_some());
        assert!(cache.dependencies(&project, &sv("1.0.1", "tag")).is_none());

        cache.clear();
        assert_eq!(cache.len(), (0, 0));
    }

    #[test]
    fn failure_is_handed_out_once() {
        let mut cache: FetchCache<String, String> = FetchCache::new();
        let project = ProjectIdentifier::new("flaky".to_string());
        cache.insert_failure(project.clone(), DepsolveError::conflict("flaky", "stand-in"));

        assert!(cache.is_fetched(&project));
        assert!(!cache.has_versions(&project));
        assert!(cache.take_failure(&project).is_some());
        assert!(cache.take_failure(&project).is_none());
        assert!(!cache.is_fetched(&project));
    }
}
