//! Install ordering: partitions a resolved graph into phases that can each be
//! installed in one batch once every earlier phase is done.

use std::collections::HashMap;
use std::fmt;

use depsolve_core::{ProjectIdentifier, ResolvedDependency, Value};
use depsolve_util::errors::DepsolveResult;

use crate::graph::ResolvedDependencyGraph;

/// Install phases computed from a [`ResolvedDependencyGraph`].
///
/// Phase 0 holds the projects with no dependencies. A project sits in phase
/// `1 + max(phase of its dependencies)`, so every phase is as early as its
/// dependencies allow. Within a phase, projects keep project order.
#[derive(Debug, Clone, PartialEq)]
pub struct Installer<P: Value, M: Value> {
    phases: Vec<Vec<ResolvedDependency<P, M>>>,
}

impl<P: Value, M: Value> Installer<P, M> {
    /// Fails with a cycle error if the graph has no installation order.
    pub fn new(graph: &ResolvedDependencyGraph<P, M>) -> DepsolveResult<Self> {
        let order = graph.topological_order()?;

        // Dependencies come after their dependents in `order`, so walking it
        // backwards sees every dependency's level first.
        let mut levels = HashMap::with_capacity(order.len());
        for &idx in order.iter().rev() {
            let level = graph
                .dependency_indices(idx)
                .filter_map(|dep| levels.get(&dep).map(|l: &usize| l + 1))
                .max()
                .unwrap_or(0);
            levels.insert(idx, level);
        }

        let mut phases: Vec<Vec<ResolvedDependency<P, M>>> = Vec::new();
        for (idx, dependency) in graph.indexed_dependencies() {
            let level = levels.get(&idx).copied().unwrap_or(0);
            if phases.len() <= level {
                phases.resize_with(level + 1, Vec::new);
            }
            phases[level].push(dependency.clone());
        }

        tracing::debug!(
            "Computed {} install phases for {} projects",
            phases.len(),
            graph.len()
        );
        Ok(Self { phases })
    }

    pub fn phases(&self) -> &[Vec<ResolvedDependency<P, M>>] {
        &self.phases
    }

    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    /// Number of projects in phase `index`, or 0 past the last phase.
    pub fn count_in_phase(&self, index: usize) -> usize {
        self.phases.get(index).map_or(0, Vec::len)
    }

    /// The phase `project` is installed in.
    pub fn phase_of(&self, project: &ProjectIdentifier<P>) -> Option<usize> {
        self.phases
            .iter()
            .position(|phase| phase.iter().any(|d| &d.project == project))
    }

    /// Whether `dependency`, at that exact version, is part of any phase.
    pub fn contains(&self, dependency: &ResolvedDependency<P, M>) -> bool {
        self.phases.iter().any(|phase| phase.contains(dependency))
    }
}

impl<P: Value, M: Value> fmt::Display for Installer<P, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Install phases:")?;
        for (i, phase) in self.phases.iter().enumerate() {
            write!(f, "\nPhase {i}:")?;
            for dependency in phase {
                write!(f, "\n  {dependency}")?;
            }
        }
        Ok(())
    }
}
