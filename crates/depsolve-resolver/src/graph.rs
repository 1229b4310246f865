//! The resolved dependency graph: one selected version per project, with
//! requirement-labelled edges from dependents to their dependencies.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;

use depsolve_core::{ProjectIdentifier, Requirement, ResolvedDependency, SelectedVersion, Value};
use depsolve_util::errors::{DepsolveError, DepsolveResult};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::conflict::{ConflictKind, VersionConflict};

/// A node: the selected version plus the aggregate of every requirement
/// asserted against the project so far.
#[derive(Debug, Clone)]
struct ResolvedNode<P: Value, M: Value> {
    dependency: ResolvedDependency<P, M>,
    requirement: Requirement<M>,
}

/// Step of the iterative depth-first walk in [`ResolvedDependencyGraph::depth`].
enum Visit {
    Enter(NodeIndex),
    Exit(NodeIndex),
}

/// A resolved dependency graph backed by petgraph.
///
/// Mutation goes through [`add_root`](Self::add_root),
/// [`add_node`](Self::add_node) and [`add_edge`](Self::add_edge), each of
/// which validates before touching the graph: a failed call leaves it
/// unchanged.
#[derive(Debug, Clone)]
pub struct ResolvedDependencyGraph<P: Value, M: Value> {
    graph: DiGraph<ResolvedNode<P, M>, Requirement<M>>,
    /// Lookup from project to its node.
    index: BTreeMap<ProjectIdentifier<P>, NodeIndex>,
    roots: Vec<NodeIndex>,
}

impl<P: Value, M: Value> ResolvedDependencyGraph<P, M> {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: BTreeMap::new(),
            roots: Vec::new(),
        }
    }

    /// Insert `dependency` as an entry point of the graph.
    pub fn add_root(
        &mut self,
        dependency: ResolvedDependency<P, M>,
        requirement: Requirement<M>,
    ) -> DepsolveResult<()> {
        let aggregate = self.check_node(&dependency, &requirement)?;
        let idx = self.apply_node(dependency, aggregate);
        if !self.roots.contains(&idx) {
            self.roots.push(idx);
        }
        Ok(())
    }

    /// Insert `dependency`, or tighten the requirement on an existing node of
    /// the same version.
    pub fn add_node(
        &mut self,
        dependency: ResolvedDependency<P, M>,
        requirement: Requirement<M>,
    ) -> DepsolveResult<()> {
        let aggregate = self.check_node(&dependency, &requirement)?;
        self.apply_node(dependency, aggregate);
        Ok(())
    }

    /// Record that `dependent` depends on `dependency` under `requirement`,
    /// inserting the dependency node if needed.
    pub fn add_edge(
        &mut self,
        dependent: &ProjectIdentifier<P>,
        dependency: ResolvedDependency<P, M>,
        requirement: Requirement<M>,
    ) -> DepsolveResult<()> {
        let from = self.node_index(dependent)?;
        let aggregate = self.check_node(&dependency, &requirement)?;

        let existing_edge = self
            .index
            .get(&dependency.project)
            .and_then(|&to| self.graph.find_edge(from, to));
        let label = match existing_edge {
            Some(edge) => self.graph[edge].merge(&requirement).ok_or_else(|| {
                DepsolveError::from(VersionConflict::new(
                    dependency.project.clone(),
                    ConflictKind::Incompatible {
                        existing: self.graph[edge].clone(),
                        requested: requirement.clone(),
                    },
                ))
            })?,
            None => requirement,
        };

        let to = self.apply_node(dependency, aggregate);
        match existing_edge {
            Some(edge) => self.graph[edge] = label,
            None => {
                self.graph.add_edge(from, to, label);
            }
        }
        Ok(())
    }

    /// Validate that `dependency` may be inserted under `requirement` and
    /// return the node's new aggregate requirement.
    fn check_node(
        &self,
        dependency: &ResolvedDependency<P, M>,
        requirement: &Requirement<M>,
    ) -> DepsolveResult<Requirement<M>> {
        let project = &dependency.project;
        let Some(&idx) = self.index.get(project) else {
            if !requirement.satisfied_by(&dependency.version) {
                return Err(VersionConflict::new(
                    project.clone(),
                    ConflictKind::Unsatisfied {
                        version: dependency.version.clone(),
                        requirement: requirement.clone(),
                    },
                )
                .into());
            }
            return Ok(requirement.clone());
        };

        let node = &self.graph[idx];
        if node.dependency.version != dependency.version {
            return Err(VersionConflict::new(
                project.clone(),
                ConflictKind::VersionMismatch {
                    existing: node.dependency.version.clone(),
                    requested: dependency.version.clone(),
                },
            )
            .into());
        }

        let Some(merged) = node.requirement.merge(requirement) else {
            return Err(VersionConflict::new(
                project.clone(),
                ConflictKind::Incompatible {
                    existing: node.requirement.clone(),
                    requested: requirement.clone(),
                },
            )
            .into());
        };
        if !merged.satisfied_by(&node.dependency.version) {
            return Err(VersionConflict::new(
                project.clone(),
                ConflictKind::Unsatisfied {
                    version: node.dependency.version.clone(),
                    requirement: merged,
                },
            )
            .into());
        }
        Ok(merged)
    }

    fn apply_node(
        &mut self,
        dependency: ResolvedDependency<P, M>,
        requirement: Requirement<M>,
    ) -> NodeIndex {
        if let Some(&idx) = self.index.get(&dependency.project) {
            self.graph[idx].requirement = requirement;
            return idx;
        }
        let project = dependency.project.clone();
        let idx = self.graph.add_node(ResolvedNode {
            dependency,
            requirement,
        });
        self.index.insert(project, idx);
        idx
    }

    fn node_index(&self, project: &ProjectIdentifier<P>) -> DepsolveResult<NodeIndex> {
        self.index
            .get(project)
            .copied()
            .ok_or_else(|| DepsolveError::UnknownProject {
                project: project.to_string(),
            })
    }

    /// Projects `project` directly depends on, in project order.
    pub fn dependencies_of(&self, project: &ProjectIdentifier<P>) -> Vec<ProjectIdentifier<P>> {
        let Some(&idx) = self.index.get(project) else {
            return Vec::new();
        };
        let mut deps: Vec<ProjectIdentifier<P>> = self
            .dependency_indices(idx)
            .map(|to| self.graph[to].dependency.project.clone())
            .collect();
        deps.sort();
        deps
    }

    /// The requirement `dependent` placed on `dependency`, if that edge exists.
    pub fn edge_requirement(
        &self,
        dependent: &ProjectIdentifier<P>,
        dependency: &ProjectIdentifier<P>,
    ) -> Option<Requirement<M>> {
        let from = *self.index.get(dependent)?;
        let to = *self.index.get(dependency)?;
        let edge = self.graph.find_edge(from, to)?;
        Some(self.graph[edge].clone())
    }

    pub fn version_of(&self, project: &ProjectIdentifier<P>) -> Option<SelectedVersion<M>> {
        self.index
            .get(project)
            .map(|&idx| self.graph[idx].dependency.version.clone())
    }

    /// The aggregate requirement on `project`.
    pub fn requirement_of(&self, project: &ProjectIdentifier<P>) -> Option<Requirement<M>> {
        self.index
            .get(project)
            .map(|&idx| self.graph[idx].requirement.clone())
    }

    pub fn contains(&self, project: &ProjectIdentifier<P>) -> bool {
        self.index.contains_key(project)
    }

    /// Every node, in project order.
    pub fn resolved_dependencies(&self) -> Vec<ResolvedDependency<P, M>> {
        self.index
            .values()
            .map(|&idx| self.graph[idx].dependency.clone())
            .collect()
    }

    /// The entry points, in insertion order.
    pub fn roots(&self) -> Vec<ResolvedDependency<P, M>> {
        self.root_indices()
            .into_iter()
            .map(|idx| self.graph[idx].dependency.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// A copy holding only what is reachable from `roots`, which become the
    /// copy's entry points.
    pub fn graph_with_new_roots(&self, roots: &[ProjectIdentifier<P>]) -> DepsolveResult<Self> {
        let starts = roots
            .iter()
            .map(|project| self.node_index(project))
            .collect::<DepsolveResult<Vec<_>>>()?;

        let mut copy = Self::new();
        let mut mapping: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue: VecDeque<NodeIndex> = starts.iter().copied().collect();

        while let Some(old) = queue.pop_front() {
            if mapping.contains_key(&old) {
                continue;
            }
            let node = self.graph[old].clone();
            let project = node.dependency.project.clone();
            let new = copy.graph.add_node(node);
            copy.index.insert(project, new);
            mapping.insert(old, new);
            queue.extend(self.dependency_indices(old));
        }

        for edge in self.graph.edge_references() {
            if let (Some(&from), Some(&to)) = (mapping.get(&edge.source()), mapping.get(&edge.target())) {
                copy.graph.add_edge(from, to, edge.weight().clone());
            }
        }

        for old in starts {
            if let Some(&new) = mapping.get(&old) {
                if !copy.roots.contains(&new) {
                    copy.roots.push(new);
                }
            }
        }
        Ok(copy)
    }

    /// Number of nodes on the longest path from a root, ignoring edges that
    /// close a cycle. An empty graph has depth 0.
    pub fn depth(&self) -> usize {
        let mut memo: HashMap<NodeIndex, usize> = HashMap::new();
        let mut on_path: HashSet<NodeIndex> = HashSet::new();
        let mut stack: Vec<Visit> = Vec::new();
        let mut deepest = 0;

        for root in self.root_indices() {
            stack.push(Visit::Enter(root));
            while let Some(visit) = stack.pop() {
                match visit {
                    Visit::Enter(idx) => {
                        if memo.contains_key(&idx) || !on_path.insert(idx) {
                            continue;
                        }
                        stack.push(Visit::Exit(idx));
                        stack.extend(
                            self.dependency_indices(idx)
                                .filter(|child| !on_path.contains(child) && !memo.contains_key(child))
                                .map(Visit::Enter),
                        );
                    }
                    Visit::Exit(idx) => {
                        on_path.remove(&idx);
                        let longest = self
                            .dependency_indices(idx)
                            .filter(|child| !on_path.contains(child))
                            .filter_map(|child| memo.get(&child).copied())
                            .max()
                            .unwrap_or(0);
                        memo.insert(idx, longest + 1);
                    }
                }
            }
            deepest = deepest.max(memo.get(&root).copied().unwrap_or(0));
        }
        deepest
    }

    /// Number of nodes whose shortest distance from any root is `depth`.
    /// Roots are at depth 0.
    pub fn count_at_depth(&self, depth: usize) -> usize {
        let mut distance: HashMap<NodeIndex, usize> = HashMap::new();
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();
        for root in self.root_indices() {
            distance.insert(root, 0);
            queue.push_back(root);
        }
        while let Some(idx) = queue.pop_front() {
            let next = distance[&idx] + 1;
            for child in self.dependency_indices(idx) {
                if !distance.contains_key(&child) {
                    distance.insert(child, next);
                    queue.push_back(child);
                }
            }
        }
        distance.values().filter(|&&d| d == depth).count()
    }

    /// Declared roots, or every node without dependents when none were
    /// declared.
    fn root_indices(&self) -> Vec<NodeIndex> {
        if !self.roots.is_empty() {
            return self.roots.clone();
        }
        self.index
            .values()
            .copied()
            .filter(|&idx| {
                self.graph
                    .edges_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .collect()
    }

    /// Projects with an edge to `project`, in project order.
    pub(crate) fn dependents_of(&self, project: &ProjectIdentifier<P>) -> Vec<ProjectIdentifier<P>> {
        let Some(&idx) = self.index.get(project) else {
            return Vec::new();
        };
        let mut dependents: Vec<ProjectIdentifier<P>> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| self.graph[e.source()].dependency.project.clone())
            .collect();
        dependents.sort();
        dependents.dedup();
        dependents
    }

    pub(crate) fn dependency_indices(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.target())
    }

    /// Nodes in project order, as `(index, dependency)` pairs.
    pub(crate) fn indexed_dependencies(&self) -> impl Iterator<Item = (NodeIndex, &ResolvedDependency<P, M>)> + '_ {
        self.index
            .values()
            .map(|&idx| (idx, &self.graph[idx].dependency))
    }

    /// Dependents before their dependencies; fails on the first cycle found.
    pub(crate) fn topological_order(&self) -> DepsolveResult<Vec<NodeIndex>> {
        toposort(&self.graph, None).map_err(|cycle| DepsolveError::Cycle {
            cycle: self.describe_cycle(cycle.node_id()),
        })
    }

    /// Render a cycle through `start` as `A -> B -> A`.
    fn describe_cycle(&self, start: NodeIndex) -> String {
        let component: HashSet<NodeIndex> = tarjan_scc(&self.graph)
            .into_iter()
            .find(|scc| scc.contains(&start))
            .map(|scc| scc.into_iter().collect())
            .unwrap_or_default();

        // Shortest walk from `start` back to itself inside its component.
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        let mut closing = None;
        'search: while let Some(idx) = queue.pop_front() {
            for child in self.dependency_indices(idx) {
                if child == start {
                    closing = Some(idx);
                    break 'search;
                }
                if component.contains(&child) && !parent.contains_key(&child) {
                    parent.insert(child, idx);
                    queue.push_back(child);
                }
            }
        }

        let mut path = vec![start];
        let mut cursor = closing;
        while let Some(idx) = cursor {
            if idx == start {
                break;
            }
            path.push(idx);
            cursor = parent.get(&idx).copied();
        }
        path[1..].reverse();
        path.push(start);

        path.iter()
            .map(|&idx| self.graph[idx].dependency.project.to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

impl<P: Value, M: Value> Default for ResolvedDependencyGraph<P, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Value, M: Value> fmt::Display for ResolvedDependencyGraph<P, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nodes:")?;
        for &idx in self.index.values() {
            write!(f, "\n  {} ->", self.graph[idx].dependency)?;
            let mut deps: Vec<&ResolvedDependency<P, M>> = self
                .dependency_indices(idx)
                .map(|to| &self.graph[to].dependency)
                .collect();
            deps.sort();
            for dep in deps {
                write!(f, "\n    {dep}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use depsolve_core::SemanticVersion;

    use super::*;

    type Graph = ResolvedDependencyGraph<String, String>;

    fn p(name: &str) -> ProjectIdentifier<String> {
        ProjectIdentifier::new(name.to_string())
    }

    fn node(name: &str, version: &str) -> ResolvedDependency<String, String> {
        ResolvedDependency::new(
            p(name),
            SelectedVersion::new(SemanticVersion::parse(version).unwrap(), format!("v{version}")),
        )
    }

    fn exactly(version: &str) -> Requirement<String> {
        Requirement::Exactly(SemanticVersion::parse(version).unwrap())
    }

    #[test]
    fn add_and_find() {
        let mut g = Graph::new();
        g.add_root(node("A", "1.0.0"), Requirement::Any).unwrap();
        assert!(g.contains(&p("A")));
        assert_eq!(g.version_of(&p("A")).map(|v| v.to_string()).as_deref(), Some("1.0.0 (v1.0.0)"));
        assert_eq!(g.requirement_of(&p("A")), Some(Requirement::Any));
        assert!(g.version_of(&p("B")).is_none());
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn readding_same_version_tightens_requirement() {
        let mut g = Graph::new();
        g.add_node(node("A", "1.0.0"), Requirement::Any).unwrap();
        g.add_node(node("A", "1.0.0"), exactly("1.0.0")).unwrap();
        assert_eq!(g.requirement_of(&p("A")), Some(exactly("1.0.0")));
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn merged_edge_labels() {
        let mut g = Graph::new();
        g.add_root(node("A", "1.0.0"), Requirement::Any).unwrap();
        g.add_edge(&p("A"), node("B", "2.0.0"), Requirement::Any).unwrap();
        g.add_edge(&p("A"), node("B", "2.0.0"), exactly("2.0.0")).unwrap();
        assert_eq!(g.edge_requirement(&p("A"), &p("B")), Some(exactly("2.0.0")));
        assert_eq!(g.dependencies_of(&p("A")), vec![p("B")]);
    }

    #[test]
    fn cycle_description() {
        let mut g = Graph::new();
        g.add_root(node("A", "1.0.0"), Requirement::Any).unwrap();
        g.add_edge(&p("A"), node("B", "1.0.0"), Requirement::Any).unwrap();
        g.add_edge(&p("B"), node("C", "1.0.0"), Requirement::Any).unwrap();
        g.add_edge(&p("C"), node("A", "1.0.0"), Requirement::Any).unwrap();

        let err = g.topological_order().unwrap_err();
        let DepsolveError::Cycle { cycle } = err else {
            panic!("expected a cycle error");
        };
        let hops: Vec<&str> = cycle.split(" -> ").collect();
        assert_eq!(hops.len(), 4);
        assert_eq!(hops.first(), hops.last());
    }

    #[test]
    fn self_loop_description() {
        let mut g = Graph::new();
        g.add_root(node("A", "1.0.0"), Requirement::Any).unwrap();
        g.add_edge(&p("A"), node("A", "1.0.0"), Requirement::Any).unwrap();
        assert_eq!(g.describe_cycle(g.index[&p("A")]), "A -> A");
    }

    #[test]
    fn dependents_in_project_order() {
        let mut g = Graph::new();
        g.add_root(node("B", "1.0.0"), Requirement::Any).unwrap();
        g.add_root(node("A", "1.0.0"), Requirement::Any).unwrap();
        g.add_edge(&p("B"), node("C", "1.0.0"), Requirement::Any).unwrap();
        g.add_edge(&p("A"), node("C", "1.0.0"), Requirement::Any).unwrap();
        assert_eq!(g.dependents_of(&p("C")), vec![p("A"), p("B")]);
        assert!(g.dependents_of(&p("A")).is_empty());
        assert!(g.dependents_of(&p("missing")).is_empty());
    }

    #[test]
    fn depth_ignores_back_edges() {
        let mut g = Graph::new();
        g.add_root(node("A", "1.0.0"), Requirement::Any).unwrap();
        g.add_edge(&p("A"), node("B", "1.0.0"), Requirement::Any).unwrap();
        g.add_edge(&p("B"), node("A", "1.0.0"), Requirement::Any).unwrap();
        assert_eq!(g.depth(), 2);
        assert_eq!(g.count_at_depth(0), 1);
        assert_eq!(g.count_at_depth(1), 1);
    }
}
