//! Core dependency resolution algorithm: newest-first candidate selection
//! with conflict-directed backjumping over an explicit stack of decisions.
//!
//! Projects are expanded in first-seen order. Every requirement asserted on a
//! project before it is expanded is merged into one aggregate, so two
//! mutually exclusive requirements fail the branch before anything is
//! fetched. Requirements that arrive after a project has a version are
//! checked against the selected version instead.
//!
//! Each decision is a [`Frame`]. When a branch fails, the frames whose
//! choices took part in the failure are collected and the search resumes at
//! the newest of them; decisions in between are discarded untried, since no
//! choice there can remove the failure.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::error::Error;
use std::sync::Arc;

use depsolve_core::config::ResolverConfig;
use depsolve_core::{
    DependencyList, ProjectIdentifier, Requirement, ResolvedDependency, SelectedVersion,
    SelectedVersionList, Value,
};
use depsolve_util::cancel::CancellationToken;
use depsolve_util::errors::{DepsolveError, DepsolveResult};
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::cache::FetchCache;
use crate::conflict::{ConflictKind, ConflictReport, RecordedConflict, VersionConflict};
use crate::graph::ResolvedDependencyGraph;

/// Lookups the resolver pulls project data through.
///
/// Implementations return data only. Availability lookups for unrelated
/// projects may run concurrently, hence the `Sync` bound. Each lookup is made
/// at most once per project (or project and version) within a resolution,
/// and a failed lookup is never retried.
pub trait ResolverBehaviors<P: Value, M: Value>: Sync {
    type Error: Error + Send + Sync + 'static;

    /// The dependencies declared by `project` at `version`. Must return the
    /// same list every time it is asked about the same pair.
    fn list_dependencies(
        &self,
        project: &ProjectIdentifier<P>,
        version: &SelectedVersion<M>,
    ) -> Result<DependencyList<P, M>, Self::Error>;

    /// Every version of `project` that could be selected. An empty list is
    /// not an error.
    fn list_available_versions(
        &self,
        project: &ProjectIdentifier<P>,
    ) -> Result<SelectedVersionList<M>, Self::Error>;

    /// The caller's canonical selected version for `metadata`, if it has one.
    fn selected_version_for_metadata(&self, _metadata: &M) -> Option<SelectedVersion<M>> {
        None
    }
}

/// Counters from the most recent call to [`Resolver::resolve`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    pub candidates_tried: usize,
    /// Rejected candidates plus jumps back to an earlier decision.
    pub backtracks: usize,
    pub conflicts: usize,
}

/// Who asserted a requirement on a pending project. `None` is the root list.
#[derive(Debug, Clone)]
struct Origin<P: Value, M: Value> {
    dependent: Option<ProjectIdentifier<P>>,
    requirement: Requirement<M>,
}

/// A project waiting for a version.
#[derive(Debug, Clone)]
struct Pending<P: Value, M: Value> {
    project: ProjectIdentifier<P>,
    requirement: Requirement<M>,
    origins: Vec<Origin<P, M>>,
}

/// Everything one search branch owns. Branches never share state: trying a
/// candidate works on a copy of the state its decision started from.
#[derive(Debug, Clone)]
struct SearchState<P: Value, M: Value> {
    graph: ResolvedDependencyGraph<P, M>,
    pending: VecDeque<Pending<P, M>>,
}

impl<P: Value, M: Value> Default for SearchState<P, M> {
    fn default() -> Self {
        Self {
            graph: ResolvedDependencyGraph::new(),
            pending: VecDeque::new(),
        }
    }
}

impl<P: Value, M: Value> SearchState<P, M> {
    /// Assert `requirement` on `project`. Returns `true` when the project was
    /// newly queued.
    fn require(
        &mut self,
        dependent: Option<&ProjectIdentifier<P>>,
        project: &ProjectIdentifier<P>,
        requirement: &Requirement<M>,
    ) -> DepsolveResult<bool> {
        if let Some(version) = self.graph.version_of(project) {
            let dependency = ResolvedDependency::new(project.clone(), version);
            match dependent {
                Some(dependent) => self.graph.add_edge(dependent, dependency, requirement.clone())?,
                None => self.graph.add_root(dependency, requirement.clone())?,
            }
            return Ok(false);
        }

        let origin = Origin {
            dependent: dependent.cloned(),
            requirement: requirement.clone(),
        };
        if let Some(pending) = self.pending.iter_mut().find(|p| &p.project == project) {
            let merged = pending.requirement.merge(requirement).ok_or_else(|| {
                VersionConflict::new(
                    project.clone(),
                    ConflictKind::Incompatible {
                        existing: pending.requirement.clone(),
                        requested: requirement.clone(),
                    },
                )
            })?;
            pending.requirement = merged;
            pending.origins.push(origin);
            return Ok(false);
        }

        self.pending.push_back(Pending {
            project: project.clone(),
            requirement: requirement.clone(),
            origins: vec![origin],
        });
        Ok(true)
    }
}

/// One decision on the search stack.
struct Frame<P: Value, M: Value> {
    pending: Pending<P, M>,
    /// Candidates not tried yet, newest first.
    candidates: std::vec::IntoIter<SelectedVersion<M>>,
    /// The state the decision started from. Emptied once the last candidate
    /// has taken it.
    base: SearchState<P, M>,
    /// Earlier frames whose choices took part in a failure of this one.
    blame: BTreeSet<usize>,
}

/// Why a candidate could not be selected.
enum Rejection<P: Value> {
    /// Unsatisfiable constraints on `project`; the search moves on.
    Conflict {
        project: ProjectIdentifier<P>,
        error: DepsolveError,
    },
    /// A lookup failed; resolution stops.
    Fatal(DepsolveError),
}

impl<P: Value> Rejection<P> {
    fn on(project: &ProjectIdentifier<P>, error: DepsolveError) -> Self {
        if error.is_conflict() {
            Rejection::Conflict {
                project: project.clone(),
                error,
            }
        } else {
            Rejection::Fatal(error)
        }
    }
}

/// Resolves a root dependency list into a [`ResolvedDependencyGraph`].
pub struct Resolver<P: Value, M: Value, B: ResolverBehaviors<P, M>> {
    behaviors: B,
    dependencies: DependencyList<P, M>,
    initial_graph: Option<ResolvedDependencyGraph<P, M>>,
    config: ResolverConfig,
    cancellation: CancellationToken,
    cache: FetchCache<P, M>,
    conflicts: ConflictReport,
    stats: ResolutionStats,
}

impl<P: Value, M: Value, B: ResolverBehaviors<P, M>> Resolver<P, M, B> {
    pub fn new(behaviors: B, dependencies: DependencyList<P, M>) -> Self {
        Self {
            behaviors,
            dependencies,
            initial_graph: None,
            config: ResolverConfig::default(),
            cancellation: CancellationToken::new(),
            cache: FetchCache::new(),
            conflicts: ConflictReport::new(),
            stats: ResolutionStats::default(),
        }
    }

    /// Start from a previous resolution. Its nodes are kept as selected and
    /// are not expanded again; use
    /// [`ResolvedDependencyGraph::graph_with_new_roots`] to drop the parts
    /// that should be re-resolved.
    pub fn with_initial_graph(mut self, graph: ResolvedDependencyGraph<P, M>) -> Self {
        self.initial_graph = Some(graph);
        self
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn behaviors(&self) -> &B {
        &self.behaviors
    }

    pub fn dependencies(&self) -> &DependencyList<P, M> {
        &self.dependencies
    }

    pub fn stats(&self) -> ResolutionStats {
        self.stats
    }

    /// Conflicts met by the most recent resolution, including the ones
    /// recovered from by backtracking.
    pub fn conflicts(&self) -> &ConflictReport {
        &self.conflicts
    }

    /// Resolve the root dependencies.
    ///
    /// Fails with a conflict error when no assignment satisfies every
    /// requirement, with a callback error as soon as a lookup fails, and
    /// with [`DepsolveError::Cancelled`] once the cancellation token trips.
    /// Nothing partial is returned on failure.
    pub fn resolve(&mut self) -> DepsolveResult<ResolvedDependencyGraph<P, M>> {
        self.stats = ResolutionStats::default();
        self.conflicts.clear();
        self.cancellation.check()?;

        let pool = self.prefetch_pool()?;
        let mut state = SearchState {
            graph: self.initial_graph.clone().unwrap_or_default(),
            pending: VecDeque::new(),
        };
        for dependency in self.dependencies.iter() {
            state.require(None, &dependency.project, &dependency.requirement)?;
        }
        let queued: Vec<ProjectIdentifier<P>> =
            state.pending.iter().map(|p| p.project.clone()).collect();
        self.prefetch(pool.as_ref(), &queued);

        let result = self.search(state, pool.as_ref());
        self.stats.conflicts = self.conflicts.len();

        match &result {
            Ok(graph) => tracing::info!(
                "Resolved {} projects ({} candidates tried, {} backtracks)",
                graph.len(),
                self.stats.candidates_tried,
                self.stats.backtracks
            ),
            Err(e) => tracing::debug!("Resolution failed: {e}"),
        }
        result
    }

    fn search(
        &mut self,
        mut state: SearchState<P, M>,
        pool: Option<&ThreadPool>,
    ) -> DepsolveResult<ResolvedDependencyGraph<P, M>> {
        let mut frames: Vec<Frame<P, M>> = Vec::new();
        // Project -> index of the frame that selected it.
        let mut owners: HashMap<ProjectIdentifier<P>, usize> = HashMap::new();

        loop {
            self.cancellation.check()?;
            let Some(next) = state.pending.pop_front() else {
                return Ok(state.graph);
            };

            let available = self.available_versions(&next.project)?;
            let candidates: Vec<SelectedVersion<M>> = available
                .iter()
                .filter(|v| next.requirement.satisfied_by(v))
                .cloned()
                .collect();
            tracing::trace!(
                "{}: {} of {} versions satisfy {}",
                next.project,
                candidates.len(),
                available.len(),
                next.requirement
            );

            let blame = origin_frames(&next, &owners);
            let failure = if candidates.is_empty() {
                let error: DepsolveError = VersionConflict::new(
                    next.project.clone(),
                    ConflictKind::NoCandidates {
                        requirement: next.requirement.clone(),
                        available: available.len(),
                    },
                )
                .into();
                self.conflicts.record(frames.len(), &error);
                Some(blame)
            } else {
                owners.insert(next.project.clone(), frames.len());
                frames.push(Frame {
                    pending: next,
                    candidates: candidates.into_iter(),
                    base: std::mem::take(&mut state),
                    blame,
                });
                None
            };

            state = self.advance(&mut frames, &mut owners, failure, pool)?;
        }
    }

    /// Select the next viable candidate and return the branch it produced.
    ///
    /// Without a `failure`, the newest frame is continued. With one, the
    /// search first jumps to the newest frame the failure implicates. A
    /// frame that runs out of candidates fails in turn, implicating the
    /// frames in its blame set.
    fn advance(
        &mut self,
        frames: &mut Vec<Frame<P, M>>,
        owners: &mut HashMap<ProjectIdentifier<P>, usize>,
        mut failure: Option<BTreeSet<usize>>,
        pool: Option<&ThreadPool>,
    ) -> DepsolveResult<SearchState<P, M>> {
        loop {
            if let Some(implicated) = failure.take() {
                let Some(&target) = implicated.last() else {
                    return Err(self.unsatisfiable());
                };
                self.stats.backtracks += 1;
                for dropped in frames.drain(target + 1..) {
                    owners.remove(&dropped.pending.project);
                }
                if let Some(frame) = frames.last_mut() {
                    tracing::debug!("Backjumping to {} at depth {target}", frame.pending.project);
                    frame
                        .blame
                        .extend(implicated.into_iter().filter(|&i| i != target));
                }
            }

            let depth = frames.len().saturating_sub(1);
            let Some(frame) = frames.last_mut() else {
                return Err(self.unsatisfiable());
            };
            let Some(candidate) = frame.candidates.next() else {
                failure = Some(std::mem::take(&mut frame.blame));
                continue;
            };

            self.cancellation.check()?;
            self.stats.candidates_tried += 1;
            tracing::debug!("Selecting {} {candidate} at depth {depth}", frame.pending.project);
            let mut branch = if frame.candidates.as_slice().is_empty() {
                std::mem::take(&mut frame.base)
            } else {
                frame.base.clone()
            };

            match self.select(&mut branch, &frame.pending, &candidate, pool) {
                Ok(()) => return Ok(branch),
                Err(Rejection::Fatal(e)) => return Err(e),
                Err(Rejection::Conflict { project, error }) => {
                    tracing::debug!("Rejected {} {candidate}: {error}", frame.pending.project);
                    self.conflicts.record(depth, &error);
                    self.stats.backtracks += 1;
                    frame.blame.extend(
                        implicated_frames(&branch, &project, owners)
                            .into_iter()
                            .filter(|&i| i != depth),
                    );
                }
            }
        }
    }

    /// The error for a search with no decision left to revisit: the deepest
    /// conflict met, ties going to the earliest.
    fn unsatisfiable(&self) -> DepsolveError {
        self.conflicts
            .deepest_since(0)
            .map(RecordedConflict::to_error)
            .unwrap_or_else(|| {
                DepsolveError::conflict("root dependencies", "no candidate could be selected")
            })
    }

    /// Pin `candidate` for `next` in `state` and queue its dependencies.
    fn select(
        &mut self,
        state: &mut SearchState<P, M>,
        next: &Pending<P, M>,
        candidate: &SelectedVersion<M>,
        pool: Option<&ThreadPool>,
    ) -> Result<(), Rejection<P>> {
        let project = &next.project;
        let dependency = ResolvedDependency::new(project.clone(), candidate.clone());
        state
            .graph
            .add_node(dependency.clone(), next.requirement.clone())
            .map_err(|e| Rejection::on(project, e))?;
        for origin in &next.origins {
            let added = match &origin.dependent {
                Some(dependent) => {
                    state
                        .graph
                        .add_edge(dependent, dependency.clone(), origin.requirement.clone())
                }
                None => state
                    .graph
                    .add_root(dependency.clone(), origin.requirement.clone()),
            };
            added.map_err(|e| Rejection::on(project, e))?;
        }

        let children = self
            .dependencies_of(project, candidate)
            .map_err(Rejection::Fatal)?;
        let mut queued = Vec::new();
        for child in children.iter() {
            match state.require(Some(project), &child.project, &child.requirement) {
                Ok(true) => queued.push(child.project.clone()),
                Ok(false) => {}
                Err(e) => return Err(Rejection::on(&child.project, e)),
            }
        }
        self.prefetch(pool, &queued);
        Ok(())
    }

    fn available_versions(
        &mut self,
        project: &ProjectIdentifier<P>,
    ) -> DepsolveResult<Arc<Vec<SelectedVersion<M>>>> {
        if let Some(cached) = self.cache.versions(project) {
            tracing::trace!("Using cached versions of {project}");
            return Ok(cached);
        }
        if let Some(error) = self.cache.take_failure(project) {
            return Err(error);
        }
        let list = self
            .behaviors
            .list_available_versions(project)
            .map_err(|e| callback_error(project, "list available versions", e))?;
        Ok(self.store_versions(project.clone(), list))
    }

    /// Sort newest first, drop repeats of the same version and swap in the
    /// caller's canonical instances.
    fn store_versions(
        &mut self,
        project: ProjectIdentifier<P>,
        list: SelectedVersionList<M>,
    ) -> Arc<Vec<SelectedVersion<M>>> {
        let mut sorted = list.sorted_newest_first();
        sorted.dedup();
        let versions: Vec<SelectedVersion<M>> =
            sorted.into_iter().map(|v| self.canonicalize(v)).collect();
        self.cache.insert_versions(project, versions)
    }

    fn canonicalize(&self, candidate: SelectedVersion<M>) -> SelectedVersion<M> {
        match self.behaviors.selected_version_for_metadata(candidate.metadata()) {
            Some(known) if known.semantic_version() == candidate.semantic_version() => known,
            _ => candidate,
        }
    }

    fn dependencies_of(
        &mut self,
        project: &ProjectIdentifier<P>,
        version: &SelectedVersion<M>,
    ) -> DepsolveResult<Arc<DependencyList<P, M>>> {
        if let Some(cached) = self.cache.dependencies(project, version) {
            tracing::trace!("Using cached dependencies of {project} {version}");
            return Ok(cached);
        }
        let list = self
            .behaviors
            .list_dependencies(project, version)
            .map_err(|e| callback_error(project, "list dependencies", e))?;
        Ok(self
            .cache
            .insert_dependencies(project.clone(), version.clone(), list))
    }

    fn prefetch_pool(&self) -> DepsolveResult<Option<ThreadPool>> {
        if self.config.max_concurrent_fetches <= 1 {
            return Ok(None);
        }
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_concurrent_fetches)
            .build()
            .map(Some)
            .map_err(|e| DepsolveError::Config {
                message: format!("Failed to start fetch pool: {e}"),
            })
    }

    /// Fetch availability for several newly queued projects at once. A failed
    /// lookup is stored and reported when the search reaches that project,
    /// which is where a sequential run would have made the call.
    fn prefetch(&mut self, pool: Option<&ThreadPool>, projects: &[ProjectIdentifier<P>]) {
        let Some(pool) = pool else {
            return;
        };
        let missing: Vec<&ProjectIdentifier<P>> = projects
            .iter()
            .filter(|p| !self.cache.is_fetched(p))
            .collect();
        if missing.len() < 2 {
            return;
        }

        let behaviors = &self.behaviors;
        let fetched: Vec<_> = pool.install(|| {
            missing
                .par_iter()
                .map(|&project| (project.clone(), behaviors.list_available_versions(project)))
                .collect()
        });

        for (project, result) in fetched {
            match result {
                Ok(list) => {
                    self.store_versions(project, list);
                }
                Err(e) => {
                    tracing::debug!("Prefetch of {project} failed: {e}");
                    let error = callback_error(&project, "list available versions", e);
                    self.cache.insert_failure(project, error);
                }
            }
        }
    }
}

/// Frames that selected the dependents which queued `pending`.
fn origin_frames<P: Value, M: Value>(
    pending: &Pending<P, M>,
    owners: &HashMap<ProjectIdentifier<P>, usize>,
) -> BTreeSet<usize> {
    pending
        .origins
        .iter()
        .filter_map(|origin| origin.dependent.as_ref())
        .filter_map(|dependent| owners.get(dependent).copied())
        .collect()
}

/// Frames whose choices constrain `project` in `state`: the one that selected
/// it and the ones that selected anything requiring it.
fn implicated_frames<P: Value, M: Value>(
    state: &SearchState<P, M>,
    project: &ProjectIdentifier<P>,
    owners: &HashMap<ProjectIdentifier<P>, usize>,
) -> BTreeSet<usize> {
    let mut frames: BTreeSet<usize> = state
        .graph
        .dependents_of(project)
        .iter()
        .chain(std::iter::once(project))
        .filter_map(|p| owners.get(p).copied())
        .collect();
    if let Some(pending) = state.pending.iter().find(|p| &p.project == project) {
        frames.extend(origin_frames(pending, owners));
    }
    frames
}

fn callback_error<P: Value, E: Error + Send + Sync + 'static>(
    project: &ProjectIdentifier<P>,
    operation: &str,
    source: E,
) -> DepsolveError {
    DepsolveError::Callback {
        project: project.to_string(),
        operation: operation.to_string(),
        source: Box::new(source),
    }
}
