//! Version conflict descriptions and the per-resolution conflict log.

use std::fmt;

use depsolve_core::{ProjectIdentifier, Requirement, SelectedVersion, Value};
use depsolve_util::errors::DepsolveError;

/// Why a project could not take a particular version.
#[derive(Debug, Clone)]
pub enum ConflictKind<M: Value> {
    /// The project already has a different version selected.
    VersionMismatch {
        existing: SelectedVersion<M>,
        requested: SelectedVersion<M>,
    },
    /// Two requirements on the project admit no common version.
    Incompatible {
        existing: Requirement<M>,
        requested: Requirement<M>,
    },
    /// The selected version does not meet the requirement.
    Unsatisfied {
        version: SelectedVersion<M>,
        requirement: Requirement<M>,
    },
    /// None of the available versions meets the requirement.
    NoCandidates {
        requirement: Requirement<M>,
        available: usize,
    },
}

impl<M: Value> fmt::Display for ConflictKind<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::VersionMismatch {
                existing,
                requested,
            } => write!(f, "already selected {existing}, cannot also select {requested}"),
            ConflictKind::Incompatible {
                existing,
                requested,
            } => write!(f, "{requested} is incompatible with {existing}"),
            ConflictKind::Unsatisfied {
                version,
                requirement,
            } => write!(f, "{version} does not satisfy {requirement}"),
            ConflictKind::NoCandidates {
                requirement,
                available: 0,
            } => write!(f, "no versions available (required {requirement})"),
            ConflictKind::NoCandidates {
                requirement,
                available,
            } => write!(f, "none of {available} available versions satisfies {requirement}"),
        }
    }
}

/// A conflict on one project.
#[derive(Debug, Clone)]
pub struct VersionConflict<P: Value, M: Value> {
    pub project: ProjectIdentifier<P>,
    pub kind: ConflictKind<M>,
}

impl<P: Value, M: Value> VersionConflict<P, M> {
    pub fn new(project: ProjectIdentifier<P>, kind: ConflictKind<M>) -> Self {
        Self { project, kind }
    }
}

impl<P: Value, M: Value> fmt::Display for VersionConflict<P, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.project, self.kind)
    }
}

impl<P: Value, M: Value> From<VersionConflict<P, M>> for DepsolveError {
    fn from(conflict: VersionConflict<P, M>) -> Self {
        DepsolveError::conflict(conflict.project.to_string(), conflict.kind.to_string())
    }
}

/// A conflict met during search, with the search depth at which it arose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedConflict {
    pub depth: usize,
    pub project: String,
    pub reason: String,
}

impl RecordedConflict {
    pub fn to_error(&self) -> DepsolveError {
        DepsolveError::conflict(self.project.clone(), self.reason.clone())
    }
}

impl fmt::Display for RecordedConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} (depth {})", self.project, self.reason, self.depth)
    }
}

/// Every conflict encountered during one resolution, in discovery order.
#[derive(Debug, Default)]
pub struct ConflictReport {
    conflicts: Vec<RecordedConflict>,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `error` if it is a conflict. Other errors are ignored.
    pub fn record(&mut self, depth: usize, error: &DepsolveError) {
        if let DepsolveError::Conflict { project, reason } = error {
            self.conflicts.push(RecordedConflict {
                depth,
                project: project.clone(),
                reason: reason.clone(),
            });
        }
    }

    /// The deepest conflict recorded at or after position `mark`. Ties go to
    /// the earliest one.
    pub fn deepest_since(&self, mark: usize) -> Option<&RecordedConflict> {
        self.conflicts
            .get(mark..)?
            .iter()
            .fold(None, |best: Option<&RecordedConflict>, c| match best {
                Some(b) if b.depth >= c.depth => Some(b),
                _ => Some(c),
            })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RecordedConflict> {
        self.conflicts.iter()
    }

    pub fn clear(&mut self) {
        self.conflicts.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return write!(f, "No version conflicts.");
        }
        writeln!(f, "Version conflicts ({}):", self.conflicts.len())?;
        for c in &self.conflicts {
            writeln!(f, "  {c}")?;
        }
        Ok(())
    }
}
