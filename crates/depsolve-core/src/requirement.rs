//! Version requirements: a small specifier algebra with satisfaction,
//! intersection and priority-aware merging.
//!
//! Requirement strings accept:
//! - `*` (any version)
//! - `>= 1.2.3` (at least)
//! - `~> 1.2.3` (compatible with)
//! - `== 1.2.3` or a bare `1.2.3` (exactly)

use std::fmt;
use std::sync::Arc;

use depsolve_util::errors::{DepsolveError, DepsolveResult};
use serde::{Deserialize, Serialize};

use crate::selected::SelectedVersion;
use crate::value::Value;
use crate::version::SemanticVersion;

/// How strictly `CompatibleWith` treats `0.y.z` releases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strictness {
    /// SemVer proper: `0.y` lines are incompatible with each other, and a
    /// `0.0.z` base is compatible only with releases of that same patch.
    #[default]
    Strict,
    /// Like `Strict`, but any newer patch within a `0.y` line (including
    /// `0.0`) is accepted.
    AllowVersionZeroPatches,
}

/// A caller-supplied test against a selected version.
pub type Predicate<M> = Arc<dyn Fn(&SelectedVersion<M>) -> bool + Send + Sync>;

/// A constraint on the versions of one project.
#[derive(Clone)]
pub enum Requirement<M: Value> {
    /// Satisfied by every version.
    Any,
    /// Satisfied by versions with precedence at or above the floor.
    AtLeast(SemanticVersion),
    /// Satisfied by versions within the base's compatibility line and at or
    /// above the base.
    CompatibleWith(SemanticVersion, Strictness),
    /// Satisfied only by a version equal to the given one (build metadata
    /// aside).
    Exactly(SemanticVersion),
    /// Satisfied only by an unversioned selection carrying equal metadata.
    Unversioned(M),
    /// Satisfied when the predicate returns `true`.
    Custom(Predicate<M>),
    /// Satisfied when every child is.
    Compound(Vec<Requirement<M>>),
    /// A base requirement with a priority index; lower indices win when
    /// requirements are merged. Unprioritized requirements have index 0.
    Prioritized {
        base: Box<Requirement<M>>,
        priority: i32,
    },
}

impl<M: Value> Requirement<M> {
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&SelectedVersion<M>) -> bool + Send + Sync + 'static,
    {
        Requirement::Custom(Arc::new(predicate))
    }

    pub fn prioritized(base: Requirement<M>, priority: i32) -> Self {
        Requirement::Prioritized {
            base: Box::new(base),
            priority,
        }
    }

    /// Whether `version` meets this requirement.
    pub fn satisfied_by(&self, version: &SelectedVersion<M>) -> bool {
        match self {
            Requirement::Any => true,
            Requirement::Unversioned(metadata) => {
                version.is_unversioned() && version.metadata() == metadata
            }
            Requirement::Custom(predicate) => predicate(version),
            Requirement::Compound(children) => children.iter().all(|r| r.satisfied_by(version)),
            Requirement::Prioritized { base, .. } => base.satisfied_by(version),
            Requirement::AtLeast(_) | Requirement::CompatibleWith(..) | Requirement::Exactly(_) => {
                match version.semantic_version() {
                    Some(semantic) => self.satisfied_by_version(semantic),
                    None => false,
                }
            }
        }
    }

    /// Evaluate against a bare semantic version.
    ///
    /// Unversioned requirements never match and custom predicates, which need
    /// the full selected version, are treated as unknown (`false`).
    pub fn satisfied_by_version(&self, version: &SemanticVersion) -> bool {
        match self {
            Requirement::Any => true,
            Requirement::AtLeast(floor) => version >= floor,
            Requirement::CompatibleWith(base, strictness) => {
                compatible_with(base, *strictness, version)
            }
            Requirement::Exactly(exact) => version == exact,
            Requirement::Unversioned(_) | Requirement::Custom(_) => false,
            Requirement::Compound(children) => {
                children.iter().all(|r| r.satisfied_by_version(version))
            }
            Requirement::Prioritized { base, .. } => base.satisfied_by_version(version),
        }
    }

    /// The priority index; lower numbers take precedence.
    pub fn priority(&self) -> i32 {
        match self {
            Requirement::Prioritized { priority, .. } => *priority,
            Requirement::Compound(children) => {
                children.iter().map(Self::priority).min().unwrap_or(0)
            }
            _ => 0,
        }
    }

    /// The requirement stripped of any priority wrapper.
    pub fn base(&self) -> &Requirement<M> {
        match self {
            Requirement::Prioritized { base, .. } => base.base(),
            other => other,
        }
    }

    /// The simplest requirement satisfied by exactly the versions that satisfy
    /// both `self` and `other`, or `None` when no version can.
    ///
    /// Pairs that cannot be simplified (custom predicates, mixed compounds)
    /// are combined into a `Compound`.
    pub fn intersect(&self, other: &Requirement<M>) -> Option<Requirement<M>> {
        use Requirement::*;

        match (self, other) {
            (Prioritized { .. }, _) | (_, Prioritized { .. }) => self.merge(other),
            (Any, _) => Some(other.clone()),
            (_, Any) => Some(self.clone()),
            (Compound(children), _) => intersect_into(children.clone(), other),
            (_, Compound(_)) => intersect_into(vec![self.clone()], other),
            (Custom(_), _) | (_, Custom(_)) => Some(Compound(vec![self.clone(), other.clone()])),
            (Unversioned(a), Unversioned(b)) => (a == b).then(|| self.clone()),
            (Unversioned(_), _) | (_, Unversioned(_)) => None,
            (Exactly(exact), _) => other.satisfied_by_version(exact).then(|| self.clone()),
            (_, Exactly(exact)) => self.satisfied_by_version(exact).then(|| other.clone()),
            (AtLeast(a), AtLeast(b)) => Some(AtLeast(a.max(b).clone())),
            (AtLeast(floor), CompatibleWith(base, strictness))
            | (CompatibleWith(base, strictness), AtLeast(floor)) => {
                if base >= floor {
                    Some(CompatibleWith(base.clone(), *strictness))
                } else if compatible_with(base, *strictness, floor) {
                    Some(CompatibleWith(floor.clone(), *strictness))
                } else {
                    None
                }
            }
            (CompatibleWith(a, sa), CompatibleWith(b, sb)) => {
                let ((low, low_strictness), high) = if a <= b { ((a, *sa), b) } else { ((b, *sb), a) };
                let strictness = if *sa == Strictness::Strict || *sb == Strictness::Strict {
                    Strictness::Strict
                } else {
                    Strictness::AllowVersionZeroPatches
                };
                compatible_with(low, low_strictness, high)
                    .then(|| CompatibleWith(high.clone(), strictness))
            }
        }
    }

    /// Combine two requirements asserted against the same project.
    ///
    /// A requirement with a strictly lower priority index replaces the other
    /// outright; otherwise the two are intersected. Returns `None` when the
    /// result is provably unsatisfiable.
    pub fn merge(&self, other: &Requirement<M>) -> Option<Requirement<M>> {
        let (lhs, rhs) = (self.priority(), other.priority());
        if lhs < rhs {
            return Some(self.clone());
        }
        if rhs < lhs {
            return Some(other.clone());
        }
        let merged = strip_priority(self).intersect(&strip_priority(other))?;
        Some(if lhs == 0 {
            merged
        } else {
            Requirement::prioritized(merged, lhs)
        })
    }

    /// Parse a requirement string, using `strictness` for `~>` requirements.
    pub fn parse(input: &str, strictness: Strictness) -> DepsolveResult<Self> {
        let trimmed = input.trim();
        let invalid = |reason: &str| DepsolveError::InvalidRequirement {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("empty requirement"));
        }
        if trimmed == "*" {
            return Ok(Requirement::Any);
        }

        let (operator, rest) = ["==", ">=", "~>"]
            .iter()
            .find_map(|&op| trimmed.strip_prefix(op).map(|rest| (op, rest.trim_start())))
            .unwrap_or(("==", trimmed));

        let version = rest.parse::<SemanticVersion>().map_err(|e| match e {
            DepsolveError::InvalidVersion { reason, .. } => invalid(&reason),
            other => other,
        })?;

        Ok(match operator {
            ">=" => Requirement::AtLeast(version),
            "~>" => Requirement::CompatibleWith(version, strictness),
            _ => Requirement::Exactly(version),
        })
    }
}

fn strip_priority<M: Value>(requirement: &Requirement<M>) -> Requirement<M> {
    match requirement {
        Requirement::Prioritized { base, .. } => strip_priority(base),
        Requirement::Compound(children) => {
            Requirement::Compound(children.iter().map(strip_priority).collect())
        }
        other => other.clone(),
    }
}

/// Fold `other` into a list of conjoined children, simplifying against the
/// first child it combines with.
fn intersect_into<M: Value>(
    mut children: Vec<Requirement<M>>,
    other: &Requirement<M>,
) -> Option<Requirement<M>> {
    let incoming = match other {
        Requirement::Compound(more) => more.clone(),
        single => vec![single.clone()],
    };

    'incoming: for requirement in incoming {
        for child in children.iter_mut() {
            if is_simple(child) && is_simple(&requirement) {
                *child = child.intersect(&requirement)?;
                continue 'incoming;
            }
        }
        children.push(requirement);
    }

    if children.len() == 1 {
        children.pop()
    } else {
        Some(Requirement::Compound(children))
    }
}

fn is_simple<M: Value>(requirement: &Requirement<M>) -> bool {
    !matches!(
        requirement,
        Requirement::Custom(_) | Requirement::Compound(_) | Requirement::Prioritized { .. }
    )
}

fn compatible_with(base: &SemanticVersion, strictness: Strictness, version: &SemanticVersion) -> bool {
    if version.major() != base.major() {
        return false;
    }
    if version.major() == 0 {
        // Every 0.y line may break compatibility.
        if version.minor() != base.minor() {
            return false;
        }
        if version.minor() == 0
            && strictness == Strictness::Strict
            && version.patch() != base.patch()
        {
            return false;
        }
    }
    version >= base
}

impl<M: Value> PartialEq for Requirement<M> {
    fn eq(&self, other: &Self) -> bool {
        use Requirement::*;

        match (self, other) {
            (Any, Any) => true,
            (AtLeast(a), AtLeast(b)) => a == b,
            (CompatibleWith(a, sa), CompatibleWith(b, sb)) => a == b && sa == sb,
            (Exactly(a), Exactly(b)) => a == b,
            (Unversioned(a), Unversioned(b)) => a == b,
            (Custom(a), Custom(b)) => Arc::ptr_eq(a, b),
            (Compound(a), Compound(b)) => a == b,
            (
                Prioritized {
                    base: a,
                    priority: pa,
                },
                Prioritized {
                    base: b,
                    priority: pb,
                },
            ) => pa == pb && a == b,
            _ => false,
        }
    }
}

impl<M: Value> fmt::Display for Requirement<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Any => write!(f, "(any version)"),
            Requirement::AtLeast(v) => write!(f, ">={v}"),
            Requirement::CompatibleWith(v, _) => write!(f, "~>{v}"),
            Requirement::Exactly(v) => write!(f, "=={v}"),
            Requirement::Unversioned(metadata) => write!(f, "unversioned {metadata}"),
            Requirement::Custom(_) => write!(f, "(custom predicate)"),
            Requirement::Compound(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " && ")?;
                    }
                    write!(f, "{child}")?;
                }
                Ok(())
            }
            Requirement::Prioritized { base, priority } => {
                write!(f, "{base} (priority {priority})")
            }
        }
    }
}

impl<M: Value> fmt::Debug for Requirement<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::CompatibleWith(v, strictness) => {
                write!(f, "CompatibleWith({v}, {strictness:?})")
            }
            Requirement::Unversioned(metadata) => write!(f, "Unversioned({metadata:?})"),
            Requirement::Compound(children) => f.debug_list().entries(children).finish(),
            other => write!(f, "{other}"),
        }
    }
}
