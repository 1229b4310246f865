use miette::Diagnostic;
use thiserror::Error;

/// Boxed error produced by caller-supplied lookups.
pub type BoxedSourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Unified error type for all depsolve operations.
#[derive(Debug, Error, Diagnostic)]
pub enum DepsolveError {
    /// A version string or label did not follow `MAJOR.MINOR.PATCH[-PRERELEASE][+BUILD]`.
    #[error("Invalid version '{input}': {reason}")]
    #[diagnostic(code(depsolve::invalid_version))]
    InvalidVersion { input: String, reason: String },

    /// A requirement string could not be understood.
    #[error("Invalid requirement '{input}': {reason}")]
    #[diagnostic(
        code(depsolve::invalid_requirement),
        help("Use `*`, `>= 1.2.3`, `~> 1.2.3`, `== 1.2.3` or a bare version")
    )]
    InvalidRequirement { input: String, reason: String },

    /// No version of a project satisfies every requirement placed upon it.
    #[error("Version conflict for {project}: {reason}")]
    #[diagnostic(code(depsolve::conflict))]
    Conflict { project: String, reason: String },

    /// A caller-supplied lookup failed; resolution was aborted.
    #[error("Failed to {operation} for {project}")]
    #[diagnostic(code(depsolve::callback))]
    Callback {
        project: String,
        operation: String,
        #[source]
        source: BoxedSourceError,
    },

    /// The resolved graph contains a cycle and has no installation order.
    #[error("Dependency cycle detected: {cycle}")]
    #[diagnostic(
        code(depsolve::cycle),
        help("Projects that depend on each other cannot be installed in phases")
    )]
    Cycle { cycle: String },

    /// Resolution was aborted by the caller.
    #[error("Dependency resolution was cancelled")]
    #[diagnostic(code(depsolve::cancelled))]
    Cancelled,

    /// A graph operation referenced a project that is not part of the graph.
    #[error("Project {project} is not part of the dependency graph")]
    #[diagnostic(code(depsolve::unknown_project))]
    UnknownProject { project: String },

    /// Invalid resolver configuration.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check the [resolver] table of your configuration file"))]
    Config { message: String },

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DepsolveError {
    /// Whether this error describes unsatisfiable constraints, as opposed to a
    /// failure that must abort resolution immediately.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DepsolveError::Conflict { .. })
    }

    pub fn conflict(project: impl Into<String>, reason: impl Into<String>) -> Self {
        DepsolveError::Conflict {
            project: project.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for results carrying a [`DepsolveError`].
pub type DepsolveResult<T> = Result<T, DepsolveError>;
