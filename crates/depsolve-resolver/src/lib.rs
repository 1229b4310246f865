//! Dependency resolution engine: backtracking version selection over
//! caller-supplied lookups, the resolved dependency graph, and install
//! phase computation.

pub mod cache;
pub mod conflict;
pub mod graph;
pub mod installer;
pub mod resolver;

pub use graph::ResolvedDependencyGraph;
pub use installer::Installer;
pub use resolver::{ResolutionStats, Resolver, ResolverBehaviors};
