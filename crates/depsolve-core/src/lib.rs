//! Core data types for depsolve.
//!
//! This crate defines the vocabulary the resolver works in: semantic
//! versions, caller-owned values, project identifiers, version requirements,
//! dependency lists, selected versions, and resolver configuration.
//!
//! This crate performs no I/O apart from reading a configuration file.

pub mod config;
pub mod dependency;
pub mod project;
pub mod requirement;
pub mod selected;
pub mod value;
pub mod version;

pub use dependency::{Dependency, DependencyList, ResolvedDependency};
pub use project::ProjectIdentifier;
pub use requirement::{Requirement, Strictness};
pub use selected::{SelectedVersion, SelectedVersionList};
pub use value::{OpaqueValue, Value};
pub use version::SemanticVersion;
