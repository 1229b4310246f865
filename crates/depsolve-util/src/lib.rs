//! Shared utilities for depsolve.
//!
//! This crate provides cross-cutting concerns used by the other depsolve
//! crates: the unified error type and cooperative cancellation.

pub mod cancel;
pub mod errors;
