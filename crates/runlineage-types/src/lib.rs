//! Shared data model for runlineage: the orchestrator manifest, parsed log
//! records, run summaries, and the lineage events produced from them.
//!
//! This crate has no I/O; the engine and CLI crates build on it.

pub mod error;
pub mod lineage;
pub mod log;
pub mod manifest;
pub mod summary;

pub use error::{LineageError, Result};
