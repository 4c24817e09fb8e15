//! The strata indexing engine.
//!
//! [`IndexEngine`](orchestrator::IndexEngine) is the single entry point
//! embedding applications use: it wires the analyzer registry, the
//! in-memory symbol index, the persisted catalog, and the graph builder
//! under one project-scoped lifecycle with once-only builds, hash-gated
//! incremental updates, and idempotent file-event handlers.

pub mod orchestrator;
pub mod references;
pub mod watcher;

pub use orchestrator::IndexEngine;
