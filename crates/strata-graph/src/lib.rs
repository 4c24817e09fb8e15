//! Call-graph and file-dependency graph construction and queries.
//!
//! Both graphs are derived from one filesystem scan and rebuilt wholesale
//! per project: [`build`] walks the tree, [`model`] stores the cyclic graphs
//! as interned integer-indexed adjacency (no ownership pointers between
//! nodes), [`query`] implements the traversals, and [`mermaid`] renders
//! deterministic capped exports.

pub mod build;
pub mod mermaid;
pub mod model;
pub mod query;

pub use build::GraphBuilder;
