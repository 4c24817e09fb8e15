//! Core types, hashing, and cancellation for strata.
//!
//! This crate provides the foundational data structures used across all
//! strata crates:
//! - [`types`] — Symbols, imports, exports, references, and error types
//! - [`hash`] — Content hashing for change detection (hex of xxh3-128)
//! - [`cancel`] — Cooperative cancellation token for long-running scans
//! - [`latch`] — Single-flight latch behind every build-once entry point
//! - [`settings`] — Optional project-local configuration from `.strata/config.json`

pub mod cancel;
pub mod hash;
pub mod latch;
pub mod settings;
pub mod types;
