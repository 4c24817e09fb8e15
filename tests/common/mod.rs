/// Shared test helpers for all strata integration tests.
///
/// Import from any integration test file with:
///   `#[path = "common/mod.rs"] mod common;`
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use strata_core::cancel::CancelToken;
use strata_engine::IndexEngine;

/// Write a project-relative file, creating parent directories.
#[allow(dead_code)]
pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Set up a project from (path, content) pairs and index it.
///
/// Returns (TempDir, engine). Hold the TempDir to keep the tree alive.
#[allow(dead_code)]
pub fn indexed_project(files: &[(&str, &str)]) -> (TempDir, Arc<IndexEngine>) {
    let dir = TempDir::new().unwrap();
    for (rel, content) in files {
        write_file(dir.path(), rel, content);
    }
    let engine = Arc::new(IndexEngine::new());
    engine
        .ensure_indexed(dir.path(), &CancelToken::new())
        .unwrap();
    (dir, engine)
}
