//! Project tree walking with the fixed skip rules.
//!
//! Directory entries whose names start with `.` or equal one of
//! {node_modules, vendor, build, dist} are never descended into. The walk
//! yields files in a stable order so repeated scans of an unchanged tree
//! visit files identically.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use walkdir::WalkDir;

use crate::AnalyzerRegistry;

/// Directory names skipped during every project walk.
pub const SKIPPED_DIRS: &[&str] = &["node_modules", "vendor", "build", "dist"];

/// Whether a single path component is excluded from walks.
pub fn is_skipped_component(name: &str) -> bool {
    name.starts_with('.') || SKIPPED_DIRS.contains(&name)
}

/// Whether any component of a project-relative path is excluded.
pub fn path_is_skipped(rel_path: &Path) -> bool {
    rel_path.components().any(|c| match c {
        std::path::Component::Normal(name) => {
            name.to_str().is_some_and(is_skipped_component)
        }
        _ => false,
    })
}

/// Project-relative path with forward slashes.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let s = rel.to_string_lossy();
    strata_core::types::normalize_path(&s)
}

/// Walks a project root, yielding analyzable source files.
pub struct ProjectWalker<'a> {
    root: &'a Path,
    registry: &'a AnalyzerRegistry,
    extra_skips: &'a [String],
}

impl<'a> ProjectWalker<'a> {
    pub fn new(root: &'a Path, registry: &'a AnalyzerRegistry) -> Self {
        ProjectWalker {
            root,
            registry,
            extra_skips: &[],
        }
    }

    pub fn with_extra_skips(mut self, extra: &'a [String]) -> Self {
        self.extra_skips = extra;
        self
    }

    fn dir_allowed(&self, name: &str) -> bool {
        !is_skipped_component(name) && !self.extra_skips.iter().any(|s| s == name)
    }

    /// All analyzable files under the root, in sorted walk order.
    ///
    /// Unreadable entries are skipped with a warning; only a failure of the
    /// walk itself would surface here, and `ignore` reports those per-entry,
    /// so this never fails.
    pub fn source_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let walker = WalkBuilder::new(self.root)
            .hidden(false)
            .ignore(false)
            .parents(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .sort_by_file_path(|a, b| a.cmp(b))
            .filter_entry({
                let skips: Vec<String> = self.extra_skips.to_vec();
                move |entry| {
                    // The root itself is exempt; only entries below it are
                    // subject to the skip rules.
                    if entry.depth() == 0 {
                        return true;
                    }
                    let Some(name) = entry.file_name().to_str() else {
                        return false;
                    };
                    if name.starts_with('.') {
                        return false;
                    }
                    if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                        !is_skipped_component(name) && !skips.iter().any(|s| s == name)
                    } else {
                        true
                    }
                }
            })
            .build();

        for result in walker {
            let entry = match result {
                Ok(e) => e,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry.into_path();
            if self.registry.is_supported(&path) {
                files.push(path);
            }
        }

        files
    }

    /// Analyzable files under one subdirectory of the project, applying the
    /// same skip rules. Used by directory-change handlers.
    pub fn files_under(&self, dir: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let walk = WalkDir::new(dir).sort_by_file_name().into_iter();
        let mut it = walk.filter_entry(|entry| {
            if entry.file_type().is_dir() && entry.depth() > 0 {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|n| self.dir_allowed(n))
            } else {
                true
            }
        });
        while let Some(result) = it.next() {
            let entry = match result {
                Ok(e) => e,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            let rel = path.strip_prefix(self.root).unwrap_or(&path);
            if !path_is_skipped(rel) && self.registry.is_supported(&path) {
                files.push(path);
            }
        }
        files
    }
}
