//! The indexing orchestrator.
//!
//! One `IndexEngine` owns the analyzer registry, the in-memory symbol index
//! behind a reader/writer lock, the persisted catalog, and the graph
//! builder. `ensure_indexed` runs at most one scan per root behind a
//! single-flight latch; a failed build's error stays sticky for concurrent
//! callers until `invalidate`. Per-file handlers are idempotent with respect
//! to (path, content hash).

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use rayon::prelude::*;

use strata_analyzers::walker::{path_is_skipped, relative_path, ProjectWalker};
use strata_analyzers::AnalyzerRegistry;
use strata_core::cancel::CancelToken;
use strata_core::latch::{Admission, BuildLatch};
use strata_core::settings::Settings;
use strata_core::types::{IndexError, IndexStats, Symbol, SymbolKind, SymbolRef};
use strata_graph::GraphBuilder;
use strata_index::catalog::SymbolCatalog;
use strata_index::memory::SymbolIndex;

use crate::references;

struct ProjectState {
    root: Option<PathBuf>,
    catalog: Option<Arc<SymbolCatalog>>,
    settings: Settings,
}

pub struct IndexEngine {
    registry: Arc<AnalyzerRegistry>,
    index: RwLock<SymbolIndex>,
    graph: GraphBuilder,
    latch: BuildLatch,
    project: Mutex<ProjectState>,
}

/// Per-file result of the incremental walk phase.
struct ScannedFile {
    rel: String,
    hash: String,
    /// `None` when the cached hash matched and the file was skipped.
    symbols: Option<Vec<Symbol>>,
}

impl IndexEngine {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(AnalyzerRegistry::with_default_languages()))
    }

    pub fn with_registry(registry: Arc<AnalyzerRegistry>) -> Self {
        IndexEngine {
            graph: GraphBuilder::new(Arc::clone(&registry)),
            registry,
            index: RwLock::new(SymbolIndex::new()),
            latch: BuildLatch::new(),
            project: Mutex::new(ProjectState {
                root: None,
                catalog: None,
                settings: Settings::default(),
            }),
        }
    }

    pub fn registry(&self) -> &AnalyzerRegistry {
        &self.registry
    }

    pub fn graph(&self) -> &GraphBuilder {
        &self.graph
    }

    /// The root of the last (attempted) index, if any.
    pub fn current_root(&self) -> Option<PathBuf> {
        self.project_lock().root.clone()
    }

    fn project_lock(&self) -> std::sync::MutexGuard<'_, ProjectState> {
        self.project.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_index(&self) -> std::sync::RwLockReadGuard<'_, SymbolIndex> {
        self.index.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_index(&self) -> std::sync::RwLockWriteGuard<'_, SymbolIndex> {
        self.index.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Index `root` once. Subsequent calls for the same root return the
    /// cached outcome (success or sticky error); a different root
    /// invalidates in-memory state first and rebuilds incrementally from
    /// the new root's catalog.
    pub fn ensure_indexed(&self, root: &Path, cancel: &CancelToken) -> Result<(), IndexError> {
        match self.latch.begin(root)? {
            Admission::AlreadyBuilt => Ok(()),
            Admission::Build { root_changed } => {
                if root_changed {
                    self.write_index().clear();
                    self.graph.invalidate();
                    let mut project = self.project_lock();
                    project.catalog = None;
                    project.root = None;
                }
                let result = self.index_project(root, cancel);
                self.latch.complete(root, &result);
                result
            }
        }
    }

    /// Wipe in-memory state and reset the latch. The persisted catalog is
    /// untouched so the next `ensure_indexed` reindexes incrementally.
    pub fn invalidate(&self) {
        self.latch.reset();
        self.write_index().clear();
        self.graph.invalidate();
    }

    fn open_catalog(&self, root: &Path) -> Result<Arc<SymbolCatalog>, IndexError> {
        let mut project = self.project_lock();
        if project.root.as_deref() == Some(root) {
            if let Some(catalog) = &project.catalog {
                return Ok(Arc::clone(catalog));
            }
        }

        let settings = match Settings::load(root) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring malformed settings, using defaults");
                Settings::default()
            }
        };
        let catalog = Arc::new(
            SymbolCatalog::open(&settings.catalog_path(root))
                .map_err(|e| IndexError::Catalog(e.to_string()))?,
        );
        project.root = Some(root.to_path_buf());
        project.settings = settings;
        project.catalog = Some(Arc::clone(&catalog));
        Ok(catalog)
    }

    fn catalog(&self) -> Result<Arc<SymbolCatalog>, IndexError> {
        self.project_lock()
            .catalog
            .clone()
            .ok_or_else(|| IndexError::Invariant("no project indexed".to_string()))
    }

    /// The full incremental scan: hash-gate against the catalog, reindex
    /// changed files, drop removed ones, then reload the in-memory index
    /// from the catalog and build the graphs from the same walk.
    ///
    /// The write side of the index lock is held for the entirety of the
    /// scan. Queries issued while a project is indexing block until the new
    /// state is published; a cancelled or failed scan releases the lock with
    /// the pre-scan state intact.
    fn index_project(&self, root: &Path, cancel: &CancelToken) -> Result<(), IndexError> {
        let catalog = self.open_catalog(root)?;
        let cached = catalog
            .file_hashes()
            .map_err(|e| IndexError::Catalog(e.to_string()))?;
        let extra_skips = self.project_lock().settings.extra_skip_dirs.clone();

        let mut index = self.write_index();

        let walker = ProjectWalker::new(root, &self.registry).with_extra_skips(&extra_skips);
        let files = walker.source_files();
        tracing::info!(files = files.len(), root = %root.display(), "indexing project");

        let scanned: Vec<Option<ScannedFile>> = files
            .par_iter()
            .map(|path| {
                if cancel.is_cancelled() {
                    return None;
                }
                self.scan_file(root, path, &cached)
            })
            .collect();
        cancel.check()?;

        let scanned: Vec<ScannedFile> = scanned.into_iter().flatten().collect();
        let visited: HashSet<&str> = scanned.iter().map(|f| f.rel.as_str()).collect();

        // Cached rows whose file was not visited this pass are removals.
        for path in cached.keys() {
            if !visited.contains(path.as_str()) {
                tracing::debug!(file = %path, "dropping removed file from catalog");
                catalog
                    .remove_file(path)
                    .map_err(|e| IndexError::Catalog(e.to_string()))?;
            }
        }

        let mut reindexed = 0usize;
        for file in &scanned {
            cancel.check()?;
            if let Some(symbols) = &file.symbols {
                catalog
                    .replace_file(&file.rel, &file.hash, symbols)
                    .map_err(|e| IndexError::Catalog(e.to_string()))?;
                reindexed += 1;
            }
        }
        tracing::debug!(reindexed, total = scanned.len(), "incremental pass done");

        // Both graphs derive from the walk above, not a second one, so the
        // symbol index and the two graphs describe the same scan pass.
        self.graph.ensure_built_from(root, &files, cancel)?;

        // The catalog is now the truth; rebuild the in-memory index from it.
        // This is the last fallible step, so a cancelled or failed scan
        // never publishes a partial index.
        let symbols = catalog
            .load_all_symbols()
            .map_err(|e| IndexError::Catalog(e.to_string()))?;
        index.clear();
        index.add_symbols(symbols);
        Ok(())
    }

    fn scan_file(
        &self,
        root: &Path,
        path: &Path,
        cached: &HashMap<String, String>,
    ) -> Option<ScannedFile> {
        let rel = relative_path(root, path);
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(file = %rel, error = %err, "unanalyzable this pass");
                // Keep any cached rows; the file still exists, it just
                // could not be read right now.
                return cached.get(&rel).map(|hash| ScannedFile {
                    hash: hash.clone(),
                    rel,
                    symbols: None,
                });
            }
        };
        let hash = strata_core::hash::content_hash(&bytes);
        if cached.get(&rel) == Some(&hash) {
            return Some(ScannedFile {
                rel,
                hash,
                symbols: None,
            });
        }

        let analyzer = self.registry.for_path(path)?;
        let source = String::from_utf8_lossy(&bytes);
        let symbols = analyzer.symbols(&rel, &source);
        Some(ScannedFile {
            rel,
            hash,
            symbols: Some(symbols),
        })
    }

    /// Remove one file's symbols from the in-memory index only.
    pub fn invalidate_file(&self, path: &Path) {
        let rel = self.rel_of(path);
        self.write_index().remove_file(&rel);
    }

    fn rel_of(&self, path: &Path) -> String {
        match self.current_root() {
            Some(root) => relative_path(&root, path),
            None => strata_core::types::normalize_path(&path.to_string_lossy()),
        }
    }

    /// Handle a change event for one file. Gated on the content hash: when
    /// the catalog already holds this exact content, nothing is written and
    /// nothing in memory moves.
    pub fn on_file_changed(&self, path: &Path, root: &Path) -> Result<(), IndexError> {
        let rel = relative_path(root, path);
        if path_is_skipped(Path::new(&rel)) {
            return Ok(());
        }
        if !path.exists() {
            return self.on_file_deleted(path, root);
        }
        let Some(analyzer) = self.registry.for_path(path) else {
            return Ok(());
        };

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(file = %rel, error = %err, "change event on unreadable file");
                return Ok(());
            }
        };
        let hash = strata_core::hash::content_hash(&bytes);
        let catalog = self.catalog()?;
        if catalog
            .hash_for(&rel)
            .map_err(|e| IndexError::Catalog(e.to_string()))?
            .as_deref()
            == Some(hash.as_str())
        {
            return Ok(());
        }

        let source = String::from_utf8_lossy(&bytes);
        let symbols = analyzer.symbols(&rel, &source);

        // Catalog first; a failed write must leave memory untouched.
        catalog
            .replace_file(&rel, &hash, &symbols)
            .map_err(|e| IndexError::Catalog(e.to_string()))?;

        let mut index = self.write_index();
        index.remove_file(&rel);
        index.add_symbols(symbols);
        tracing::debug!(file = %rel, "reindexed changed file");
        Ok(())
    }

    /// Handle a deletion event: drop the file from catalog and memory.
    pub fn on_file_deleted(&self, path: &Path, root: &Path) -> Result<(), IndexError> {
        let rel = relative_path(root, path);
        let catalog = self.catalog()?;
        catalog
            .remove_file(&rel)
            .map_err(|e| IndexError::Catalog(e.to_string()))?;
        self.write_index().remove_file(&rel);
        tracing::debug!(file = %rel, "removed deleted file");
        Ok(())
    }

    /// Apply `on_file_changed` to every analyzable file under `dir`.
    pub fn on_directory_changed(
        &self,
        dir: &Path,
        root: &Path,
        cancel: &CancelToken,
    ) -> Result<(), IndexError> {
        let extra_skips = self.project_lock().settings.extra_skip_dirs.clone();
        let walker = ProjectWalker::new(root, &self.registry).with_extra_skips(&extra_skips);
        for file in walker.files_under(dir) {
            cancel.check()?;
            self.on_file_changed(&file, root)?;
        }
        Ok(())
    }

    // ----- query surface, read side of the index lock -----

    pub fn search_symbols(&self, query: &str) -> Vec<Symbol> {
        self.read_index()
            .search_by_name(query)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn find_by_exact_name(&self, name: &str) -> Vec<Symbol> {
        self.read_index()
            .find_by_exact_name(name)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn symbols_in_file(&self, file: &str) -> Vec<Symbol> {
        self.read_index()
            .symbols_in_file(file)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn symbols_by_kind(&self, kind: SymbolKind) -> Vec<Symbol> {
        self.read_index()
            .symbols_by_kind(kind)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn find_definition(&self, name: &str, kind: Option<SymbolKind>) -> Option<Symbol> {
        self.read_index().find_definition(name, kind).cloned()
    }

    pub fn stats(&self) -> IndexStats {
        self.read_index().stats()
    }

    /// Word-boundary references to `name` across the project, budgeted.
    pub fn find_references(
        &self,
        name: &str,
        kind: Option<SymbolKind>,
        cancel: &CancelToken,
    ) -> Result<Vec<SymbolRef>, IndexError> {
        let Some(root) = self.current_root() else {
            return Ok(Vec::new());
        };
        let (limit, extra_skips) = {
            let project = self.project_lock();
            (
                project.settings.reference_limit,
                project.settings.extra_skip_dirs.clone(),
            )
        };
        references::find_references(
            &root,
            &self.registry,
            &self.index,
            name,
            kind,
            limit,
            &extra_skips,
            cancel,
        )
    }

    /// References that are not the definition itself.
    pub fn find_usages(
        &self,
        name: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<SymbolRef>, IndexError> {
        Ok(self
            .find_references(name, None, cancel)?
            .into_iter()
            .filter(|r| !r.is_definition)
            .collect())
    }
}

impl Default for IndexEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn indexed_engine(root: &Path) -> IndexEngine {
        let engine = IndexEngine::new();
        engine.ensure_indexed(root, &CancelToken::new()).unwrap();
        engine
    }

    #[test]
    fn test_ensure_indexed_go_project() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "main.go",
            "package main\nfunc Hello() { World() }\nfunc World() {}\n",
        );
        let engine = indexed_engine(dir.path());

        let hello = engine.find_definition("Hello", None).unwrap();
        assert_eq!(hello.kind, SymbolKind::Function);
        assert_eq!(hello.line_start, 2);
        let world = engine.find_definition("World", None).unwrap();
        assert_eq!(world.line_start, 3);

        assert_eq!(engine.graph().callers("main.World"), vec!["main.Hello"]);
        assert_eq!(engine.graph().callees("main.Hello"), vec!["main.World"]);
    }

    #[test]
    fn test_scan_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.py", "class C:\n    def m(self):\n        pass\ndef f():\n    pass\n");
        let engine = indexed_engine(dir.path());
        let first = engine.stats();
        let first_symbols = engine.symbols_in_file("a.py");

        engine.invalidate();
        engine
            .ensure_indexed(dir.path(), &CancelToken::new())
            .unwrap();
        assert_eq!(engine.stats(), first);
        assert_eq!(engine.symbols_in_file("a.py"), first_symbols);
    }

    #[test]
    fn test_hash_gate_skips_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "x.rs", "pub fn a(){}\nfn b(){}\n");
        let engine = indexed_engine(dir.path());
        let before = engine.stats();

        // Unchanged content: handler must not disturb anything.
        engine
            .on_file_changed(&dir.path().join("x.rs"), dir.path())
            .unwrap();
        assert_eq!(engine.stats(), before);
    }

    #[test]
    fn test_on_file_changed_updates_index_and_catalog() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "x.rs", "pub fn a(){}\n");
        let engine = indexed_engine(dir.path());
        assert!(engine.find_definition("a", None).is_some());

        write(dir.path(), "x.rs", "pub fn renamed(){}\n");
        engine
            .on_file_changed(&dir.path().join("x.rs"), dir.path())
            .unwrap();

        assert!(engine.find_definition("a", None).is_none());
        assert!(engine.find_definition("renamed", None).is_some());
    }

    #[test]
    fn test_on_file_deleted() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "x.rs", "pub fn a(){}\n");
        write(dir.path(), "y.rs", "pub fn keep(){}\n");
        let engine = indexed_engine(dir.path());

        fs::remove_file(dir.path().join("x.rs")).unwrap();
        engine
            .on_file_changed(&dir.path().join("x.rs"), dir.path())
            .unwrap();

        assert!(engine.find_definition("a", None).is_none());
        assert!(engine.find_definition("keep", None).is_some());
    }

    #[test]
    fn test_incremental_matches_fresh_scan() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.rs", "pub fn one(){}\n");
        write(dir.path(), "b.rs", "pub fn two(){}\n");
        let engine = indexed_engine(dir.path());

        write(dir.path(), "a.rs", "pub fn one(){}\npub fn extra(){}\n");
        fs::remove_file(dir.path().join("b.rs")).unwrap();
        write(dir.path(), "c.rs", "pub fn three(){}\n");

        // Apply events in arbitrary order.
        engine
            .on_file_changed(&dir.path().join("c.rs"), dir.path())
            .unwrap();
        engine
            .on_file_changed(&dir.path().join("b.rs"), dir.path())
            .unwrap();
        engine
            .on_file_changed(&dir.path().join("a.rs"), dir.path())
            .unwrap();
        let incremental = engine.stats();
        drop(engine);

        // Fresh scan over the same tree with no catalog to reuse.
        fs::remove_dir_all(dir.path().join(".strata")).unwrap();
        let fresh = indexed_engine(dir.path());
        assert_eq!(incremental, fresh.stats());
        assert!(fresh.find_definition("extra", None).is_some());
        assert!(fresh.find_definition("two", None).is_none());
    }

    #[test]
    fn test_invalidate_then_reindex_is_incremental() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.rs", "pub fn one(){}\n");
        let engine = indexed_engine(dir.path());
        let before = engine.stats();

        engine.invalidate();
        assert_eq!(engine.stats().total_symbols, 0);
        engine
            .ensure_indexed(dir.path(), &CancelToken::new())
            .unwrap();
        assert_eq!(engine.stats(), before);
    }

    #[test]
    fn test_ignore_discipline() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/ok.rs", "pub fn visible(){}\n");
        write(dir.path(), "node_modules/dep.rs", "pub fn hidden(){}\n");
        write(dir.path(), "vendor/v.rs", "pub fn hidden2(){}\n");
        write(dir.path(), ".cache/c.rs", "pub fn hidden3(){}\n");
        let engine = indexed_engine(dir.path());

        let stats = engine.stats();
        assert_eq!(stats.files, 1);
        assert!(engine.find_definition("hidden", None).is_none());
        assert!(engine.find_definition("visible", None).is_some());
    }

    #[test]
    fn test_concurrent_ensure_indexed_single_scan() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "main.go", "package main\nfunc A() {}\n");
        let engine = Arc::new(IndexEngine::new());

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let root = dir.path().to_path_buf();
                std::thread::spawn(move || {
                    engine.ensure_indexed(&root, &CancelToken::new()).unwrap();
                    engine.stats().total_symbols
                })
            })
            .collect();

        let counts: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(counts.iter().all(|&c| c == counts[0]));
        assert!(counts[0] > 0);
    }

    #[test]
    fn test_cancelled_scan_leaves_prior_state() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "x.rs", "pub fn a(){}\n");
        let engine = IndexEngine::new();

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = engine.ensure_indexed(dir.path(), &cancel).unwrap_err();
        assert!(matches!(err, IndexError::Cancelled));
        assert_eq!(engine.stats().total_symbols, 0);

        // Not sticky: a fresh token succeeds.
        engine
            .ensure_indexed(dir.path(), &CancelToken::new())
            .unwrap();
        assert!(engine.stats().total_symbols > 0);
    }

    #[test]
    fn test_root_change_invalidates_and_rebuilds() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        write(dir_a.path(), "a.rs", "pub fn from_a(){}\n");
        write(dir_b.path(), "b.rs", "pub fn from_b(){}\n");

        let engine = indexed_engine(dir_a.path());
        assert!(engine.find_definition("from_a", None).is_some());

        engine
            .ensure_indexed(dir_b.path(), &CancelToken::new())
            .unwrap();
        assert!(engine.find_definition("from_a", None).is_none());
        assert!(engine.find_definition("from_b", None).is_some());
        assert_eq!(engine.current_root(), Some(dir_b.path().to_path_buf()));
    }

    #[test]
    fn test_catalog_persists_across_engines() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "x.rs", "pub fn persisted(){}\n");
        {
            let engine = indexed_engine(dir.path());
            assert!(engine.find_definition("persisted", None).is_some());
        }

        // A new engine over the same root reloads from the catalog.
        let engine = indexed_engine(dir.path());
        assert!(engine.find_definition("persisted", None).is_some());
        assert!(dir.path().join(".strata/catalog.db").exists());
    }

    #[test]
    fn test_invalidate_file_in_memory_only() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "x.rs", "pub fn gone(){}\n");
        write(dir.path(), "y.rs", "pub fn stays(){}\n");
        let engine = indexed_engine(dir.path());

        engine.invalidate_file(&dir.path().join("x.rs"));
        assert!(engine.find_definition("gone", None).is_none());
        assert!(engine.find_definition("stays", None).is_some());
    }

    #[test]
    fn test_on_directory_changed() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/a.rs", "pub fn a(){}\n");
        write(dir.path(), "src/b.rs", "pub fn b(){}\n");
        let engine = indexed_engine(dir.path());

        write(dir.path(), "src/a.rs", "pub fn a2(){}\n");
        write(dir.path(), "src/b.rs", "pub fn b2(){}\n");
        engine
            .on_directory_changed(&dir.path().join("src"), dir.path(), &CancelToken::new())
            .unwrap();

        assert!(engine.find_definition("a2", None).is_some());
        assert!(engine.find_definition("b2", None).is_some());
        assert!(engine.find_definition("a", None).is_none());
    }
}
