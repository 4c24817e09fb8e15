//! Graph construction from a project scan, behind a build-once latch.
//!
//! One walk produces both artifacts. Go files go through the real parser:
//! function declarations become nodes keyed `package.name` and every call
//! expression becomes an edge. TS/JS/Vue run two regex passes: declarations
//! become nodes keyed `file:name`, then `identifier(` call sites are
//! attributed to the declaration whose line range contains them (ranges are
//! next declaration start − 1; the last declaration gets a fixed 100-line
//! pad) and linked when the callee matches a known node. Import edges come
//! from per-file import extraction resolved against the filesystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use rayon::prelude::*;

use strata_analyzers::go::GoAnalyzer;
use strata_analyzers::walker::{relative_path, ProjectWalker};
use strata_analyzers::{typescript, vue, AnalyzerRegistry};
use strata_core::cancel::CancelToken;
use strata_core::latch::{Admission, BuildLatch};
use strata_core::types::{Import, IndexError};

use crate::mermaid;
use crate::model::{CallGraph, CallNode, CallSiteMeta, DependencyGraph, ImportMeta};
use crate::query::{self, Cycle, ReachedNode, TraversalDirection};

/// Range pad applied to the last declaration in a TS/JS file.
const LAST_DECL_PAD: u32 = 100;

/// Extension probe order for local import resolution.
const RESOLVE_EXTENSIONS: &[&str] = &[
    "", ".ts", ".tsx", ".js", ".jsx", ".vue", "/index.ts", "/index.js",
];

#[derive(Default)]
struct GraphState {
    call: CallGraph,
    deps: DependencyGraph,
}

/// Per-file extraction output from the parallel phase.
struct FileFacts {
    rel: String,
    go: Option<(Vec<strata_analyzers::go::GoFunction>, Vec<strata_analyzers::go::GoCall>)>,
    ts: Option<TsFacts>,
    imports: Vec<Import>,
}

struct TsFacts {
    decls: Vec<typescript::TsFunction>,
    sites: Vec<typescript::TsCallSite>,
    line_offset: u32,
}

/// Builds and owns the call and dependency graphs for one project root.
///
/// `ensure_built` runs at most one scan per root; concurrent callers block
/// on the latch and observe the same published graphs. All queries take the
/// read side of the state lock.
pub struct GraphBuilder {
    registry: Arc<AnalyzerRegistry>,
    go: GoAnalyzer,
    latch: BuildLatch,
    state: RwLock<GraphState>,
}

impl GraphBuilder {
    pub fn new(registry: Arc<AnalyzerRegistry>) -> Self {
        GraphBuilder {
            registry,
            go: GoAnalyzer::new(),
            latch: BuildLatch::new(),
            state: RwLock::new(GraphState::default()),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, GraphState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, GraphState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Build the graphs for `root` unless a successful build for the same
    /// root is already cached. A change of root invalidates the previous
    /// graphs first. Walks the project itself; an orchestrator that has
    /// already walked uses [`GraphBuilder::ensure_built_from`] instead.
    pub fn ensure_built(&self, root: &Path, cancel: &CancelToken) -> Result<(), IndexError> {
        self.ensure_built_inner(root, None, cancel)
    }

    /// Build the graphs from an already-walked file list, so the caller's
    /// symbol index and both graphs all derive from one scan pass.
    pub fn ensure_built_from(
        &self,
        root: &Path,
        files: &[PathBuf],
        cancel: &CancelToken,
    ) -> Result<(), IndexError> {
        self.ensure_built_inner(root, Some(files), cancel)
    }

    fn ensure_built_inner(
        &self,
        root: &Path,
        files: Option<&[PathBuf]>,
        cancel: &CancelToken,
    ) -> Result<(), IndexError> {
        match self.latch.begin(root)? {
            Admission::AlreadyBuilt => Ok(()),
            Admission::Build { root_changed } => {
                if root_changed {
                    *self.write() = GraphState::default();
                }
                let result = self.build(root, files, cancel);
                let outcome = match result {
                    Ok(state) => {
                        *self.write() = state;
                        Ok(())
                    }
                    Err(err) => Err(err),
                };
                self.latch.complete(root, &outcome);
                outcome
            }
        }
    }

    /// Whether a successful build for `root` is current.
    pub fn is_built_for(&self, root: &Path) -> bool {
        self.latch.is_built_for(root)
    }

    /// Reset the latch and drop both graphs.
    pub fn invalidate(&self) {
        self.latch.reset();
        *self.write() = GraphState::default();
    }

    fn build(
        &self,
        root: &Path,
        files: Option<&[PathBuf]>,
        cancel: &CancelToken,
    ) -> Result<GraphState, IndexError> {
        let files: Vec<PathBuf> = match files {
            Some(files) => files.to_vec(),
            None => ProjectWalker::new(root, &self.registry).source_files(),
        };
        tracing::debug!(files = files.len(), root = %root.display(), "building graphs");

        let facts: Vec<Option<FileFacts>> = files
            .par_iter()
            .map(|path| {
                if cancel.is_cancelled() {
                    return None;
                }
                self.extract_file(root, path)
            })
            .collect();
        cancel.check()?;

        let mut state = GraphState::default();
        let facts: Vec<FileFacts> = facts.into_iter().flatten().collect();

        // Nodes first: TS callee resolution and dependency edges need the
        // full node and file sets.
        for file in &facts {
            state
                .deps
                .intern_with(&file.rel, || file.rel.clone());
            if let Some((functions, _)) = &file.go {
                for f in functions {
                    let (rel, line, signature) = (&file.rel, f.line, f.signature.clone());
                    state.call.intern_with(&f.id, || CallNode {
                        id: f.id.clone(),
                        name: f.name.clone(),
                        file: rel.clone(),
                        line,
                        package: Some(f.package.clone()),
                        signature,
                    });
                }
            }
            if let Some(ts) = &file.ts {
                for d in &ts.decls {
                    let id = format!("{}:{}", file.rel, d.name);
                    let (rel, line, signature) =
                        (&file.rel, d.line + ts.line_offset, d.signature.clone());
                    let name = d.name.clone();
                    state.call.intern_with(&id, || CallNode {
                        id: id.clone(),
                        name,
                        file: rel.clone(),
                        line,
                        package: None,
                        signature,
                    });
                }
            }
        }

        // Name index for the file-qualified id fallback, in node insertion
        // order.
        let mut by_name: HashMap<String, Vec<String>> = HashMap::new();
        for id in state.call.sorted_ids() {
            if let Some(node) = state.call.node(&id) {
                by_name.entry(node.name.clone()).or_default().push(id.clone());
            }
        }

        for file in &facts {
            cancel.check()?;
            if let Some((_, calls)) = &file.go {
                for call in calls {
                    let from = state.call.index_of(&call.caller_id);
                    let Some(from) = from else { continue };
                    let to = state.call.intern_with(&call.callee_id, || {
                        external_node(&call.callee_id)
                    });
                    state.call.add_edge(
                        from,
                        to,
                        CallSiteMeta {
                            file: file.rel.clone(),
                            line: call.line,
                            call_type: "direct".to_string(),
                        },
                    );
                }
            }

            if let Some(ts) = &file.ts {
                self.link_ts_calls(&mut state.call, &by_name, &file.rel, ts);
            }

            for import in &file.imports {
                if !import.is_local {
                    continue;
                }
                let Some(target) = resolve_import(root, &file.rel, &import.path) else {
                    continue;
                };
                if target == file.rel {
                    continue;
                }
                let (Some(from), Some(to)) = (
                    state.deps.index_of(&file.rel),
                    state.deps.index_of(&target),
                ) else {
                    continue;
                };
                state.deps.add_edge(
                    from,
                    to,
                    ImportMeta {
                        import_text: import.path.clone(),
                        line: import.line,
                    },
                );
            }
        }

        Ok(state)
    }

    fn extract_file(&self, root: &Path, path: &Path) -> Option<FileFacts> {
        let rel = relative_path(root, path);
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(file = %rel, error = %err, "skipping unreadable file");
                return None;
            }
        };
        let analyzer = self.registry.for_path(path)?;
        let language = analyzer.language();

        let go = (language == "go").then(|| self.go.extract_calls(&source));

        let ts = match language {
            "typescript" | "javascript" => {
                let stripped = strata_analyzers::strip::neutralize(&source);
                let decls = typescript::function_decls(&stripped);
                let sites = typescript::call_sites(&stripped, &decls);
                Some(TsFacts {
                    decls,
                    sites,
                    line_offset: 0,
                })
            }
            "vue" => vue::script_block(&source).map(|(offset, script)| {
                let stripped = strata_analyzers::strip::neutralize(&script);
                let decls = typescript::function_decls(&stripped);
                let sites = typescript::call_sites(&stripped, &decls);
                TsFacts {
                    decls,
                    sites,
                    line_offset: offset,
                }
            }),
            _ => None,
        };

        Some(FileFacts {
            rel,
            go,
            ts,
            imports: analyzer.imports(&source),
        })
    }

    /// Pass 2 for TS-like files: attribute each call site to the declaration
    /// whose line range contains it, then link to the callee when one is
    /// declared.
    fn link_ts_calls(
        &self,
        call: &mut CallGraph,
        by_name: &HashMap<String, Vec<String>>,
        rel: &str,
        ts: &TsFacts,
    ) {
        let mut decls: Vec<&typescript::TsFunction> = ts.decls.iter().collect();
        decls.sort_by_key(|d| d.line);

        let range_of = |i: usize| -> (u32, u32) {
            let start = decls[i].line;
            let end = decls
                .get(i + 1)
                .map(|next| next.line.saturating_sub(1))
                .unwrap_or(start + LAST_DECL_PAD);
            (start, end)
        };

        for site in &ts.sites {
            let enclosing = (0..decls.len()).rev().find(|&i| {
                let (start, end) = range_of(i);
                site.line >= start && site.line <= end
            });
            let Some(i) = enclosing else { continue };
            let caller_id = format!("{rel}:{}", decls[i].name);

            let same_file = format!("{rel}:{}", site.callee);
            let callee_id = if call.contains(&same_file) {
                same_file
            } else if let Some(ids) = by_name.get(&site.callee) {
                match ids.first() {
                    Some(id) => id.clone(),
                    None => continue,
                }
            } else {
                continue;
            };

            if callee_id == caller_id {
                continue;
            }
            let (Some(from), Some(to)) =
                (call.index_of(&caller_id), call.index_of(&callee_id))
            else {
                continue;
            };
            call.add_edge(
                from,
                to,
                CallSiteMeta {
                    file: rel.to_string(),
                    line: site.line + ts.line_offset,
                    call_type: "direct".to_string(),
                },
            );
        }
    }

    // ----- query surface, all behind the read lock -----

    pub fn callers(&self, id: &str) -> Vec<String> {
        self.read().call.callers(id)
    }

    pub fn callees(&self, id: &str) -> Vec<String> {
        self.read().call.callees(id)
    }

    pub fn node(&self, id: &str) -> Option<CallNode> {
        self.read().call.node(id).cloned()
    }

    pub fn transitive(
        &self,
        id: &str,
        max_depth: u32,
        direction: TraversalDirection,
    ) -> Vec<ReachedNode> {
        query::transitive(&self.read().call, id, max_depth, direction)
    }

    pub fn impact(&self, id: &str, max_depth: u32) -> Vec<ReachedNode> {
        query::impact(&self.read().call, id, max_depth)
    }

    pub fn call_chain(&self, from: &str, to: &str, max_depth: u32) -> Vec<Vec<String>> {
        query::call_chain(&self.read().call, from, to, max_depth)
    }

    pub fn dependency_path(
        &self,
        from_file: &str,
        to_file: &str,
        max_depth: u32,
    ) -> Option<Vec<String>> {
        query::dependency_path(&self.read().deps, from_file, to_file, max_depth)
    }

    pub fn cyclic_dependencies(&self) -> Vec<Cycle> {
        query::cyclic_dependencies(&self.read().deps)
    }

    pub fn file_dependencies(&self, file: &str) -> Vec<String> {
        self.read().deps.dependencies_of(file)
    }

    pub fn file_dependents(&self, file: &str) -> Vec<String> {
        self.read().deps.dependents_of(file)
    }

    pub fn export_call_graph_mermaid(&self, max_nodes: usize) -> String {
        mermaid::export_call_graph(&self.read().call, max_nodes)
    }

    pub fn export_dependency_graph_mermaid(&self, max_nodes: usize) -> String {
        mermaid::export_dependency_graph(&self.read().deps, max_nodes)
    }

    pub fn node_counts(&self) -> (usize, usize) {
        let state = self.read();
        (state.call.node_count(), state.deps.node_count())
    }
}

fn external_node(id: &str) -> CallNode {
    let (package, name) = match id.rsplit_once('.') {
        Some((package, name)) => (Some(package.to_string()), name.to_string()),
        None => (None, id.to_string()),
    };
    CallNode {
        id: id.to_string(),
        name,
        file: String::new(),
        line: 0,
        package,
        signature: String::new(),
    }
}

/// Resolve a local import against the project tree. Relative paths join the
/// importing file's directory, `@/` maps to `src/`, `~/` maps to the project
/// root; the first existing probe wins.
fn resolve_import(root: &Path, importing_rel: &str, spec: &str) -> Option<String> {
    let base: PathBuf = if let Some(rest) = spec.strip_prefix("@/") {
        PathBuf::from("src").join(rest)
    } else if let Some(rest) = spec.strip_prefix("~/") {
        PathBuf::from(rest)
    } else if spec.starts_with('.') {
        let dir = Path::new(importing_rel).parent().unwrap_or(Path::new(""));
        dir.join(spec)
    } else {
        PathBuf::from(spec)
    };
    let base = normalize_components(&base)?;

    for ext in RESOLVE_EXTENSIONS {
        let candidate = format!("{}{}", base, ext);
        if root.join(&candidate).is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Collapse `.` and `..` segments; a path escaping the root resolves to
/// nothing.
fn normalize_components(path: &Path) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                parts.pop()?;
            }
            std::path::Component::Normal(name) => {
                parts.push(name.to_string_lossy().to_string());
            }
            _ => return None,
        }
    }
    Some(parts.join("/"))
}
