//! Language-specific analyzers and the extension registry for strata.
//!
//! Each analyzer maps raw source bytes to symbols, imports, exports, and
//! function bodies. Go is parsed with tree-sitter; every other language uses
//! line-anchored regular expressions over source that has had string literals
//! and comments neutralized first (see [`strip`]).
//!
//! Supported languages: Go, TypeScript, JavaScript, Java, Kotlin, Vue, Dart,
//! Python, Rust, C#.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use strata_core::types::{Export, Import, Symbol};

pub mod blocks;
pub mod strip;
pub mod walker;

pub mod csharp;
pub mod dart;
pub mod go;
pub mod java;
pub mod kotlin;
pub mod python;
pub mod rust_lang;
pub mod typescript;
pub mod vue;

/// The capability set every language analyzer implements.
///
/// Analyzers never fail: a file that cannot be parsed yields empty results,
/// so a broken file never aborts a directory walk. Implementors must be
/// `Send + Sync` so one instance can serve concurrent scans.
pub trait Analyzer: Send + Sync {
    /// Canonical language tag (e.g. "go", "typescript").
    fn language(&self) -> &'static str;

    /// File extensions claimed by this analyzer, lowercase, without dots.
    fn extensions(&self) -> &'static [&'static str];

    /// Whether this analyzer handles the given path (extension match,
    /// case-insensitive).
    fn can_analyze(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.extensions().iter().any(|e| ext.eq_ignore_ascii_case(e))
            })
    }

    /// Extract all symbols from `source`. `file_path` is recorded on each
    /// symbol and must be project-relative with forward slashes.
    fn symbols(&self, file_path: &str, source: &str) -> Vec<Symbol>;

    /// Extract import statements in source order.
    fn imports(&self, source: &str) -> Vec<Import>;

    /// Extract exported names in source order.
    fn exports(&self, source: &str) -> Vec<Export>;

    /// Return the body text of the named function, or `None` when the
    /// function is not found.
    fn function_body(&self, source: &str, name: &str) -> Option<String>;
}

/// Maps file extensions to analyzers.
///
/// Built once at startup and immutable afterwards; lookups are read-only and
/// safe under concurrent callers.
pub struct AnalyzerRegistry {
    by_extension: HashMap<String, Arc<dyn Analyzer>>,
    analyzers: Vec<Arc<dyn Analyzer>>,
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        AnalyzerRegistry {
            by_extension: HashMap::new(),
            analyzers: Vec::new(),
        }
    }

    /// Registry with the full fixed language set.
    pub fn with_default_languages() -> Self {
        let mut registry = AnalyzerRegistry::new();
        registry.register(Arc::new(go::GoAnalyzer::new()));
        registry.register(Arc::new(typescript::TsAnalyzer::typescript()));
        registry.register(Arc::new(typescript::TsAnalyzer::javascript()));
        registry.register(Arc::new(java::JavaAnalyzer));
        registry.register(Arc::new(kotlin::KotlinAnalyzer));
        registry.register(Arc::new(vue::VueAnalyzer));
        registry.register(Arc::new(dart::DartAnalyzer));
        registry.register(Arc::new(python::PythonAnalyzer));
        registry.register(Arc::new(rust_lang::RustAnalyzer));
        registry.register(Arc::new(csharp::CSharpAnalyzer));
        registry
    }

    fn register(&mut self, analyzer: Arc<dyn Analyzer>) {
        for ext in analyzer.extensions() {
            self.by_extension
                .insert(ext.to_ascii_lowercase(), Arc::clone(&analyzer));
        }
        self.analyzers.push(analyzer);
    }

    /// The analyzer responsible for a path, if any.
    pub fn for_path(&self, path: &Path) -> Option<Arc<dyn Analyzer>> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.by_extension.get(&ext).cloned()
    }

    /// Whether any registered analyzer claims this path.
    pub fn is_supported(&self, path: &Path) -> bool {
        self.for_path(path).is_some()
    }

    /// Registered languages with their extensions, in registration order.
    pub fn languages(&self) -> Vec<(&'static str, &'static [&'static str])> {
        self.analyzers
            .iter()
            .map(|a| (a.language(), a.extensions()))
            .collect()
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::with_default_languages()
    }
}
