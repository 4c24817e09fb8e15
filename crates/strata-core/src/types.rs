use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Classification of a symbol discovered by an analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolKind {
    Package,
    Class,
    Interface,
    Struct,
    Enum,
    Function,
    Method,
    Constant,
    Variable,
    TypeAlias,
    Widget,
    Component,
    Composable,
    Record,
}

impl SymbolKind {
    /// Returns the kebab-case string representation of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Package => "package",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Struct => "struct",
            SymbolKind::Enum => "enum",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Constant => "constant",
            SymbolKind::Variable => "variable",
            SymbolKind::TypeAlias => "type-alias",
            SymbolKind::Widget => "widget",
            SymbolKind::Component => "component",
            SymbolKind::Composable => "composable",
            SymbolKind::Record => "record",
        }
    }

    /// Parses the kebab-case representation produced by [`SymbolKind::as_str`].
    pub fn parse(s: &str) -> Option<SymbolKind> {
        Some(match s {
            "package" => SymbolKind::Package,
            "class" => SymbolKind::Class,
            "interface" => SymbolKind::Interface,
            "struct" => SymbolKind::Struct,
            "enum" => SymbolKind::Enum,
            "function" => SymbolKind::Function,
            "method" => SymbolKind::Method,
            "constant" => SymbolKind::Constant,
            "variable" => SymbolKind::Variable,
            "type-alias" => SymbolKind::TypeAlias,
            "widget" => SymbolKind::Widget,
            "component" => SymbolKind::Component,
            "composable" => SymbolKind::Composable,
            "record" => SymbolKind::Record,
            _ => return None,
        })
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named program entity extracted from a source file.
///
/// `file_path` is project-relative with forward slashes; lines are 1-based
/// and `line_start <= line_end` always holds for analyzer output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub language: String,
    pub file_path: String,
    pub line_start: u32,
    pub line_end: u32,
    pub signature: Option<String>,
    pub doc: Option<String>,
    /// Enclosing type name for methods (e.g. the receiver type in Go).
    pub parent: Option<String>,
    /// Free-form string pairs (visibility, async, receiver, ...).
    /// Ordered so serialized output is deterministic.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Symbol {
    pub fn new(
        name: impl Into<String>,
        kind: SymbolKind,
        language: impl Into<String>,
        file_path: impl Into<String>,
        line_start: u32,
        line_end: u32,
    ) -> Self {
        Symbol {
            name: name.into(),
            kind,
            language: language.into(),
            file_path: file_path.into(),
            line_start,
            line_end: line_end.max(line_start),
            signature: None,
            doc: None,
            parent: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// An import statement extracted from a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    /// The raw module specifier / source path as written.
    pub path: String,
    pub alias: Option<String>,
    /// Line number of the import (1-based).
    pub line: u32,
    /// Whether the import resolves inside the project under the language's
    /// locality rules (relative paths, `crate::`, `@/`, `package:`, ...).
    pub is_local: bool,
}

impl Import {
    pub fn new(path: impl Into<String>, line: u32, is_local: bool) -> Self {
        Import {
            path: path.into(),
            alias: None,
            line,
            is_local,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// An exported name extracted from a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Export {
    pub name: String,
    /// Free-form kind tag ("function", "class", "const", ...).
    pub kind: String,
    pub alias: Option<String>,
    pub line: u32,
    pub is_default: bool,
    pub is_reexport: bool,
    /// Origin path for re-exports (`export { x } from './y'`).
    pub source: Option<String>,
}

impl Export {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, line: u32) -> Self {
        Export {
            name: name.into(),
            kind: kind.into(),
            alias: None,
            line,
            is_default: false,
            is_reexport: false,
            source: None,
        }
    }
}

/// A single textual occurrence of a symbol name, as produced by the
/// reference finder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolRef {
    pub file_path: String,
    /// 1-based line of the match.
    pub line: u32,
    /// 1-based column of the match start.
    pub column: u32,
    /// The matched line with surrounding whitespace trimmed.
    pub line_text: String,
    /// Up to two lines before and after the match, including the match line.
    pub context: Vec<String>,
    /// True when a symbol of the searched name starts on this line.
    pub is_definition: bool,
}

/// Aggregate counts over the in-memory symbol index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_symbols: usize,
    pub unique_names: usize,
    pub files: usize,
    /// Per-kind symbol counts, keyed by [`SymbolKind::as_str`].
    pub kinds: BTreeMap<String, usize>,
}

/// Errors surfaced by indexing operations.
///
/// Per-file I/O and parse failures are swallowed during scans; these are the
/// failures that propagate. The enum is `Clone` because the orchestrator
/// keeps the last error sticky for concurrent callers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IndexError {
    #[error("project walk failed: {0}")]
    Walk(String),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("operation cancelled")]
    Cancelled,
}

/// Normalizes a path for storage: project-relative, forward slashes.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}
