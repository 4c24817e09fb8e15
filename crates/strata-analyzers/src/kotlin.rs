//! Kotlin analyzer.
//!
//! Regex extraction over neutralized source. Kotlin declarations default to
//! public, so anything not marked `private` or `internal` is exported.
//! `@Composable` functions are classified as composables.

use std::sync::LazyLock;

use regex::Regex;

use strata_core::types::{Export, Import, Symbol, SymbolKind};

use crate::blocks::{brace_block_end, brace_body_text, c_style_doc};
use crate::strip::neutralize;
use crate::Analyzer;

static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*((?:(?:public|private|internal|protected|open|abstract|final|sealed|inner|annotation|data|value|enum)\s+)*)(class|interface|object)\s+([A-Za-z_]\w*)").unwrap()
});
static FUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*((?:(?:public|private|internal|protected|open|override|suspend|inline|operator|infix|tailrec|external|actual)\s+)*)fun\s+(?:<[^>]+>\s+)?(?:[\w.]+\.)?([A-Za-z_]\w*)\s*\(").unwrap()
});
static VAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*((?:(?:public|private|internal|protected|const|lateinit)\s+)*)(val|var)\s+([A-Za-z_]\w*)").unwrap()
});
static TYPEALIAS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*((?:(?:public|private|internal)\s+)*)typealias\s+([A-Za-z_]\w*)").unwrap()
});
static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*import\s+([\w.]+(?:\.\*)?)(?:\s+as\s+([A-Za-z_]\w*))?").unwrap()
});
static PACKAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*package\s+([\w.]+)").unwrap());

struct Container {
    parent: String,
    end_line: u32,
}

fn is_hidden(modifiers: &str) -> bool {
    modifiers.contains("private") || modifiers.contains("internal")
}

pub struct KotlinAnalyzer;

impl Analyzer for KotlinAnalyzer {
    fn language(&self) -> &'static str {
        "kotlin"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["kt", "kts"]
    }

    fn symbols(&self, file_path: &str, source: &str) -> Vec<Symbol> {
        let stripped = neutralize(source);
        let lines: Vec<&str> = stripped.lines().collect();
        let mut symbols = Vec::new();
        let mut containers: Vec<Container> = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            let line_no = idx as u32 + 1;
            containers.retain(|c| c.end_line >= line_no);
            let orig_line = source.lines().nth(idx).unwrap_or("");

            if let Some(caps) = PACKAGE_RE.captures(line) {
                symbols.push(
                    Symbol::new(&caps[1], SymbolKind::Package, "kotlin", file_path, line_no, line_no)
                        .with_signature(orig_line.trim()),
                );
                continue;
            }

            if let Some(caps) = TYPE_RE.captures(line) {
                let kind = if caps[1].contains("enum") {
                    SymbolKind::Enum
                } else if &caps[2] == "interface" {
                    SymbolKind::Interface
                } else {
                    SymbolKind::Class
                };
                let name = caps[3].to_string();
                let end = brace_block_end(&stripped, line_no, 2);
                let mut symbol = Symbol::new(&name, kind, "kotlin", file_path, line_no, end)
                    .with_signature(orig_line.trim().trim_end_matches('{').trim());
                if !is_hidden(&caps[1]) {
                    symbol = symbol.with_extra("public", "true");
                }
                if let Some(doc) = c_style_doc(source, line_no) {
                    symbol.doc = Some(doc);
                }
                symbols.push(symbol);
                containers.push(Container {
                    parent: name,
                    end_line: end,
                });
                continue;
            }

            if let Some(caps) = FUN_RE.captures(line) {
                let name = caps[2].to_string();
                let end = brace_block_end(&stripped, line_no, 2);
                let annotated_composable = line.contains("@Composable")
                    || (idx > 0 && lines[idx - 1].trim_start().starts_with("@Composable"));
                let (kind, parent) = if annotated_composable {
                    (SymbolKind::Composable, None)
                } else if let Some(container) = containers.last() {
                    (SymbolKind::Method, Some(container.parent.clone()))
                } else {
                    (SymbolKind::Function, None)
                };
                let mut symbol = Symbol::new(&name, kind, "kotlin", file_path, line_no, end)
                    .with_signature(orig_line.trim().trim_end_matches('{').trim());
                if let Some(parent) = parent {
                    symbol = symbol.with_parent(parent);
                }
                if !is_hidden(&caps[1]) {
                    symbol = symbol.with_extra("public", "true");
                }
                if caps[1].contains("suspend") {
                    symbol = symbol.with_extra("suspend", "true");
                }
                if let Some(doc) = c_style_doc(source, line_no) {
                    symbol.doc = Some(doc);
                }
                symbols.push(symbol);
                // Locals inside this body must not read as top-level
                // properties.
                containers.push(Container {
                    parent: name,
                    end_line: end,
                });
                continue;
            }

            if let Some(caps) = TYPEALIAS_RE.captures(line) {
                let mut symbol = Symbol::new(
                    &caps[2],
                    SymbolKind::TypeAlias,
                    "kotlin",
                    file_path,
                    line_no,
                    line_no,
                )
                .with_signature(orig_line.trim());
                if !is_hidden(&caps[1]) {
                    symbol = symbol.with_extra("public", "true");
                }
                symbols.push(symbol);
                continue;
            }

            // Only top-level properties; locals inside functions share the
            // syntax but sit inside a container's brace range.
            if containers.is_empty() {
                if let Some(caps) = VAL_RE.captures(line) {
                    let kind = if &caps[2] == "val" {
                        SymbolKind::Constant
                    } else {
                        SymbolKind::Variable
                    };
                    let mut symbol =
                        Symbol::new(&caps[3], kind, "kotlin", file_path, line_no, line_no)
                            .with_signature(orig_line.trim());
                    if !is_hidden(&caps[1]) {
                        symbol = symbol.with_extra("public", "true");
                    }
                    symbols.push(symbol);
                }
            }
        }

        symbols
    }

    fn imports(&self, source: &str) -> Vec<Import> {
        let stripped = neutralize(source);
        let mut imports = Vec::new();
        for (idx, line) in stripped.lines().enumerate() {
            if let Some(caps) = IMPORT_RE.captures(line) {
                let mut import = Import::new(&caps[1], idx as u32 + 1, false);
                if let Some(alias) = caps.get(2) {
                    import = import.with_alias(alias.as_str());
                }
                imports.push(import);
            }
        }
        imports
    }

    fn exports(&self, source: &str) -> Vec<Export> {
        self.symbols("", source)
            .into_iter()
            .filter(|s| {
                s.kind != SymbolKind::Package
                    && s.extra.get("public").map(String::as_str) == Some("true")
            })
            .map(|s| Export::new(s.name, s.kind.as_str(), s.line_start))
            .collect()
    }

    fn function_body(&self, source: &str, name: &str) -> Option<String> {
        let stripped = neutralize(source);
        for (idx, line) in stripped.lines().enumerate() {
            if let Some(caps) = FUN_RE.captures(line) {
                if &caps[2] == name {
                    return brace_body_text(source, &stripped, idx as u32 + 1);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"package com.example.feed

import kotlinx.coroutines.flow.Flow
import androidx.compose.runtime.Composable as ComposableFn

typealias FeedId = String

val DEFAULT_LIMIT = 20
private var cache: Flow<String>? = null

class FeedRepository {
    fun load(id: FeedId): Flow<String> {
        return refresh(id)
    }

    private suspend fun refresh(id: FeedId): Flow<String> {
        TODO()
    }
}

interface FeedSource

@Composable
fun FeedScreen(id: FeedId) {
}

private fun helper() {
}
"#;

    #[test]
    fn test_symbols() {
        let symbols = KotlinAnalyzer.symbols("Feed.kt", SAMPLE);
        let find = |name: &str| symbols.iter().find(|s| s.name == name).unwrap();

        assert_eq!(find("com.example.feed").kind, SymbolKind::Package);
        assert_eq!(find("FeedId").kind, SymbolKind::TypeAlias);
        assert_eq!(find("DEFAULT_LIMIT").kind, SymbolKind::Constant);
        assert_eq!(find("cache").kind, SymbolKind::Variable);
        assert_eq!(find("FeedRepository").kind, SymbolKind::Class);
        assert_eq!(find("FeedSource").kind, SymbolKind::Interface);
        assert_eq!(find("FeedScreen").kind, SymbolKind::Composable);

        let load = find("load");
        assert_eq!(load.kind, SymbolKind::Method);
        assert_eq!(load.parent.as_deref(), Some("FeedRepository"));

        let refresh = find("refresh");
        assert_eq!(refresh.extra.get("suspend").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_exports_default_public() {
        let exports = KotlinAnalyzer.exports(SAMPLE);
        let names: Vec<&str> = exports.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"FeedRepository"));
        assert!(names.contains(&"load"));
        assert!(names.contains(&"FeedScreen"));
        assert!(!names.contains(&"refresh"));
        assert!(!names.contains(&"helper"));
        assert!(!names.contains(&"cache"));
    }

    #[test]
    fn test_imports_with_alias() {
        let imports = KotlinAnalyzer.imports(SAMPLE);
        assert!(imports.iter().all(|i| !i.is_local));
        let aliased = imports
            .iter()
            .find(|i| i.path == "androidx.compose.runtime.Composable")
            .unwrap();
        assert_eq!(aliased.alias.as_deref(), Some("ComposableFn"));
    }

    #[test]
    fn test_function_body() {
        let body = KotlinAnalyzer.function_body(SAMPLE, "load").unwrap();
        assert!(body.contains("refresh(id)"));
    }
}
