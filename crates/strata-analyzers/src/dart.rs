//! Dart analyzer.
//!
//! Regex extraction over neutralized source. Classes extending a `*Widget`
//! base are classified as widgets. Every symbol whose name does not start
//! with `_` is exported. Imports are local when they use `package:` or `./`.

use std::sync::LazyLock;

use regex::Regex;

use strata_core::types::{Export, Import, Symbol, SymbolKind};

use crate::blocks::{brace_block_end, brace_body_text, c_style_doc};
use crate::strip::neutralize;
use crate::Analyzer;

static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:abstract\s+)?(?:base\s+|final\s+|sealed\s+|interface\s+|mixin\s+)?class\s+([A-Za-z_$]\w*)(?:<[^>{]*>)?(?:\s+extends\s+([\w<>.]+))?").unwrap()
});
static MIXIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*mixin\s+([A-Za-z_$]\w*)").unwrap());
static ENUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*enum\s+([A-Za-z_$]\w*)").unwrap());
static TYPEDEF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*typedef\s+([A-Za-z_$]\w*)").unwrap());
static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)(?:static\s+)?(?:(?:Future|Stream)<[^>]*>\s+|[\w<>,\[\]?]+\s+)?([A-Za-z_$]\w*)\s*\([^;]*\)\s*(?:async\*?\s*|sync\*\s*)?(?:\{|=>)").unwrap()
});
static VARIABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(const|final|var)\s+(?:[\w<>,\[\]?]+\s+)?([A-Za-z_$]\w*)\s*=").unwrap()
});
static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+['"]([^'"]+)['"](?:\s+as\s+([A-Za-z_]\w*))?"#).unwrap()
});
static EXPORT_DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*export\s+['"]([^'"]+)['"]"#).unwrap());

const CONTROL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "assert", "do", "else", "new", "throw",
    "await", "super", "this",
];

struct Container {
    parent: String,
    end_line: u32,
}

fn is_local_path(path: &str) -> bool {
    path.starts_with("package:") || path.starts_with("./")
}

pub struct DartAnalyzer;

impl Analyzer for DartAnalyzer {
    fn language(&self) -> &'static str {
        "dart"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["dart"]
    }

    fn symbols(&self, file_path: &str, source: &str) -> Vec<Symbol> {
        let stripped = neutralize(source);
        let mut symbols = Vec::new();
        let mut containers: Vec<Container> = Vec::new();

        for (idx, line) in stripped.lines().enumerate() {
            let line_no = idx as u32 + 1;
            containers.retain(|c| c.end_line >= line_no);
            let orig_line = source.lines().nth(idx).unwrap_or("");

            if let Some(caps) = CLASS_RE.captures(line) {
                let name = caps[1].to_string();
                let kind = if caps
                    .get(2)
                    .is_some_and(|base| base.as_str().ends_with("Widget"))
                {
                    SymbolKind::Widget
                } else {
                    SymbolKind::Class
                };
                let end = brace_block_end(&stripped, line_no, 2);
                let mut symbol = Symbol::new(&name, kind, "dart", file_path, line_no, end)
                    .with_signature(orig_line.trim().trim_end_matches('{').trim());
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

            if let Some(caps) = MIXIN_RE.captures(line) {
                let name = caps[1].to_string();
                let end = brace_block_end(&stripped, line_no, 2);
                symbols.push(
                    Symbol::new(&name, SymbolKind::Class, "dart", file_path, line_no, end)
                        .with_signature(orig_line.trim().trim_end_matches('{').trim()),
                );
                containers.push(Container {
                    parent: name,
                    end_line: end,
                });
                continue;
            }

            if let Some(caps) = ENUM_RE.captures(line) {
                let end = brace_block_end(&stripped, line_no, 2);
                symbols.push(
                    Symbol::new(&caps[1], SymbolKind::Enum, "dart", file_path, line_no, end)
                        .with_signature(orig_line.trim().trim_end_matches('{').trim()),
                );
                continue;
            }

            if let Some(caps) = TYPEDEF_RE.captures(line) {
                symbols.push(
                    Symbol::new(
                        &caps[1],
                        SymbolKind::TypeAlias,
                        "dart",
                        file_path,
                        line_no,
                        line_no,
                    )
                    .with_signature(orig_line.trim()),
                );
                continue;
            }

            if let Some(caps) = VARIABLE_RE.captures(line) {
                let kind = if &caps[1] == "var" {
                    SymbolKind::Variable
                } else {
                    SymbolKind::Constant
                };
                symbols.push(
                    Symbol::new(&caps[2], kind, "dart", file_path, line_no, line_no)
                        .with_signature(orig_line.trim()),
                );
                continue;
            }

            if let Some(caps) = FUNCTION_RE.captures(line) {
                let name = caps[2].to_string();
                if CONTROL_KEYWORDS.contains(&name.as_str()) {
                    continue;
                }
                let in_class = containers.last().map(|c| c.parent.clone());
                if in_class.as_deref() == Some(name.as_str()) {
                    // Constructor.
                    continue;
                }
                // Function statements inside a method body are locals; only
                // members (one indent level) and top-level functions count.
                if in_class.is_some() && caps[1].len() > 2 {
                    continue;
                }
                let end = brace_block_end(&stripped, line_no, 2);
                let (kind, parent) = match in_class {
                    Some(parent) => (SymbolKind::Method, Some(parent)),
                    None => (SymbolKind::Function, None),
                };
                let mut symbol = Symbol::new(&name, kind, "dart", file_path, line_no, end)
                    .with_signature(orig_line.trim().trim_end_matches('{').trim());
                if let Some(parent) = parent {
                    symbol = symbol.with_parent(parent);
                }
                if line.contains("async") {
                    symbol = symbol.with_extra("async", "true");
                }
                if let Some(doc) = c_style_doc(source, line_no) {
                    symbol.doc = Some(doc);
                }
                symbols.push(symbol);
            }
        }

        symbols
    }

    fn imports(&self, source: &str) -> Vec<Import> {
        let stripped = crate::strip::strip_comments(source);
        let mut imports = Vec::new();
        for (idx, line) in stripped.lines().enumerate() {
            if let Some(caps) = IMPORT_RE.captures(line) {
                let path = caps[1].to_string();
                let mut import = Import::new(&path, idx as u32 + 1, is_local_path(&path));
                if let Some(alias) = caps.get(2) {
                    import = import.with_alias(alias.as_str());
                }
                imports.push(import);
            } else if let Some(caps) = EXPORT_DIRECTIVE_RE.captures(line) {
                let path = caps[1].to_string();
                imports.push(Import::new(&path, idx as u32 + 1, is_local_path(&path)));
            }
        }
        imports
    }

    fn exports(&self, source: &str) -> Vec<Export> {
        let stripped = crate::strip::strip_comments(source);
        let mut exports: Vec<Export> = self
            .symbols("", source)
            .into_iter()
            .filter(|s| !s.name.starts_with('_'))
            .map(|s| Export::new(s.name, s.kind.as_str(), s.line_start))
            .collect();

        for (idx, line) in stripped.lines().enumerate() {
            if let Some(caps) = EXPORT_DIRECTIVE_RE.captures(line) {
                let mut export = Export::new("*", "library", idx as u32 + 1);
                export.is_reexport = true;
                export.source = Some(caps[1].to_string());
                exports.push(export);
            }
        }

        exports
    }

    fn function_body(&self, source: &str, name: &str) -> Option<String> {
        let stripped = neutralize(source);
        for (idx, line) in stripped.lines().enumerate() {
            if let Some(caps) = FUNCTION_RE.captures(line) {
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

    const SAMPLE: &str = r#"import 'dart:async';
import 'package:flutter/material.dart';
import './models.dart' as models;

export 'package:app/src/api.dart';

const int maxRetries = 3;
final logger = Object();
var counter = 0;

typedef JsonMap = Map<String, dynamic>;

enum Status { open, closed }

class ProfileCard extends StatelessWidget {
  Widget build(BuildContext context) {
    return card(context);
  }
}

class _Hidden {
  void poke() {}
}

Future<String> fetchProfile(String id) async {
  return id;
}

Widget card(BuildContext context) => Container();
"#;

    #[test]
    fn test_symbols() {
        let symbols = DartAnalyzer.symbols("profile.dart", SAMPLE);
        let find = |name: &str| symbols.iter().find(|s| s.name == name).unwrap();

        assert_eq!(find("maxRetries").kind, SymbolKind::Constant);
        assert_eq!(find("logger").kind, SymbolKind::Constant);
        assert_eq!(find("counter").kind, SymbolKind::Variable);
        assert_eq!(find("JsonMap").kind, SymbolKind::TypeAlias);
        assert_eq!(find("Status").kind, SymbolKind::Enum);
        assert_eq!(find("ProfileCard").kind, SymbolKind::Widget);
        assert_eq!(find("_Hidden").kind, SymbolKind::Class);
        assert_eq!(find("fetchProfile").kind, SymbolKind::Function);
        assert_eq!(
            find("fetchProfile").extra.get("async").map(String::as_str),
            Some("true")
        );

        let build = find("build");
        assert_eq!(build.kind, SymbolKind::Method);
        assert_eq!(build.parent.as_deref(), Some("ProfileCard"));
    }

    #[test]
    fn test_exports_underscore_gate() {
        let exports = DartAnalyzer.exports(SAMPLE);
        let names: Vec<&str> = exports.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"ProfileCard"));
        assert!(names.contains(&"fetchProfile"));
        assert!(names.contains(&"build"));
        assert!(!names.contains(&"_Hidden"));

        let reexport = exports.iter().find(|e| e.is_reexport).unwrap();
        assert_eq!(reexport.source.as_deref(), Some("package:app/src/api.dart"));
    }

    #[test]
    fn test_import_locality() {
        let imports = DartAnalyzer.imports(SAMPLE);
        let by_path = |p: &str| imports.iter().find(|i| i.path == p).unwrap();

        assert!(!by_path("dart:async").is_local);
        assert!(by_path("package:flutter/material.dart").is_local);
        let models = by_path("./models.dart");
        assert!(models.is_local);
        assert_eq!(models.alias.as_deref(), Some("models"));
    }

    #[test]
    fn test_function_body() {
        let body = DartAnalyzer.function_body(SAMPLE, "fetchProfile").unwrap();
        assert!(body.contains("return id;"));
    }
}
