//! Java analyzer.
//!
//! Regex extraction over neutralized source with brace-matched block ends.
//! Methods take the enclosing type as parent; `public` gates exports.

use std::sync::LazyLock;

use regex::Regex;

use strata_core::types::{Export, Import, Symbol, SymbolKind};

use crate::blocks::{brace_block_end, brace_body_text, c_style_doc};
use crate::strip::neutralize;
use crate::Analyzer;

static PACKAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*package\s+([\w.]+)\s*;").unwrap());
static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*((?:(?:public|protected|private|static|final|abstract|sealed|non-sealed|strictfp)\s+)*)(class|interface|enum|record)\s+([A-Za-z_]\w*)").unwrap()
});
static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*((?:(?:public|protected|private|static|final|abstract|synchronized|native|default)\s+)+)(?:<[^>]+>\s+)?[\w<>\[\].,\s]+?\s+([A-Za-z_]\w*)\s*\(").unwrap()
});
static CONSTANT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*((?:(?:public|protected|private)\s+)?static\s+final\s+)[\w<>\[\].]+\s+([A-Za-z_]\w*)\s*=").unwrap()
});
static IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+(static\s+)?([\w.]+(?:\.\*)?)\s*;").unwrap());

struct Container {
    parent: String,
    end_line: u32,
}

pub struct JavaAnalyzer;

impl Analyzer for JavaAnalyzer {
    fn language(&self) -> &'static str {
        "java"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn symbols(&self, file_path: &str, source: &str) -> Vec<Symbol> {
        let stripped = neutralize(source);
        let mut symbols = Vec::new();
        let mut containers: Vec<Container> = Vec::new();

        for (idx, line) in stripped.lines().enumerate() {
            let line_no = idx as u32 + 1;
            containers.retain(|c| c.end_line >= line_no);
            let orig_line = source.lines().nth(idx).unwrap_or("");

            if let Some(caps) = PACKAGE_RE.captures(line) {
                symbols.push(
                    Symbol::new(&caps[1], SymbolKind::Package, "java", file_path, line_no, line_no)
                        .with_signature(orig_line.trim()),
                );
                continue;
            }

            if let Some(caps) = TYPE_RE.captures(line) {
                let kind = match &caps[2] {
                    "interface" => SymbolKind::Interface,
                    "enum" => SymbolKind::Enum,
                    "record" => SymbolKind::Record,
                    _ => SymbolKind::Class,
                };
                let name = caps[3].to_string();
                let end = brace_block_end(&stripped, line_no, 2);
                let mut symbol = Symbol::new(&name, kind, "java", file_path, line_no, end)
                    .with_signature(orig_line.trim().trim_end_matches('{').trim());
                if caps[1].contains("public") {
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

            if let Some(caps) = CONSTANT_RE.captures(line) {
                let mut symbol = Symbol::new(
                    &caps[2],
                    SymbolKind::Constant,
                    "java",
                    file_path,
                    line_no,
                    line_no,
                )
                .with_signature(orig_line.trim());
                if caps[1].contains("public") {
                    symbol = symbol.with_extra("public", "true");
                }
                if let Some(container) = containers.last() {
                    symbol = symbol.with_parent(container.parent.clone());
                }
                symbols.push(symbol);
                continue;
            }

            if let Some(caps) = METHOD_RE.captures(line) {
                let name = caps[2].to_string();
                // `new Foo(` and control flow never carry modifier prefixes,
                // so the required modifier group already filters them.
                let end = brace_block_end(&stripped, line_no, 2);
                let mut symbol =
                    Symbol::new(&name, SymbolKind::Method, "java", file_path, line_no, end)
                        .with_signature(orig_line.trim().trim_end_matches('{').trim());
                if caps[1].contains("public") {
                    symbol = symbol.with_extra("public", "true");
                }
                if let Some(container) = containers.last() {
                    if container.parent == name {
                        // Constructor: same name as the enclosing type.
                        continue;
                    }
                    symbol = symbol.with_parent(container.parent.clone());
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
        let stripped = neutralize(source);
        let mut imports = Vec::new();
        for (idx, line) in stripped.lines().enumerate() {
            if let Some(caps) = IMPORT_RE.captures(line) {
                imports.push(Import::new(&caps[2], idx as u32 + 1, false));
            }
        }
        imports
    }

    fn exports(&self, source: &str) -> Vec<Export> {
        self.symbols("", source)
            .into_iter()
            .filter(|s| s.extra.get("public").map(String::as_str) == Some("true"))
            .map(|s| Export::new(s.name, s.kind.as_str(), s.line_start))
            .collect()
    }

    fn function_body(&self, source: &str, name: &str) -> Option<String> {
        let stripped = neutralize(source);
        for (idx, line) in stripped.lines().enumerate() {
            if let Some(caps) = METHOD_RE.captures(line) {
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

    const SAMPLE: &str = r#"package com.example.app;

import java.util.List;
import static java.util.Objects.requireNonNull;

/** Repository of users. */
public class UserRepo {
    public static final int MAX_USERS = 100;

    public UserRepo(List<String> seed) {
        requireNonNull(seed);
    }

    public List<String> findAll() {
        return List.of();
    }

    private void reload() {
    }
}

interface Auditable {
}

public record Point(int x, int y) {
}
"#;

    #[test]
    fn test_symbols() {
        let symbols = JavaAnalyzer.symbols("UserRepo.java", SAMPLE);
        let find = |name: &str| symbols.iter().find(|s| s.name == name).unwrap();

        assert_eq!(find("com.example.app").kind, SymbolKind::Package);
        assert_eq!(find("UserRepo").kind, SymbolKind::Class);
        assert_eq!(find("UserRepo").doc.as_deref(), Some("Repository of users."));
        assert_eq!(find("Auditable").kind, SymbolKind::Interface);
        assert_eq!(find("Point").kind, SymbolKind::Record);
        assert_eq!(find("MAX_USERS").kind, SymbolKind::Constant);

        let find_all = find("findAll");
        assert_eq!(find_all.kind, SymbolKind::Method);
        assert_eq!(find_all.parent.as_deref(), Some("UserRepo"));
    }

    #[test]
    fn test_constructor_not_a_method() {
        let symbols = JavaAnalyzer.symbols("UserRepo.java", SAMPLE);
        assert!(!symbols
            .iter()
            .any(|s| s.name == "UserRepo" && s.kind == SymbolKind::Method));
    }

    #[test]
    fn test_exports_public_only() {
        let exports = JavaAnalyzer.exports(SAMPLE);
        let names: Vec<&str> = exports.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"UserRepo"));
        assert!(names.contains(&"findAll"));
        assert!(!names.contains(&"reload"));
        assert!(!names.contains(&"Auditable"));
    }

    #[test]
    fn test_imports_never_local() {
        let imports = JavaAnalyzer.imports(SAMPLE);
        assert_eq!(imports.len(), 2);
        assert!(imports.iter().all(|i| !i.is_local));
        assert_eq!(imports[1].path, "java.util.Objects.requireNonNull");
    }

    #[test]
    fn test_function_body() {
        let body = JavaAnalyzer.function_body(SAMPLE, "findAll").unwrap();
        assert!(body.contains("List.of()"));
    }
}
