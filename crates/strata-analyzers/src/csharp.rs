//! C# analyzer.
//!
//! Regex extraction over neutralized source. `public` gates exports; `using`
//! directives under `System` or `Microsoft` are non-local, everything else is
//! treated as project-local.

use std::sync::LazyLock;

use regex::Regex;

use strata_core::types::{Export, Import, Symbol, SymbolKind};

use crate::blocks::{brace_block_end, brace_body_text, c_style_doc};
use crate::strip::neutralize;
use crate::Analyzer;

static NAMESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*namespace\s+([\w.]+)").unwrap());
static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*((?:(?:public|private|protected|internal|static|sealed|abstract|partial|readonly|ref)\s+)*)(class|interface|struct|enum|record)\s+([A-Za-z_]\w*)").unwrap()
});
static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*((?:(?:public|private|protected|internal|static|virtual|override|abstract|sealed|async|extern|partial|new)\s+)+)[\w<>\[\].,?\s]+?\s+([A-Za-z_]\w*)\s*\(").unwrap()
});
static CONSTANT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*((?:(?:public|private|protected|internal)\s+)?const\s+)[\w<>\[\].?]+\s+([A-Za-z_]\w*)\s*=").unwrap()
});
static USING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*using\s+(?:static\s+)?(?:([A-Za-z_]\w*)\s*=\s*)?([\w.]+)\s*;").unwrap()
});

struct Container {
    parent: String,
    end_line: u32,
}

pub struct CSharpAnalyzer;

impl Analyzer for CSharpAnalyzer {
    fn language(&self) -> &'static str {
        "csharp"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["cs"]
    }

    fn symbols(&self, file_path: &str, source: &str) -> Vec<Symbol> {
        let stripped = neutralize(source);
        let mut symbols = Vec::new();
        let mut containers: Vec<Container> = Vec::new();

        for (idx, line) in stripped.lines().enumerate() {
            let line_no = idx as u32 + 1;
            containers.retain(|c| c.end_line >= line_no);
            let orig_line = source.lines().nth(idx).unwrap_or("");

            if let Some(caps) = NAMESPACE_RE.captures(line) {
                symbols.push(
                    Symbol::new(
                        &caps[1],
                        SymbolKind::Package,
                        "csharp",
                        file_path,
                        line_no,
                        line_no,
                    )
                    .with_signature(orig_line.trim()),
                );
                continue;
            }

            if let Some(caps) = TYPE_RE.captures(line) {
                let kind = match &caps[2] {
                    "interface" => SymbolKind::Interface,
                    "struct" => SymbolKind::Struct,
                    "enum" => SymbolKind::Enum,
                    "record" => SymbolKind::Record,
                    _ => SymbolKind::Class,
                };
                let name = caps[3].to_string();
                let end = brace_block_end(&stripped, line_no, 2);
                let mut symbol = Symbol::new(&name, kind, "csharp", file_path, line_no, end)
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
                    "csharp",
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
                if containers.last().is_some_and(|c| c.parent == name) {
                    // Constructor.
                    continue;
                }
                let end = brace_block_end(&stripped, line_no, 2);
                let mut symbol =
                    Symbol::new(&name, SymbolKind::Method, "csharp", file_path, line_no, end)
                        .with_signature(orig_line.trim().trim_end_matches('{').trim());
                if caps[1].contains("public") {
                    symbol = symbol.with_extra("public", "true");
                }
                if caps[1].contains("async") {
                    symbol = symbol.with_extra("async", "true");
                }
                if let Some(container) = containers.last() {
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
            if let Some(caps) = USING_RE.captures(line) {
                let path = caps[2].to_string();
                let is_local =
                    !(path.starts_with("System") || path.starts_with("Microsoft"));
                let mut import = Import::new(path, idx as u32 + 1, is_local);
                if let Some(alias) = caps.get(1) {
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

    const SAMPLE: &str = r#"using System;
using System.Collections.Generic;
using Api = MyApp.Api;
using MyApp.Models;

namespace MyApp.Services
{
    /// Coordinates order placement.
    public class OrderService
    {
        public const int MaxItems = 50;

        public OrderService()
        {
        }

        public async Task<bool> Place(Order order)
        {
            return Validate(order);
        }

        private bool Validate(Order order)
        {
            return true;
        }
    }

    internal struct OrderId
    {
    }

    public enum Status { Open, Closed }
}
"#;

    #[test]
    fn test_symbols() {
        let symbols = CSharpAnalyzer.symbols("OrderService.cs", SAMPLE);
        let find = |name: &str| symbols.iter().find(|s| s.name == name).unwrap();

        assert_eq!(find("MyApp.Services").kind, SymbolKind::Package);
        assert_eq!(find("OrderService").kind, SymbolKind::Class);
        assert_eq!(find("OrderId").kind, SymbolKind::Struct);
        assert_eq!(find("Status").kind, SymbolKind::Enum);
        assert_eq!(find("MaxItems").kind, SymbolKind::Constant);

        let place = find("Place");
        assert_eq!(place.kind, SymbolKind::Method);
        assert_eq!(place.parent.as_deref(), Some("OrderService"));
        assert_eq!(place.extra.get("async").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_exports_public_gate() {
        let exports = CSharpAnalyzer.exports(SAMPLE);
        let names: Vec<&str> = exports.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"OrderService"));
        assert!(names.contains(&"Place"));
        assert!(names.contains(&"MaxItems"));
        assert!(!names.contains(&"Validate"));
        assert!(!names.contains(&"OrderId"));
    }

    #[test]
    fn test_using_locality() {
        let imports = CSharpAnalyzer.imports(SAMPLE);
        let by_path = |p: &str| imports.iter().find(|i| i.path == p).unwrap();

        assert!(!by_path("System").is_local);
        assert!(!by_path("System.Collections.Generic").is_local);
        assert!(by_path("MyApp.Api").is_local);
        assert_eq!(by_path("MyApp.Api").alias.as_deref(), Some("Api"));
        assert!(by_path("MyApp.Models").is_local);
    }

    #[test]
    fn test_function_body() {
        let body = CSharpAnalyzer.function_body(SAMPLE, "Place").unwrap();
        assert!(body.contains("Validate(order)"));
    }
}
