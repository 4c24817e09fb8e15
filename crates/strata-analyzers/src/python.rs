//! Python analyzer.
//!
//! Regex extraction with indentation-based end-of-block detection (tabs weigh
//! 4 columns). Functions nested directly in a class are methods; names not
//! starting with `_` are exported. Docstrings directly under a `def`/`class`
//! line are captured as doc comments.

use std::sync::LazyLock;

use regex::Regex;

use strata_core::types::{Export, Import, Symbol, SymbolKind};

use crate::blocks::{indent_block_end, indent_width};
use crate::Analyzer;

static CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)class\s+([A-Za-z_]\w*)\s*[(:]").unwrap());
static DEF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)(async\s+)?def\s+([A-Za-z_]\w*)\s*\(").unwrap());
static ASSIGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_]\w*)\s*(?::[^=]+)?=(?:[^=]|$)").unwrap());
static IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+(.+)").unwrap());
static FROM_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*from\s+(\.*[\w.]*)\s+import\s+").unwrap());
static IMPORT_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\w.]+)(?:\s+as\s+([A-Za-z_]\w*))?$").unwrap());

#[derive(Debug)]
enum Scope {
    Class(String),
    Function,
}

/// Blank out `#` comments and string literal contents, line by line. Triple
/// quotes are tracked across lines so code inside docstrings never matches.
fn clean_source(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut in_triple: Option<&str> = None;

    for line in source.lines() {
        let mut cleaned = String::with_capacity(line.len());
        let bytes = line.as_bytes();
        let mut i = 0;

        while i < line.len() {
            if let Some(quote) = in_triple {
                if line[i..].starts_with(quote) {
                    in_triple = None;
                    cleaned.push_str("   ");
                    i += 3;
                } else {
                    let c = line[i..].chars().next().unwrap_or(' ');
                    for _ in 0..c.len_utf8() {
                        cleaned.push(' ');
                    }
                    i += c.len_utf8();
                }
                continue;
            }

            if line[i..].starts_with("\"\"\"") || line[i..].starts_with("'''") {
                in_triple = Some(if bytes[i] == b'"' { "\"\"\"" } else { "'''" });
                cleaned.push_str("   ");
                i += 3;
                continue;
            }

            let c = line[i..].chars().next().unwrap_or(' ');
            match c {
                '#' => {
                    for _ in cleaned.len()..line.len() {
                        cleaned.push(' ');
                    }
                    break;
                }
                '"' | '\'' => {
                    // Single-line string: blank until the closing quote.
                    cleaned.push(' ');
                    i += 1;
                    let mut escaped = false;
                    while i < line.len() {
                        let sc = line[i..].chars().next().unwrap_or(' ');
                        for _ in 0..sc.len_utf8() {
                            cleaned.push(' ');
                        }
                        i += sc.len_utf8();
                        if escaped {
                            escaped = false;
                        } else if sc == '\\' {
                            escaped = true;
                        } else if sc == c {
                            break;
                        }
                    }
                    continue;
                }
                _ => {
                    cleaned.push(c);
                    i += c.len_utf8();
                }
            }
        }

        out.push_str(&cleaned);
        out.push('\n');
    }

    out
}

/// Docstring of the block opening on `decl_line`: the first statement must be
/// a string literal.
fn docstring(source: &str, decl_line: u32) -> Option<String> {
    let lines: Vec<&str> = source.lines().collect();
    let mut idx = decl_line as usize;
    while idx < lines.len() && lines[idx].trim().is_empty() {
        idx += 1;
    }
    let first = lines.get(idx)?.trim();
    let quote = if first.starts_with("\"\"\"") {
        "\"\"\""
    } else if first.starts_with("'''") {
        "'''"
    } else {
        return None;
    };

    let rest = &first[3..];
    if let Some(end) = rest.find(quote) {
        let text = rest[..end].trim();
        return if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        };
    }

    let mut collected = vec![rest.trim().to_string()];
    for line in lines.iter().skip(idx + 1) {
        if let Some(end) = line.find(quote) {
            collected.push(line[..end].trim().to_string());
            break;
        }
        collected.push(line.trim().to_string());
    }
    let text = collected
        .into_iter()
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn is_constant_name(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_uppercase())
        && !name.chars().any(|c| c.is_ascii_lowercase())
}

pub struct PythonAnalyzer;

impl Analyzer for PythonAnalyzer {
    fn language(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py", "pyw", "pyi"]
    }

    fn symbols(&self, file_path: &str, source: &str) -> Vec<Symbol> {
        let cleaned = clean_source(source);
        let mut symbols = Vec::new();
        let mut stack: Vec<(u32, Scope)> = Vec::new();

        for (idx, line) in cleaned.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let line_no = idx as u32 + 1;
            let indent = indent_width(line);
            let orig_line = source.lines().nth(idx).unwrap_or(line);
            while let Some((top_indent, _)) = stack.last() {
                if indent <= *top_indent {
                    stack.pop();
                } else {
                    break;
                }
            }

            if let Some(caps) = CLASS_RE.captures(line) {
                let name = caps[2].to_string();
                let end = indent_block_end(source, line_no);
                let mut symbol =
                    Symbol::new(&name, SymbolKind::Class, "python", file_path, line_no, end)
                        .with_signature(orig_line.trim().trim_end_matches(':'));
                if let Some(doc) = docstring(source, line_no) {
                    symbol.doc = Some(doc);
                }
                symbols.push(symbol);
                stack.push((indent, Scope::Class(name)));
            } else if let Some(caps) = DEF_RE.captures(line) {
                let name = caps[3].to_string();
                let is_async = caps.get(2).is_some();
                let end = indent_block_end(source, line_no);
                let parent = match stack.last() {
                    Some((_, Scope::Class(class_name))) => Some(class_name.clone()),
                    _ => None,
                };
                let kind = if parent.is_some() {
                    SymbolKind::Method
                } else {
                    SymbolKind::Function
                };
                let mut symbol = Symbol::new(&name, kind, "python", file_path, line_no, end)
                    .with_signature(orig_line.trim().trim_end_matches(':'));
                if let Some(parent) = parent {
                    symbol = symbol.with_parent(parent);
                }
                if is_async {
                    symbol = symbol.with_extra("async", "true");
                }
                if let Some(doc) = docstring(source, line_no) {
                    symbol.doc = Some(doc);
                }
                symbols.push(symbol);
                stack.push((indent, Scope::Function));
            } else if indent == 0 {
                if let Some(caps) = ASSIGN_RE.captures(line) {
                    let name = caps[1].to_string();
                    let kind = if is_constant_name(&name) {
                        SymbolKind::Constant
                    } else {
                        SymbolKind::Variable
                    };
                    symbols.push(
                        Symbol::new(&name, kind, "python", file_path, line_no, line_no)
                            .with_signature(orig_line.trim()),
                    );
                }
            }
        }

        symbols
    }

    fn imports(&self, source: &str) -> Vec<Import> {
        let cleaned = clean_source(source);
        let mut imports = Vec::new();

        // Import paths are identifiers rather than string literals, so the
        // cleaned text is sufficient here.
        for (idx, line) in source.lines().enumerate() {
            let line_no = idx as u32 + 1;
            let cleaned_line = cleaned.lines().nth(idx).unwrap_or(line);

            if let Some(caps) = FROM_IMPORT_RE.captures(cleaned_line) {
                let path = caps[1].to_string();
                let is_local = path.starts_with('.');
                imports.push(Import::new(path, line_no, is_local));
            } else if let Some(caps) = IMPORT_RE.captures(cleaned_line) {
                for item in caps[1].split(',') {
                    let item = item.trim();
                    let Some(item_caps) = IMPORT_ITEM_RE.captures(item) else {
                        continue;
                    };
                    let path = item_caps[1].to_string();
                    // Bare `import x` with no dots stays inside the project;
                    // dotted paths name installed packages.
                    let is_local = !path.contains('.');
                    let mut import = Import::new(path, line_no, is_local);
                    if let Some(alias) = item_caps.get(2) {
                        import = import.with_alias(alias.as_str());
                    }
                    imports.push(import);
                }
            }
        }

        imports
    }

    fn exports(&self, source: &str) -> Vec<Export> {
        self.symbols("", source)
            .into_iter()
            .filter(|s| !s.name.starts_with('_'))
            .map(|s| Export::new(s.name, s.kind.as_str(), s.line_start))
            .collect()
    }

    fn function_body(&self, source: &str, name: &str) -> Option<String> {
        let cleaned = clean_source(source);
        for (idx, line) in cleaned.lines().enumerate() {
            let line_no = idx as u32 + 1;
            if let Some(caps) = DEF_RE.captures(line) {
                if &caps[3] == name {
                    let end = indent_block_end(source, line_no);
                    let body: Vec<&str> = source
                        .lines()
                        .skip(line_no as usize - 1)
                        .take((end - line_no + 1) as usize)
                        .collect();
                    return Some(body.join("\n"));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"import os
import sys as system
from collections import OrderedDict
from .models import User

MAX_SIZE = 100
default_timeout = 30

class Repo:
    """Stores things."""

    def save(self, item):
        self._write(item)

    def _write(self, item):
        pass

async def fetch(url):
    return url

def _internal():
    pass
"#;

    #[test]
    fn test_symbols_and_scopes() {
        let symbols = PythonAnalyzer.symbols("repo.py", SAMPLE);
        let find = |name: &str| symbols.iter().find(|s| s.name == name).unwrap();

        assert_eq!(find("Repo").kind, SymbolKind::Class);
        assert_eq!(find("Repo").doc.as_deref(), Some("Stores things."));
        assert_eq!(find("save").kind, SymbolKind::Method);
        assert_eq!(find("save").parent.as_deref(), Some("Repo"));
        assert_eq!(find("fetch").kind, SymbolKind::Function);
        assert_eq!(find("fetch").extra.get("async").map(String::as_str), Some("true"));
        assert_eq!(find("MAX_SIZE").kind, SymbolKind::Constant);
        assert_eq!(find("default_timeout").kind, SymbolKind::Variable);
    }

    #[test]
    fn test_block_ends_by_indentation() {
        let src = "class C:\n    def m(self):\n        pass\ndef f():\n    pass\n";
        let symbols = PythonAnalyzer.symbols("a.py", src);
        let c = symbols.iter().find(|s| s.name == "C").unwrap();
        let m = symbols.iter().find(|s| s.name == "m").unwrap();
        let f = symbols.iter().find(|s| s.name == "f").unwrap();
        assert_eq!((c.line_start, c.line_end), (1, 3));
        assert_eq!((m.line_start, m.line_end), (2, 3));
        assert_eq!((f.line_start, f.line_end), (4, 5));
    }

    #[test]
    fn test_exports_underscore_gate() {
        let exports = PythonAnalyzer.exports(SAMPLE);
        let names: Vec<&str> = exports.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"Repo"));
        assert!(names.contains(&"save"));
        assert!(names.contains(&"fetch"));
        assert!(!names.contains(&"_write"));
        assert!(!names.contains(&"_internal"));
    }

    #[test]
    fn test_imports_locality() {
        let imports = PythonAnalyzer.imports(SAMPLE);
        let by_path = |p: &str| imports.iter().find(|i| i.path == p).unwrap();

        assert!(by_path("os").is_local);
        assert_eq!(by_path("sys").alias.as_deref(), Some("system"));
        assert!(!by_path("collections").is_local);
        assert!(by_path(".models").is_local);
    }

    #[test]
    fn test_code_inside_docstring_ignored() {
        let src = "def f():\n    \"\"\"\n    def fake():\n        pass\n    \"\"\"\n    pass\n";
        let symbols = PythonAnalyzer.symbols("a.py", src);
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "f");
    }

    #[test]
    fn test_function_body() {
        let body = PythonAnalyzer.function_body(SAMPLE, "fetch").unwrap();
        assert!(body.contains("return url"));
        assert!(PythonAnalyzer.function_body(SAMPLE, "absent").is_none());
    }

    #[test]
    fn test_tab_indentation() {
        let src = "class C:\n\tdef m(self):\n\t\tpass\nX = 1\n";
        let symbols = PythonAnalyzer.symbols("a.py", src);
        let m = symbols.iter().find(|s| s.name == "m").unwrap();
        assert_eq!(m.kind, SymbolKind::Method);
        assert_eq!(m.parent.as_deref(), Some("C"));
    }
}
