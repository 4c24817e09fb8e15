//! TypeScript / JavaScript analyzer.
//!
//! Extraction is line-anchored regular expressions over neutralized source
//! (see [`crate::strip`]): classes, interfaces, type aliases, enums, function
//! declarations, arrow functions, variables, and the named / default /
//! re-export forms. Function end lines come from brace matching starting at
//! the declaration.
//!
//! The free functions [`function_decls`] and [`call_sites`] feed the
//! call-graph builder for TS, JS, and Vue script blocks.

use std::sync::LazyLock;

use regex::Regex;

use strata_core::types::{Export, Import, Symbol, SymbolKind};

use crate::blocks::{brace_block_end, brace_body_text};
use crate::strip::{neutralize, strip_comments};
use crate::Analyzer;

static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][\w$]*)").unwrap()
});
static INTERFACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:declare\s+)?interface\s+([A-Za-z_$][\w$]*)").unwrap()
});
static TYPE_ALIAS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?type\s+([A-Za-z_$][\w$]*)\s*(?:<[^=]*>)?\s*=").unwrap()
});
static ENUM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:declare\s+)?(?:const\s+)?enum\s+([A-Za-z_$][\w$]*)").unwrap()
});
static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:default\s+)?(async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*\(").unwrap()
});
static ARROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=]*)?=\s*(async\s+)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*(?::[^=>]*)?=>").unwrap()
});
static VARIABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=;]*)?[=;]").unwrap()
});
static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(?:public|private|protected|static|override|async)\s+)*\*?\s*([A-Za-z_$][\w$]*)\s*\([^)]*\)\s*(?::[^({]*)?\{").unwrap()
});

static IMPORT_FROM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+(.+?)\s+from\s+['"]([^'"]+)['"]"#).unwrap()
});
static IMPORT_BARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*import\s+['"]([^'"]+)['"]"#).unwrap());
static REQUIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*)?require\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap()
});
static EXPORT_FROM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*export\s+(?:\*(?:\s+as\s+([A-Za-z_$][\w$]*))?|\{[^}]*\})\s*from\s+['"]([^'"]+)['"]"#).unwrap()
});

static EXPORT_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*export\s+(default\s+)?(?:declare\s+)?(?:abstract\s+)?(async\s+)?(class|interface|type|enum|function|const|let|var)\s*\*?\s+([A-Za-z_$][\w$]*)").unwrap()
});
static EXPORT_DEFAULT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*export\s+default\s+([A-Za-z_$][\w$]*)\s*;?\s*$").unwrap()
});
static EXPORT_BRACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*export\s*\{([^}]*)\}(?:\s*from\s+['"]([^'"]+)['"])?"#).unwrap()
});

/// Callee identifiers that look like calls but are language keywords.
pub const CALL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "function", "switch", "catch", "return", "throw", "new", "typeof",
    "instanceof", "await", "import", "export", "class", "extends",
];

static CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Za-z_$][\w$]*)\s*\(").unwrap());

/// A function-like declaration discovered for the call graph.
#[derive(Debug, Clone)]
pub struct TsFunction {
    pub name: String,
    pub line: u32,
    pub signature: String,
}

/// An `identifier(` occurrence attributable to a declared function.
#[derive(Debug, Clone)]
pub struct TsCallSite {
    pub callee: String,
    pub line: u32,
}

fn is_call_keyword(name: &str) -> bool {
    CALL_KEYWORDS.contains(&name)
}

/// Discover function-like declarations in neutralized source: named function
/// declarations, `const name = (...) =>` arrows, and method-like
/// `name(...) {` members.
pub fn function_decls(stripped: &str) -> Vec<TsFunction> {
    let mut decls = Vec::new();
    for (idx, line) in stripped.lines().enumerate() {
        let line_no = idx as u32 + 1;
        let name = if let Some(caps) = FUNCTION_RE.captures(line) {
            Some(caps[2].to_string())
        } else if let Some(caps) = ARROW_RE.captures(line) {
            Some(caps[1].to_string())
        } else if let Some(caps) = METHOD_RE.captures(line) {
            let name = caps[1].to_string();
            if is_call_keyword(&name) || name == "constructor" {
                None
            } else {
                Some(name)
            }
        } else {
            None
        };
        if let Some(name) = name {
            if decls.iter().any(|d: &TsFunction| d.name == name) {
                continue;
            }
            decls.push(TsFunction {
                name,
                line: line_no,
                signature: line.trim().trim_end_matches('{').trim().to_string(),
            });
        }
    }
    decls
}

/// Find `identifier(` call patterns line-by-line, ignoring keywords,
/// declaration self-matches, and `function`/`new` prefixes.
pub fn call_sites(stripped: &str, decls: &[TsFunction]) -> Vec<TsCallSite> {
    let mut sites = Vec::new();
    for (idx, line) in stripped.lines().enumerate() {
        let line_no = idx as u32 + 1;
        for caps in CALL_RE.captures_iter(line) {
            let m = caps.get(1).map(|g| (g.as_str(), g.start()));
            let Some((name, start)) = m else { continue };
            if is_call_keyword(name) {
                continue;
            }
            let prefix = line[..start].trim_end();
            if prefix.ends_with("function") || prefix.ends_with("new") || prefix.ends_with('*') {
                continue;
            }
            // A declaration line matching its own name is not a call site.
            if decls.iter().any(|d| d.line == line_no && d.name == name) {
                continue;
            }
            sites.push(TsCallSite {
                callee: name.to_string(),
                line: line_no,
            });
        }
    }
    sites
}

pub struct TsAnalyzer {
    language: &'static str,
    extensions: &'static [&'static str],
}

impl TsAnalyzer {
    pub fn typescript() -> Self {
        TsAnalyzer {
            language: "typescript",
            extensions: &["ts", "tsx"],
        }
    }

    pub fn javascript() -> Self {
        TsAnalyzer {
            language: "javascript",
            extensions: &["js", "jsx", "mjs"],
        }
    }
}

/// Shared extraction core, also used by the Vue analyzer on script blocks.
/// `line_offset` shifts all reported lines (0 for standalone files).
pub(crate) fn extract_symbols(
    language: &str,
    file_path: &str,
    source: &str,
    line_offset: u32,
) -> Vec<Symbol> {
    let stripped = neutralize(source);
    let mut symbols = Vec::new();

    for (idx, line) in stripped.lines().enumerate() {
        let line_no = idx as u32 + 1;
        let (name, kind, is_async) = if let Some(caps) = CLASS_RE.captures(line) {
            (caps[1].to_string(), SymbolKind::Class, false)
        } else if let Some(caps) = INTERFACE_RE.captures(line) {
            (caps[1].to_string(), SymbolKind::Interface, false)
        } else if let Some(caps) = TYPE_ALIAS_RE.captures(line) {
            (caps[1].to_string(), SymbolKind::TypeAlias, false)
        } else if let Some(caps) = ENUM_RE.captures(line) {
            (caps[1].to_string(), SymbolKind::Enum, false)
        } else if let Some(caps) = FUNCTION_RE.captures(line) {
            (caps[2].to_string(), SymbolKind::Function, caps.get(1).is_some())
        } else if let Some(caps) = ARROW_RE.captures(line) {
            (caps[1].to_string(), SymbolKind::Function, caps.get(2).is_some())
        } else if let Some(caps) = VARIABLE_RE.captures(line) {
            let kind = if &caps[1] == "const" {
                SymbolKind::Constant
            } else {
                SymbolKind::Variable
            };
            (caps[2].to_string(), kind, false)
        } else {
            continue;
        };

        let line_end = match kind {
            SymbolKind::Class
            | SymbolKind::Interface
            | SymbolKind::Enum
            | SymbolKind::Function => brace_block_end(&stripped, line_no, 2),
            _ => line_no,
        };

        let original_line = source.lines().nth(idx).unwrap_or("");
        let mut symbol = Symbol::new(
            &name,
            kind,
            language,
            file_path,
            line_no + line_offset,
            line_end + line_offset,
        )
        .with_signature(original_line.trim().trim_end_matches('{').trim());
        if is_async {
            symbol = symbol.with_extra("async", "true");
        }
        if let Some(doc) = crate::blocks::c_style_doc(source, line_no) {
            symbol.doc = Some(doc);
        }
        symbols.push(symbol);
    }

    symbols
}

pub(crate) fn extract_imports(source: &str) -> Vec<Import> {
    let stripped_commentless = strip_comments(source);
    let mut imports = Vec::new();

    for (idx, line) in stripped_commentless.lines().enumerate() {
        let line_no = idx as u32 + 1;
        if let Some(caps) = IMPORT_FROM_RE.captures(line) {
            let clause = caps[1].trim().to_string();
            let path = caps[2].to_string();
            let mut import = Import::new(&path, line_no, is_local_path(&path));
            if let Some(alias) = import_clause_alias(&clause) {
                import = import.with_alias(alias);
            }
            imports.push(import);
        } else if let Some(caps) = IMPORT_BARE_RE.captures(line) {
            let path = caps[1].to_string();
            imports.push(Import::new(&path, line_no, is_local_path(&path)));
        } else if let Some(caps) = EXPORT_FROM_RE.captures(line) {
            let path = caps[2].to_string();
            imports.push(Import::new(&path, line_no, is_local_path(&path)));
        } else {
            for caps in REQUIRE_RE.captures_iter(line) {
                let path = caps[2].to_string();
                let mut import = Import::new(&path, line_no, is_local_path(&path));
                if let Some(alias) = caps.get(1) {
                    import = import.with_alias(alias.as_str());
                }
                imports.push(import);
            }
        }
    }

    imports
}

pub(crate) fn extract_exports(source: &str) -> Vec<Export> {
    let stripped = strip_comments(source);
    let mut exports = Vec::new();

    for (idx, line) in stripped.lines().enumerate() {
        let line_no = idx as u32 + 1;
        if let Some(caps) = EXPORT_DECL_RE.captures(line) {
            let mut export = Export::new(&caps[4], &caps[3], line_no);
            export.is_default = caps.get(1).is_some();
            exports.push(export);
        } else if let Some(caps) = EXPORT_BRACE_RE.captures(line) {
            let source_path = caps.get(2).map(|m| m.as_str().to_string());
            for item in caps[1].split(',') {
                let item = item.trim();
                if item.is_empty() {
                    continue;
                }
                let mut parts = item.splitn(2, " as ");
                let name = parts.next().unwrap_or("").trim();
                let alias = parts.next().map(|a| a.trim().to_string());
                if name.is_empty() {
                    continue;
                }
                let mut export = Export::new(name, "named", line_no);
                export.alias = alias;
                export.is_reexport = source_path.is_some();
                export.source = source_path.clone();
                exports.push(export);
            }
        } else if let Some(caps) = EXPORT_FROM_RE.captures(line) {
            let name = caps.get(1).map_or("*", |m| m.as_str());
            let mut export = Export::new(name, "namespace", line_no);
            export.is_reexport = true;
            export.source = Some(caps[2].to_string());
            exports.push(export);
        } else if let Some(caps) = EXPORT_DEFAULT_NAME_RE.captures(line) {
            let mut export = Export::new(&caps[1], "default", line_no);
            export.is_default = true;
            exports.push(export);
        } else if line.trim_start().starts_with("export default") {
            let mut export = Export::new("default", "default", line_no);
            export.is_default = true;
            exports.push(export);
        }
    }

    exports
}

pub(crate) fn extract_function_body(source: &str, name: &str) -> Option<String> {
    let stripped = neutralize(source);
    let decls = function_decls(&stripped);
    let decl = decls.iter().find(|d| d.name == name)?;

    // A braceless arrow owns no block; grabbing the next `{` in the file
    // would steal a later function's body.
    let decl_line = stripped.lines().nth(decl.line as usize - 1)?;
    if decl_line.contains("=>") && !decl_line.contains('{') {
        let line = source.lines().nth(decl.line as usize - 1)?;
        return line.split_once("=>").map(|(_, rest)| rest.trim().to_string());
    }

    brace_body_text(source, &stripped, decl.line)
}

fn import_clause_alias(clause: &str) -> Option<String> {
    if let Some(rest) = clause.strip_prefix("* as ") {
        return Some(rest.trim().to_string());
    }
    let head = clause.split(',').next()?.trim();
    if head.is_empty() || head.starts_with('{') {
        return None;
    }
    Some(head.trim_start_matches("type ").trim().to_string())
}

fn is_local_path(path: &str) -> bool {
    path.starts_with('.') || path.starts_with("@/")
}

impl Analyzer for TsAnalyzer {
    fn language(&self) -> &'static str {
        self.language
    }

    fn extensions(&self) -> &'static [&'static str] {
        self.extensions
    }

    fn symbols(&self, file_path: &str, source: &str) -> Vec<Symbol> {
        extract_symbols(self.language, file_path, source, 0)
    }

    fn imports(&self, source: &str) -> Vec<Import> {
        extract_imports(source)
    }

    fn exports(&self, source: &str) -> Vec<Export> {
        extract_exports(source)
    }

    fn function_body(&self, source: &str, name: &str) -> Option<String> {
        extract_function_body(source, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"import { api } from './api';
import * as utils from '@/utils';
import 'reflect-metadata';
import React from 'react';

/** Greets the user. */
export async function greet(name: string): Promise<void> {
    api.send(format(name));
}

function format(name: string): string {
    return name.trim();
}

export const handler = async (req: Request) => {
    await greet(req.user);
};

export class Session {
    start() {
        format("x");
    }
}

export interface User {
    name: string;
}

export type UserId = string;

export enum Role { Admin, Member }

const MAX_RETRIES = 3;
let counter = 0;

export { format as formatName };
export * from './helpers';
export default Session;
"#;

    fn analyzer() -> TsAnalyzer {
        TsAnalyzer::typescript()
    }

    #[test]
    fn test_symbol_kinds() {
        let symbols = analyzer().symbols("src/app.ts", SAMPLE);
        let find = |name: &str| symbols.iter().find(|s| s.name == name).unwrap();

        assert_eq!(find("greet").kind, SymbolKind::Function);
        assert_eq!(find("format").kind, SymbolKind::Function);
        assert_eq!(find("handler").kind, SymbolKind::Function);
        assert_eq!(find("Session").kind, SymbolKind::Class);
        assert_eq!(find("User").kind, SymbolKind::Interface);
        assert_eq!(find("UserId").kind, SymbolKind::TypeAlias);
        assert_eq!(find("Role").kind, SymbolKind::Enum);
        assert_eq!(find("MAX_RETRIES").kind, SymbolKind::Constant);
        assert_eq!(find("counter").kind, SymbolKind::Variable);
    }

    #[test]
    fn test_function_spans_to_closing_brace() {
        let symbols = analyzer().symbols("src/app.ts", SAMPLE);
        let greet = symbols.iter().find(|s| s.name == "greet").unwrap();
        assert_eq!(greet.line_start, 7);
        assert_eq!(greet.line_end, 9);
        assert_eq!(greet.extra.get("async").map(String::as_str), Some("true"));
        assert_eq!(greet.doc.as_deref(), Some("Greets the user."));
    }

    #[test]
    fn test_symbols_inside_strings_ignored() {
        let src = "const s = \"class Fake {\";\nclass Real {}\n";
        let symbols = analyzer().symbols("a.ts", src);
        let classes: Vec<&str> = symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Class)
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(classes, vec!["Real"]);
    }

    #[test]
    fn test_imports() {
        let imports = analyzer().imports(SAMPLE);
        let by_path = |p: &str| imports.iter().find(|i| i.path == p).unwrap();

        assert!(by_path("./api").is_local);
        assert!(by_path("@/utils").is_local);
        assert_eq!(by_path("@/utils").alias.as_deref(), Some("utils"));
        assert!(!by_path("reflect-metadata").is_local);
        assert!(!by_path("react").is_local);
        assert_eq!(by_path("react").alias.as_deref(), Some("React"));
        assert!(by_path("./helpers").is_local);
    }

    #[test]
    fn test_exports() {
        let exports = analyzer().exports(SAMPLE);
        let find = |name: &str| exports.iter().find(|e| e.name == name).unwrap();

        assert_eq!(find("greet").kind, "function");
        assert_eq!(find("Session").kind, "class");
        assert_eq!(find("format").alias.as_deref(), Some("formatName"));
        assert!(find("*").is_reexport);
        assert_eq!(find("*").source.as_deref(), Some("./helpers"));
        assert!(exports.iter().any(|e| e.is_default));
    }

    #[test]
    fn test_function_decls_and_call_sites() {
        let stripped = neutralize(SAMPLE);
        let decls = function_decls(&stripped);
        let names: Vec<&str> = decls.iter().map(|d| d.name.as_str()).collect();
        assert!(names.contains(&"greet"));
        assert!(names.contains(&"format"));
        assert!(names.contains(&"handler"));
        assert!(names.contains(&"start"));

        let sites = call_sites(&stripped, &decls);
        assert!(sites.iter().any(|s| s.callee == "format" && s.line == 8));
        assert!(sites.iter().any(|s| s.callee == "greet" && s.line == 16));
        // Keywords never appear as callees.
        assert!(sites.iter().all(|s| !CALL_KEYWORDS.contains(&s.callee.as_str())));
    }

    #[test]
    fn test_function_body() {
        let body = analyzer().function_body(SAMPLE, "format").unwrap();
        assert!(body.contains("name.trim()"));
        assert!(analyzer().function_body(SAMPLE, "nope").is_none());
    }

    #[test]
    fn test_arrow_function_body() {
        let src = "const double = (x: number) => x * 2;\n";
        let body = analyzer().function_body(src, "double").unwrap();
        assert_eq!(body, "x * 2;");
    }
}
