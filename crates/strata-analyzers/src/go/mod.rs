//! Go analyzer backed by tree-sitter-go.
//!
//! Go is the one language with a real parser: package, type, const, var,
//! func, and import declarations are extracted from the syntax tree, methods
//! are recognized by their receiver, and call sites inside function bodies
//! feed the call-graph builder. Exported symbols are those whose name begins
//! with an upper-case letter.

use std::sync::Mutex;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Parser, Query, QueryCursor, Tree};

use strata_core::types::{Export, Import, Symbol, SymbolKind};

use crate::Analyzer;

const SYMBOL_QUERY: &str = r#"
(package_clause (package_identifier) @pkg.name) @pkg.decl

(function_declaration name: (identifier) @func.name) @func.decl

(method_declaration
  receiver: (parameter_list) @method.recv
  name: (field_identifier) @method.name) @method.decl

(type_declaration
  (type_spec name: (type_identifier) @type.name type: (_) @type.body)) @type.decl

(type_declaration
  (type_alias name: (type_identifier) @alias.name)) @alias.decl

(const_declaration (const_spec name: (identifier) @const.name)) @const.decl

(var_declaration (var_spec name: (identifier) @var.name)) @var.decl
"#;

const IMPORT_QUERY: &str = r#"
(import_spec path: (interpreted_string_literal) @import.path) @import.spec
"#;

/// A function node discovered for the call graph, keyed `package.name`.
#[derive(Debug, Clone)]
pub struct GoFunction {
    pub id: String,
    pub name: String,
    pub package: String,
    pub line: u32,
    pub signature: String,
}

/// A call site inside a Go function body.
#[derive(Debug, Clone)]
pub struct GoCall {
    pub caller_id: String,
    pub callee_id: String,
    pub line: u32,
}

pub struct GoAnalyzer {
    parser: Mutex<Parser>,
    symbol_query: Query,
    import_query: Query,
}

impl GoAnalyzer {
    pub fn new() -> Self {
        let language: tree_sitter::Language = tree_sitter_go::LANGUAGE.into();
        let mut parser = Parser::new();
        // The grammar version is pinned by Cargo; set_language only fails on
        // an ABI mismatch, which a fresh build cannot produce.
        let _ = parser.set_language(&language);
        let symbol_query =
            Query::new(&language, SYMBOL_QUERY).unwrap_or_else(|e| panic!("go symbol query: {e}"));
        let import_query =
            Query::new(&language, IMPORT_QUERY).unwrap_or_else(|e| panic!("go import query: {e}"));
        GoAnalyzer {
            parser: Mutex::new(parser),
            symbol_query,
            import_query,
        }
    }

    fn parse(&self, source: &str) -> Option<Tree> {
        let mut parser = self.parser.lock().ok()?;
        parser.parse(source.as_bytes(), None)
    }

    /// Function declarations and the call sites within their bodies, as used
    /// by the call-graph builder. Callee ids are `package.calleeName`; a
    /// selector call `pkg.F()` attributes the callee to `pkg`, a bare call
    /// `F()` to the current package.
    pub fn extract_calls(&self, source: &str) -> (Vec<GoFunction>, Vec<GoCall>) {
        let Some(tree) = self.parse(source) else {
            return (Vec::new(), Vec::new());
        };
        let bytes = source.as_bytes();
        let package = package_name(tree.root_node(), bytes).unwrap_or_else(|| "main".to_string());

        let mut functions = Vec::new();
        let mut calls = Vec::new();

        let mut cursor = tree.root_node().walk();
        for child in tree.root_node().children(&mut cursor) {
            let kind = child.kind();
            if kind != "function_declaration" && kind != "method_declaration" {
                continue;
            }
            let Some(name_node) = child.child_by_field_name("name") else {
                continue;
            };
            let name = node_text(name_node, bytes).to_string();
            let id = format!("{package}.{name}");
            functions.push(GoFunction {
                id: id.clone(),
                name: name.clone(),
                package: package.clone(),
                line: child.start_position().row as u32 + 1,
                signature: declaration_signature(child, bytes),
            });

            if let Some(body) = child.child_by_field_name("body") {
                collect_calls(body, bytes, &package, &id, &mut calls);
            }
        }

        (functions, calls)
    }
}

impl Default for GoAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for GoAnalyzer {
    fn language(&self) -> &'static str {
        "go"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn symbols(&self, file_path: &str, source: &str) -> Vec<Symbol> {
        let Some(tree) = self.parse(source) else {
            return Vec::new();
        };
        let bytes = source.as_bytes();
        let capture_names = self.symbol_query.capture_names();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.symbol_query, tree.root_node(), bytes);

        let mut symbols = Vec::new();
        while let Some(m) = matches.next() {
            let mut name = None;
            let mut decl: Option<Node> = None;
            let mut recv: Option<Node> = None;
            let mut type_body_kind = None;
            let mut kind = None;

            for cap in m.captures {
                match capture_names[cap.index as usize] {
                    "pkg.name" => {
                        name = Some(node_text(cap.node, bytes).to_string());
                        kind = Some(SymbolKind::Package);
                    }
                    "func.name" => {
                        name = Some(node_text(cap.node, bytes).to_string());
                        kind = Some(SymbolKind::Function);
                    }
                    "method.name" => {
                        name = Some(node_text(cap.node, bytes).to_string());
                        kind = Some(SymbolKind::Method);
                    }
                    "method.recv" => recv = Some(cap.node),
                    "type.name" => {
                        name = Some(node_text(cap.node, bytes).to_string());
                    }
                    "type.body" => type_body_kind = Some(cap.node.kind()),
                    "alias.name" => {
                        name = Some(node_text(cap.node, bytes).to_string());
                        kind = Some(SymbolKind::TypeAlias);
                    }
                    "const.name" => {
                        name = Some(node_text(cap.node, bytes).to_string());
                        kind = Some(SymbolKind::Constant);
                    }
                    "var.name" => {
                        name = Some(node_text(cap.node, bytes).to_string());
                        kind = Some(SymbolKind::Variable);
                    }
                    cap_name if cap_name.ends_with(".decl") => decl = Some(cap.node),
                    _ => {}
                }
            }

            let kind = kind.or_else(|| {
                type_body_kind.map(|k| match k {
                    "struct_type" => SymbolKind::Struct,
                    "interface_type" => SymbolKind::Interface,
                    _ => SymbolKind::TypeAlias,
                })
            });

            let (Some(name), Some(kind), Some(decl)) = (name, kind, decl) else {
                continue;
            };

            let line_start = decl.start_position().row as u32 + 1;
            let line_end = decl.end_position().row as u32 + 1;
            let mut symbol = Symbol::new(&name, kind, "go", file_path, line_start, line_end)
                .with_signature(declaration_signature(decl, bytes));
            if let Some(doc) = crate::blocks::c_style_doc(source, line_start) {
                symbol.doc = Some(doc);
            }
            if let Some(recv) = recv {
                if let Some(receiver) = receiver_type(recv, bytes) {
                    symbol = symbol.with_parent(receiver);
                }
            }
            if is_exported(&name) {
                symbol = symbol.with_extra("public", "true");
            }
            symbols.push(symbol);
        }

        symbols.sort_by_key(|s| s.line_start);
        symbols
    }

    fn imports(&self, source: &str) -> Vec<Import> {
        let Some(tree) = self.parse(source) else {
            return Vec::new();
        };
        let bytes = source.as_bytes();
        let capture_names = self.import_query.capture_names();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.import_query, tree.root_node(), bytes);

        let mut imports = Vec::new();
        while let Some(m) = matches.next() {
            let mut path = None;
            let mut alias = None;
            let mut line = 0;
            for cap in m.captures {
                match capture_names[cap.index as usize] {
                    "import.path" => {
                        path = Some(node_text(cap.node, bytes).trim_matches('"').to_string());
                    }
                    "import.spec" => {
                        line = cap.node.start_position().row as u32 + 1;
                        alias = cap
                            .node
                            .child_by_field_name("name")
                            .map(|n| node_text(n, bytes).to_string());
                    }
                    _ => {}
                }
            }
            if let Some(path) = path {
                // Project-relative resolution of Go module paths is left to
                // the caller; every import is flagged local here.
                let mut import = Import::new(path, line, true);
                if let Some(alias) = alias {
                    import = import.with_alias(alias);
                }
                imports.push(import);
            }
        }

        imports.sort_by_key(|i| i.line);
        imports
    }

    fn exports(&self, source: &str) -> Vec<Export> {
        self.symbols("", source)
            .into_iter()
            .filter(|s| s.kind != SymbolKind::Package && is_exported(&s.name))
            .map(|s| Export::new(s.name, s.kind.as_str(), s.line_start))
            .collect()
    }

    fn function_body(&self, source: &str, name: &str) -> Option<String> {
        let tree = self.parse(source)?;
        let bytes = source.as_bytes();
        let mut cursor = tree.root_node().walk();
        for child in tree.root_node().children(&mut cursor) {
            let kind = child.kind();
            if kind != "function_declaration" && kind != "method_declaration" {
                continue;
            }
            let Some(name_node) = child.child_by_field_name("name") else {
                continue;
            };
            if node_text(name_node, bytes) == name {
                let body = child.child_by_field_name("body")?;
                return Some(node_text(body, bytes).to_string());
            }
        }
        None
    }
}

fn node_text<'a>(node: Node<'a>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}

fn package_name(root: Node, bytes: &[u8]) -> Option<String> {
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() == "package_clause" {
            let mut inner = child.walk();
            for part in child.children(&mut inner) {
                if part.kind() == "package_identifier" {
                    return Some(node_text(part, bytes).to_string());
                }
            }
        }
    }
    None
}

/// First line of a declaration, up to the opening brace.
fn declaration_signature(decl: Node, bytes: &[u8]) -> String {
    let text = node_text(decl, bytes);
    let first = text.lines().next().unwrap_or("");
    first.trim_end_matches('{').trim().to_string()
}

/// Receiver type from a `(name *Type)` parameter list: the last token with
/// pointer and package qualifiers stripped.
fn receiver_type(recv: Node, bytes: &[u8]) -> Option<String> {
    let text = node_text(recv, bytes);
    let inner = text.trim_start_matches('(').trim_end_matches(')');
    let last = inner.split_whitespace().last()?;
    let bare = last.trim_start_matches('*');
    let bare = bare.rsplit('.').next().unwrap_or(bare);
    // Generic receivers like Box[T] keep only the type name.
    let bare = bare.split('[').next().unwrap_or(bare);
    if bare.is_empty() {
        None
    } else {
        Some(bare.to_string())
    }
}

fn collect_calls(node: Node, bytes: &[u8], package: &str, caller_id: &str, out: &mut Vec<GoCall>) {
    if node.kind() == "call_expression" {
        if let Some(function) = node.child_by_field_name("function") {
            let callee_id = match function.kind() {
                "identifier" => Some(format!("{package}.{}", node_text(function, bytes))),
                "selector_expression" => {
                    let operand = function.child_by_field_name("operand");
                    let field = function.child_by_field_name("field");
                    match (operand, field) {
                        (Some(op), Some(field)) if op.kind() == "identifier" => Some(format!(
                            "{}.{}",
                            node_text(op, bytes),
                            node_text(field, bytes)
                        )),
                        _ => None,
                    }
                }
                _ => None,
            };
            if let Some(callee_id) = callee_id {
                out.push(GoCall {
                    caller_id: caller_id.to_string(),
                    callee_id,
                    line: node.start_position().row as u32 + 1,
                });
            }
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_calls(child, bytes, package, caller_id, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"package main

import (
	"fmt"
	other "example.com/lib"
)

// Greeting prefix used by Hello.
const Prefix = "hi"

var count int

// Hello prints a greeting.
func Hello() {
	World()
	fmt.Println(Prefix)
}

func World() {}

type Server struct {
	addr string
}

type Handler interface {
	Serve()
}

type ID = int

func (s *Server) Start() {
	Hello()
}
"#;

    fn analyzer() -> GoAnalyzer {
        GoAnalyzer::new()
    }

    #[test]
    fn test_symbols_kinds_and_lines() {
        let symbols = analyzer().symbols("main.go", SAMPLE);
        let find = |name: &str| symbols.iter().find(|s| s.name == name).unwrap();

        assert_eq!(find("main").kind, SymbolKind::Package);
        assert_eq!(find("Prefix").kind, SymbolKind::Constant);
        assert_eq!(find("count").kind, SymbolKind::Variable);
        assert_eq!(find("Hello").kind, SymbolKind::Function);
        assert_eq!(find("Server").kind, SymbolKind::Struct);
        assert_eq!(find("Handler").kind, SymbolKind::Interface);
        assert_eq!(find("ID").kind, SymbolKind::TypeAlias);

        let start = find("Start");
        assert_eq!(start.kind, SymbolKind::Method);
        assert_eq!(start.parent.as_deref(), Some("Server"));

        let hello = find("Hello");
        assert_eq!(hello.line_start, 14);
        assert!(hello.line_end > hello.line_start);
        assert_eq!(hello.doc.as_deref(), Some("Hello prints a greeting."));
    }

    #[test]
    fn test_exported_symbols_flagged() {
        let symbols = analyzer().symbols("main.go", SAMPLE);
        let hello = symbols.iter().find(|s| s.name == "Hello").unwrap();
        let count = symbols.iter().find(|s| s.name == "count").unwrap();
        assert_eq!(hello.extra.get("public").map(String::as_str), Some("true"));
        assert!(count.extra.get("public").is_none());
    }

    #[test]
    fn test_imports_with_alias() {
        let imports = analyzer().imports(SAMPLE);
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].path, "fmt");
        assert!(imports[0].is_local);
        assert_eq!(imports[1].path, "example.com/lib");
        assert_eq!(imports[1].alias.as_deref(), Some("other"));
    }

    #[test]
    fn test_exports_upper_case_gate() {
        let exports = analyzer().exports(SAMPLE);
        let names: Vec<&str> = exports.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"Hello"));
        assert!(names.contains(&"Server"));
        assert!(names.contains(&"Start"));
        assert!(!names.contains(&"count"));
        assert!(!names.contains(&"main"));
    }

    #[test]
    fn test_extract_calls() {
        let (functions, calls) = analyzer().extract_calls(SAMPLE);
        let ids: Vec<&str> = functions.iter().map(|f| f.id.as_str()).collect();
        assert!(ids.contains(&"main.Hello"));
        assert!(ids.contains(&"main.World"));
        assert!(ids.contains(&"main.Start"));

        assert!(calls
            .iter()
            .any(|c| c.caller_id == "main.Hello" && c.callee_id == "main.World"));
        assert!(calls
            .iter()
            .any(|c| c.caller_id == "main.Hello" && c.callee_id == "fmt.Println"));
        assert!(calls
            .iter()
            .any(|c| c.caller_id == "main.Start" && c.callee_id == "main.Hello"));
    }

    #[test]
    fn test_function_body() {
        let body = analyzer().function_body(SAMPLE, "Hello").unwrap();
        assert!(body.contains("World()"));
        assert!(analyzer().function_body(SAMPLE, "missing").is_none());
    }

    #[test]
    fn test_garbage_input_yields_empty() {
        let symbols = analyzer().symbols("x.go", "}}} not go at all {{{");
        // tree-sitter still produces a tree; no declarations means no symbols.
        assert!(symbols.iter().all(|s| s.kind != SymbolKind::Function));
    }
}
