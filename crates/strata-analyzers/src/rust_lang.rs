//! Rust analyzer.
//!
//! Regex extraction over neutralized source with brace-matched block ends.
//! `pub` gates exports; functions inside `impl`/`trait` blocks are methods
//! with the surrounding type as parent.

use std::sync::LazyLock;

use regex::Regex;

use strata_core::types::{Export, Import, Symbol, SymbolKind};

use crate::blocks::{brace_block_end, brace_body_text, c_style_doc};
use crate::strip::neutralize;
use crate::Analyzer;

static FN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(pub(?:\([^)]*\))?\s+)?(?:default\s+)?(?:const\s+)?(async\s+)?(?:unsafe\s+)?(?:extern\s+\S+\s+)?fn\s+([A-Za-z_]\w*)").unwrap()
});
static STRUCT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(pub(?:\([^)]*\))?\s+)?struct\s+([A-Za-z_]\w*)").unwrap()
});
static ENUM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(pub(?:\([^)]*\))?\s+)?enum\s+([A-Za-z_]\w*)").unwrap()
});
static TRAIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(pub(?:\([^)]*\))?\s+)?(?:unsafe\s+)?trait\s+([A-Za-z_]\w*)").unwrap()
});
static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(pub(?:\([^)]*\))?\s+)?type\s+([A-Za-z_]\w*)(?:<[^=]*>)?\s*=").unwrap()
});
static CONST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(pub(?:\([^)]*\))?\s+)?const\s+([A-Za-z_]\w*)\s*:").unwrap()
});
static STATIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(pub(?:\([^)]*\))?\s+)?static\s+(?:mut\s+)?([A-Za-z_]\w*)\s*:").unwrap()
});
static MOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(pub(?:\([^)]*\))?\s+)?mod\s+([A-Za-z_]\w*)\s*[;{]").unwrap()
});
static IMPL_FOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*impl(?:\s*<[^>]*>)?\s+[^{]*\bfor\s+([A-Za-z_]\w*)").unwrap()
});
static IMPL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*impl(?:\s*<[^>]*>)?\s+([A-Za-z_]\w*)").unwrap()
});
static USE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+([\w:]+(?:::\{[^}]*\}|::\*)?)\s*(?:as\s+([A-Za-z_]\w*))?\s*;").unwrap()
});

/// Strip lifetime quotes (`'a`, `'static`) so the shared neutralizer doesn't
/// mistake them for unterminated character literals. A quote is a lifetime
/// when an identifier follows and no closing quote ends a char literal.
fn erase_lifetimes(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' && i + 1 < chars.len() {
            let next = chars[i + 1];
            if next.is_alphabetic() || next == '_' {
                let mut j = i + 1;
                while j < chars.len() && (chars[j].is_alphanumeric() || chars[j] == '_') {
                    j += 1;
                }
                // 'a' is a char literal; 'a> or 'a, is a lifetime.
                if !(j < chars.len() && chars[j] == '\'' && j == i + 2) {
                    out.push(' ');
                    i += 1;
                    continue;
                }
            }
        }
        out.push(c);
        i += 1;
    }
    out
}

/// A container block (`impl Type` or `trait Name`) whose functions are
/// methods.
struct Container {
    parent: String,
    end_line: u32,
}

pub struct RustAnalyzer;

impl Analyzer for RustAnalyzer {
    fn language(&self) -> &'static str {
        "rust"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn symbols(&self, file_path: &str, source: &str) -> Vec<Symbol> {
        let stripped = neutralize(&erase_lifetimes(source));
        let mut symbols = Vec::new();
        let mut containers: Vec<Container> = Vec::new();

        for (idx, line) in stripped.lines().enumerate() {
            let line_no = idx as u32 + 1;
            containers.retain(|c| c.end_line >= line_no);
            let orig_line = source.lines().nth(idx).unwrap_or("");

            if let Some(caps) = IMPL_FOR_RE
                .captures(line)
                .or_else(|| IMPL_RE.captures(line))
            {
                containers.push(Container {
                    parent: caps[1].to_string(),
                    end_line: brace_block_end(&stripped, line_no, 2),
                });
                continue;
            }

            let (name, kind, is_pub, is_async, braced) =
                if let Some(caps) = FN_RE.captures(line) {
                    (
                        caps[3].to_string(),
                        SymbolKind::Function,
                        caps.get(1).is_some(),
                        caps.get(2).is_some(),
                        true,
                    )
                } else if let Some(caps) = STRUCT_RE.captures(line) {
                    (caps[2].to_string(), SymbolKind::Struct, caps.get(1).is_some(), false, true)
                } else if let Some(caps) = ENUM_RE.captures(line) {
                    (caps[2].to_string(), SymbolKind::Enum, caps.get(1).is_some(), false, true)
                } else if let Some(caps) = TRAIT_RE.captures(line) {
                    (caps[2].to_string(), SymbolKind::Interface, caps.get(1).is_some(), false, true)
                } else if let Some(caps) = TYPE_RE.captures(line) {
                    (caps[2].to_string(), SymbolKind::TypeAlias, caps.get(1).is_some(), false, false)
                } else if let Some(caps) = CONST_RE.captures(line) {
                    (caps[2].to_string(), SymbolKind::Constant, caps.get(1).is_some(), false, false)
                } else if let Some(caps) = STATIC_RE.captures(line) {
                    (caps[2].to_string(), SymbolKind::Variable, caps.get(1).is_some(), false, false)
                } else if let Some(caps) = MOD_RE.captures(line) {
                    (caps[2].to_string(), SymbolKind::Package, caps.get(1).is_some(), false, false)
                } else {
                    continue;
                };

            let line_end = if braced {
                brace_block_end(&stripped, line_no, 2)
            } else {
                line_no
            };

            let (kind, parent) = match (kind, containers.last()) {
                (SymbolKind::Function, Some(container)) => {
                    (SymbolKind::Method, Some(container.parent.clone()))
                }
                (kind, _) => (kind, None),
            };

            let mut symbol = Symbol::new(&name, kind, "rust", file_path, line_no, line_end)
                .with_signature(orig_line.trim().trim_end_matches('{').trim());
            if let Some(parent) = parent {
                symbol = symbol.with_parent(parent);
            }
            if is_pub {
                symbol = symbol.with_extra("public", "true");
            }
            if is_async {
                symbol = symbol.with_extra("async", "true");
            }
            if let Some(doc) = c_style_doc(source, line_no) {
                symbol.doc = Some(doc);
            }
            symbols.push(symbol);

            if kind == SymbolKind::Interface {
                // Trait items are methods of the trait.
                containers.push(Container {
                    parent: name,
                    end_line: line_end,
                });
            }
        }

        symbols
    }

    fn imports(&self, source: &str) -> Vec<Import> {
        let stripped = neutralize(&erase_lifetimes(source));
        let mut imports = Vec::new();
        for (idx, line) in stripped.lines().enumerate() {
            let line_no = idx as u32 + 1;
            if let Some(caps) = USE_RE.captures(line) {
                let path = caps[1].to_string();
                let is_local = path.starts_with("crate::")
                    || path.starts_with("self::")
                    || path.starts_with("super::");
                let mut import = Import::new(path, line_no, is_local);
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
            .filter(|s| s.extra.get("public").map(String::as_str) == Some("true"))
            .map(|s| Export::new(s.name, s.kind.as_str(), s.line_start))
            .collect()
    }

    fn function_body(&self, source: &str, name: &str) -> Option<String> {
        let stripped = neutralize(&erase_lifetimes(source));
        for (idx, line) in stripped.lines().enumerate() {
            if let Some(caps) = FN_RE.captures(line) {
                if &caps[3] == name {
                    return brace_body_text(source, &stripped, idx as u32 + 1);
                }
            }
        }
        None
    }
}
