//! Vue single-file component analyzer.
//!
//! Only the `<script>` block is analyzed; extraction inside it is the shared
//! TypeScript engine with all line numbers shifted to the enclosing `.vue`
//! file. The component itself is emitted as one "component" symbol named
//! after the file.

use std::sync::LazyLock;

use regex::Regex;

use strata_core::types::{Export, Import, Symbol, SymbolKind};

use crate::{typescript, Analyzer};

static SCRIPT_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<script[^>]*>").unwrap());

/// Locate the `<script>` block: returns (first script line as 0-based offset,
/// script source). The offset is the number of lines before the block's
/// content starts.
pub fn script_block(source: &str) -> Option<(u32, String)> {
    let open = SCRIPT_OPEN_RE.find(source)?;
    let content_start = open.end();
    let content_end = source[content_start..]
        .find("</script>")
        .map(|i| content_start + i)?;

    let mut offset = source[..content_start].matches('\n').count() as u32;
    let mut content = &source[content_start..content_end];
    // The opening tag usually ends its line; drop that first newline so the
    // script's first line of code is line offset+1.
    if let Some(rest) = content.strip_prefix('\n') {
        content = rest;
        offset += 1;
    }
    Some((offset, content.to_string()))
}

fn component_name(file_path: &str) -> String {
    let file = file_path.rsplit('/').next().unwrap_or(file_path);
    file.strip_suffix(".vue").unwrap_or(file).to_string()
}

pub struct VueAnalyzer;

impl Analyzer for VueAnalyzer {
    fn language(&self) -> &'static str {
        "vue"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["vue"]
    }

    fn symbols(&self, file_path: &str, source: &str) -> Vec<Symbol> {
        let total_lines = source.lines().count().max(1) as u32;
        let mut symbols = vec![Symbol::new(
            component_name(file_path),
            SymbolKind::Component,
            "vue",
            file_path,
            1,
            total_lines,
        )];

        if let Some((offset, script)) = script_block(source) {
            symbols.extend(typescript::extract_symbols("vue", file_path, &script, offset));
        }

        symbols
    }

    fn imports(&self, source: &str) -> Vec<Import> {
        let Some((offset, script)) = script_block(source) else {
            return Vec::new();
        };
        typescript::extract_imports(&script)
            .into_iter()
            .map(|mut import| {
                import.line += offset;
                import
            })
            .collect()
    }

    fn exports(&self, source: &str) -> Vec<Export> {
        let Some((offset, script)) = script_block(source) else {
            return Vec::new();
        };
        typescript::extract_exports(&script)
            .into_iter()
            .map(|mut export| {
                export.line += offset;
                export
            })
            .collect()
    }

    fn function_body(&self, source: &str, name: &str) -> Option<String> {
        let (_, script) = script_block(source)?;
        typescript::extract_function_body(&script, name)
    }
}
