//! Word-boundary reference search across the project.
//!
//! Matches `\b<name>\b` line by line over every analyzable file, with the
//! same skip rules as the indexing walk. The search is budgeted: the walk
//! short-circuits as soon as the result cap (50 by default) is reached. A
//! match is tagged as a definition when a symbol of the same name starts on
//! that line; a supplied kind narrows that comparison.

use std::path::Path;
use std::sync::RwLock;

use regex::Regex;

use strata_analyzers::walker::{relative_path, ProjectWalker};
use strata_analyzers::AnalyzerRegistry;
use strata_core::cancel::CancelToken;
use strata_core::types::{IndexError, SymbolKind, SymbolRef};
use strata_index::memory::SymbolIndex;

/// Context lines captured either side of a match.
const CONTEXT_LINES: usize = 2;

#[allow(clippy::too_many_arguments)]
pub fn find_references(
    root: &Path,
    registry: &AnalyzerRegistry,
    index: &RwLock<SymbolIndex>,
    name: &str,
    kind: Option<SymbolKind>,
    limit: usize,
    extra_skips: &[String],
    cancel: &CancelToken,
) -> Result<Vec<SymbolRef>, IndexError> {
    let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(name)))
        .map_err(|e| IndexError::Invariant(format!("reference pattern: {e}")))?;

    let walker = ProjectWalker::new(root, registry).with_extra_skips(extra_skips);
    let mut references = Vec::new();

    'files: for path in walker.source_files() {
        cancel.check()?;
        let rel = relative_path(root, &path);
        let source = match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(err) => {
                tracing::warn!(file = %rel, error = %err, "skipping unreadable file");
                continue;
            }
        };

        // Definition lines for this file, resolved once per file.
        let definition_lines: Vec<u32> = {
            let guard = index.read().unwrap_or_else(|e| e.into_inner());
            guard
                .symbols_in_file(&rel)
                .into_iter()
                .filter(|s| s.name == name && kind.map_or(true, |k| s.kind == k))
                .map(|s| s.line_start)
                .collect()
        };

        let lines: Vec<&str> = source.lines().collect();
        for (idx, line) in lines.iter().enumerate() {
            let line_no = idx as u32 + 1;
            for m in pattern.find_iter(line) {
                let from = idx.saturating_sub(CONTEXT_LINES);
                let to = (idx + CONTEXT_LINES).min(lines.len().saturating_sub(1));
                let context: Vec<String> = lines[from..=to]
                    .iter()
                    .map(|l| l.trim_end().to_string())
                    .collect();

                references.push(SymbolRef {
                    file_path: rel.clone(),
                    line: line_no,
                    column: m.start() as u32 + 1,
                    line_text: line.trim().to_string(),
                    context,
                    is_definition: definition_lines.contains(&line_no),
                });

                if references.len() >= limit {
                    break 'files;
                }
            }
        }
    }

    Ok(references)
}
