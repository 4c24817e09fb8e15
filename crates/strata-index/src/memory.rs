//! In-memory symbol store with secondary indexes.
//!
//! Symbols live in an append-only vector; three maps index positions by
//! lowercased name, by file, and by kind. Position lists preserve insertion
//! order so "first match" queries are stable across identical scans. The
//! store itself is not synchronized; the owning orchestrator wraps it in a
//! reader/writer lock.

use std::collections::HashMap;

use strata_core::types::{IndexStats, Symbol, SymbolKind};

#[derive(Debug, Default)]
pub struct SymbolIndex {
    symbols: Vec<Symbol>,
    by_name: HashMap<String, Vec<usize>>,
    by_file: HashMap<String, Vec<usize>>,
    by_kind: HashMap<SymbolKind, Vec<usize>>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Append symbols without touching existing entries. Callers that
    /// re-index a file must remove its stale symbols first.
    pub fn add_symbols(&mut self, symbols: Vec<Symbol>) {
        for symbol in symbols {
            let position = self.symbols.len();
            self.by_name
                .entry(symbol.name.to_lowercase())
                .or_default()
                .push(position);
            self.by_file
                .entry(symbol.file_path.clone())
                .or_default()
                .push(position);
            self.by_kind.entry(symbol.kind).or_default().push(position);
            self.symbols.push(symbol);
        }
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.symbols.clear();
        self.by_name.clear();
        self.by_file.clear();
        self.by_kind.clear();
    }

    /// Remove one file's symbols and rebuild the secondary indexes around
    /// the hole. Other files' symbols and their relative order are
    /// untouched.
    pub fn remove_file(&mut self, file_path: &str) {
        if !self.by_file.contains_key(file_path) {
            return;
        }
        let remaining: Vec<Symbol> = std::mem::take(&mut self.symbols)
            .into_iter()
            .filter(|s| s.file_path != file_path)
            .collect();
        self.by_name.clear();
        self.by_file.clear();
        self.by_kind.clear();
        self.add_symbols(remaining);
    }

    /// Case-insensitive substring match against symbol names.
    pub fn search_by_name(&self, query: &str) -> Vec<&Symbol> {
        let needle = query.to_lowercase();
        let mut positions: Vec<usize> = self
            .by_name
            .iter()
            .filter(|(name, _)| name.contains(&needle))
            .flat_map(|(_, positions)| positions.iter().copied())
            .collect();
        positions.sort_unstable();
        positions.into_iter().map(|p| &self.symbols[p]).collect()
    }

    /// Case-insensitive exact name match, in insertion order.
    pub fn find_by_exact_name(&self, name: &str) -> Vec<&Symbol> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|positions| positions.iter().map(|&p| &self.symbols[p]).collect())
            .unwrap_or_default()
    }

    /// Symbols of one file, in insertion (source) order.
    pub fn symbols_in_file(&self, file_path: &str) -> Vec<&Symbol> {
        self.by_file
            .get(file_path)
            .map(|positions| positions.iter().map(|&p| &self.symbols[p]).collect())
            .unwrap_or_default()
    }

    pub fn symbols_by_kind(&self, kind: SymbolKind) -> Vec<&Symbol> {
        self.by_kind
            .get(&kind)
            .map(|positions| positions.iter().map(|&p| &self.symbols[p]).collect())
            .unwrap_or_default()
    }

    /// First symbol matching `name` (case-insensitive) and, when given,
    /// `kind`.
    pub fn find_definition(&self, name: &str, kind: Option<SymbolKind>) -> Option<&Symbol> {
        self.find_by_exact_name(name)
            .into_iter()
            .find(|s| kind.map_or(true, |k| s.kind == k))
    }

    /// All indexed file paths, unordered.
    pub fn files(&self) -> Vec<&str> {
        self.by_file.keys().map(String::as_str).collect()
    }

    pub fn stats(&self) -> IndexStats {
        let mut kinds = std::collections::BTreeMap::new();
        for (kind, positions) in &self.by_kind {
            if !positions.is_empty() {
                kinds.insert(kind.as_str().to_string(), positions.len());
            }
        }
        IndexStats {
            total_symbols: self.symbols.len(),
            unique_names: self.by_name.len(),
            files: self.by_file.len(),
            kinds,
        }
    }
}
