//! SQLite-backed symbol catalog.
//!
//! Two tables mirror the in-memory index durably: `files` maps each
//! project-relative path to its content hash and index timestamp, and
//! `symbols` holds that file's serialized symbols in source order. Replacing
//! a file is one transaction: delete the old rows, insert the new file row
//! and its symbols. WAL mode keeps readers unblocked during writes; writes
//! themselves serialize on the connection mutex.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use strata_core::types::{Symbol, SymbolKind};

const SCHEMA_VERSION: u32 = 1;

/// Errors from catalog operations. The orchestrator maps these into its own
/// sticky error.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Database(String),

    #[error("corrupt symbol row: {0}")]
    Corrupt(String),

    #[error("catalog lock poisoned")]
    Poisoned,
}

impl From<rusqlite::Error> for CatalogError {
    fn from(e: rusqlite::Error) -> Self {
        CatalogError::Database(e.to_string())
    }
}

pub struct SymbolCatalog {
    conn: Mutex<Connection>,
}

impl SymbolCatalog {
    /// Open or create a catalog database at the given path.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CatalogError::Database(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        let catalog = SymbolCatalog {
            conn: Mutex::new(conn),
        };
        catalog.initialize_schema()?;
        Ok(catalog)
    }

    /// Create an in-memory catalog (for testing).
    pub fn in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory()?;
        let catalog = SymbolCatalog {
            conn: Mutex::new(conn),
        };
        catalog.initialize_schema()?;
        Ok(catalog)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, CatalogError> {
        self.conn.lock().map_err(|_| CatalogError::Poisoned)
    }

    fn initialize_schema(&self) -> Result<(), CatalogError> {
        let conn = self.lock()?;
        // journal_mode reports the resulting mode as a row; read and drop it.
        let _mode: String =
            conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS strata_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS files (
                path TEXT PRIMARY KEY,
                content_hash TEXT NOT NULL,
                indexed_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS symbols (
                id INTEGER PRIMARY KEY,
                file_path TEXT NOT NULL REFERENCES files(path) ON DELETE CASCADE,
                name TEXT NOT NULL,
                name_lower TEXT NOT NULL,
                kind TEXT NOT NULL,
                language TEXT NOT NULL,
                line_start INTEGER NOT NULL,
                line_end INTEGER NOT NULL,
                signature TEXT,
                doc TEXT,
                parent TEXT,
                extra TEXT NOT NULL DEFAULT '{}'
            );
            CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name);
            CREATE INDEX IF NOT EXISTS idx_symbols_name_lower ON symbols(name_lower);
            CREATE INDEX IF NOT EXISTS idx_symbols_file ON symbols(file_path);
            CREATE INDEX IF NOT EXISTS idx_symbols_kind ON symbols(kind);
            ",
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO strata_meta (key, value) VALUES ('schema_version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )?;
        Ok(())
    }

    /// Current schema version.
    pub fn schema_version(&self) -> Result<u32, CatalogError> {
        let conn = self.lock()?;
        let version: String = conn.query_row(
            "SELECT value FROM strata_meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )?;
        version
            .parse()
            .map_err(|e| CatalogError::Corrupt(format!("schema version: {e}")))
    }

    /// All cached (path, content_hash) pairs.
    pub fn file_hashes(&self) -> Result<HashMap<String, String>, CatalogError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT path, content_hash FROM files")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut hashes = HashMap::new();
        for row in rows {
            let (path, hash): (String, String) = row?;
            hashes.insert(path, hash);
        }
        Ok(hashes)
    }

    /// Cached content hash for one file.
    pub fn hash_for(&self, path: &str) -> Result<Option<String>, CatalogError> {
        let conn = self.lock()?;
        let result = conn.query_row(
            "SELECT content_hash FROM files WHERE path = ?1",
            params![path],
            |row| row.get(0),
        );
        match result {
            Ok(hash) => Ok(Some(hash)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Transactionally replace one file's rows: the previous file row and
    /// all its symbols are deleted, then the file record and the new symbols
    /// are inserted in order.
    pub fn replace_file(
        &self,
        path: &str,
        content_hash: &str,
        symbols: &[Symbol],
    ) -> Result<(), CatalogError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM symbols WHERE file_path = ?1", params![path])?;
        tx.execute("DELETE FROM files WHERE path = ?1", params![path])?;
        tx.execute(
            "INSERT INTO files (path, content_hash, indexed_at) VALUES (?1, ?2, datetime('now'))",
            params![path, content_hash],
        )?;
        for symbol in symbols {
            let extra = serde_json::to_string(&symbol.extra)
                .map_err(|e| CatalogError::Corrupt(e.to_string()))?;
            tx.execute(
                "INSERT INTO symbols (file_path, name, name_lower, kind, language, line_start, line_end, signature, doc, parent, extra)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    path,
                    symbol.name,
                    symbol.name.to_lowercase(),
                    symbol.kind.as_str(),
                    symbol.language,
                    symbol.line_start,
                    symbol.line_end,
                    symbol.signature,
                    symbol.doc,
                    symbol.parent,
                    extra,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Delete a file row and its symbols.
    pub fn remove_file(&self, path: &str) -> Result<(), CatalogError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM symbols WHERE file_path = ?1", params![path])?;
        tx.execute("DELETE FROM files WHERE path = ?1", params![path])?;
        tx.commit()?;
        Ok(())
    }

    /// Drop every row. The schema stays.
    pub fn clear(&self) -> Result<(), CatalogError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM symbols", [])?;
        tx.execute("DELETE FROM files", [])?;
        tx.commit()?;
        Ok(())
    }

    fn row_to_symbol(row: &rusqlite::Row) -> rusqlite::Result<Symbol> {
        let kind_str: String = row.get("kind")?;
        let kind = SymbolKind::parse(&kind_str).unwrap_or(SymbolKind::Variable);
        let extra_json: String = row.get("extra")?;
        Ok(Symbol {
            name: row.get("name")?,
            kind,
            language: row.get("language")?,
            file_path: row.get("file_path")?,
            line_start: row.get("line_start")?,
            line_end: row.get("line_end")?,
            signature: row.get("signature")?,
            doc: row.get("doc")?,
            parent: row.get("parent")?,
            extra: serde_json::from_str(&extra_json).unwrap_or_default(),
        })
    }

    /// All symbols, ordered by file then source position then row id. This
    /// is the load path that rebuilds the in-memory index on startup.
    pub fn load_all_symbols(&self) -> Result<Vec<Symbol>, CatalogError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM symbols ORDER BY file_path, line_start, id",
        )?;
        let rows = stmt.query_map([], Self::row_to_symbol)?;
        let mut symbols = Vec::new();
        for row in rows {
            symbols.push(row?);
        }
        Ok(symbols)
    }

    /// One file's symbols in insertion order.
    pub fn symbols_for_file(&self, path: &str) -> Result<Vec<Symbol>, CatalogError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM symbols WHERE file_path = ?1 ORDER BY line_start, id",
        )?;
        let rows = stmt.query_map(params![path], Self::row_to_symbol)?;
        let mut symbols = Vec::new();
        for row in rows {
            symbols.push(row?);
        }
        Ok(symbols)
    }

    /// Cached lookup by exact lowercased name.
    pub fn symbols_named(&self, name: &str) -> Result<Vec<Symbol>, CatalogError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM symbols WHERE name_lower = ?1 ORDER BY file_path, line_start, id",
        )?;
        let rows = stmt.query_map(params![name.to_lowercase()], Self::row_to_symbol)?;
        let mut symbols = Vec::new();
        for row in rows {
            symbols.push(row?);
        }
        Ok(symbols)
    }

    pub fn file_count(&self) -> Result<usize, CatalogError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(name: &str, file: &str, line: u32) -> Symbol {
        Symbol::new(name, SymbolKind::Function, "go", file, line, line + 1)
            .with_signature(format!("func {name}()"))
            .with_extra("public", "true")
    }

    #[test]
    fn test_replace_and_load() {
        let catalog = SymbolCatalog::in_memory().unwrap();
        catalog
            .replace_file("main.go", "abc", &[symbol("Hello", "main.go", 1)])
            .unwrap();

        let symbols = catalog.load_all_symbols().unwrap();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "Hello");
        assert_eq!(symbols[0].kind, SymbolKind::Function);
        assert_eq!(
            symbols[0].extra.get("public").map(String::as_str),
            Some("true")
        );
        assert_eq!(catalog.hash_for("main.go").unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_replace_is_transactional_per_file() {
        let catalog = SymbolCatalog::in_memory().unwrap();
        catalog
            .replace_file(
                "a.go",
                "h1",
                &[symbol("One", "a.go", 1), symbol("Two", "a.go", 5)],
            )
            .unwrap();
        catalog
            .replace_file("a.go", "h2", &[symbol("Three", "a.go", 2)])
            .unwrap();

        let symbols = catalog.symbols_for_file("a.go").unwrap();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "Three");
        assert_eq!(catalog.hash_for("a.go").unwrap().as_deref(), Some("h2"));
    }

    #[test]
    fn test_remove_file() {
        let catalog = SymbolCatalog::in_memory().unwrap();
        catalog
            .replace_file("a.go", "h1", &[symbol("One", "a.go", 1)])
            .unwrap();
        catalog.remove_file("a.go").unwrap();

        assert!(catalog.hash_for("a.go").unwrap().is_none());
        assert!(catalog.load_all_symbols().unwrap().is_empty());
        assert_eq!(catalog.file_count().unwrap(), 0);
    }

    #[test]
    fn test_file_hashes() {
        let catalog = SymbolCatalog::in_memory().unwrap();
        catalog.replace_file("a.go", "h1", &[]).unwrap();
        catalog.replace_file("b.go", "h2", &[]).unwrap();

        let hashes = catalog.file_hashes().unwrap();
        assert_eq!(hashes.len(), 2);
        assert_eq!(hashes.get("a.go").map(String::as_str), Some("h1"));
        assert_eq!(hashes.get("b.go").map(String::as_str), Some("h2"));
    }

    #[test]
    fn test_symbols_named_case_insensitive() {
        let catalog = SymbolCatalog::in_memory().unwrap();
        catalog
            .replace_file("a.go", "h1", &[symbol("Hello", "a.go", 1)])
            .unwrap();
        let found = catalog.symbols_named("hello").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Hello");
    }

    #[test]
    fn test_load_order_is_stable() {
        let catalog = SymbolCatalog::in_memory().unwrap();
        catalog
            .replace_file(
                "b.go",
                "h2",
                &[symbol("Beta", "b.go", 3), symbol("Alpha", "b.go", 9)],
            )
            .unwrap();
        catalog
            .replace_file("a.go", "h1", &[symbol("Gamma", "a.go", 1)])
            .unwrap();

        let names: Vec<String> = catalog
            .load_all_symbols()
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Gamma", "Beta", "Alpha"]);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".strata/catalog.db");
        let catalog = SymbolCatalog::open(&path).unwrap();
        assert_eq!(catalog.schema_version().unwrap(), SCHEMA_VERSION);
        assert!(path.exists());
    }
}
