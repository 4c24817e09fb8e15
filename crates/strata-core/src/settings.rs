//! Configuration file loading for strata.
//!
//! Reads `.strata/config.json` under the project root and provides typed
//! access to the few tunables the index exposes. Falls back to compiled-in
//! defaults when the file is missing or incomplete.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level strata configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Catalog database filename, relative to `.strata/`.
    #[serde(default = "default_catalog_file")]
    pub catalog_file: String,
    /// Directory names skipped during project walks, in addition to the
    /// built-in set and dot-directories.
    #[serde(default)]
    pub extra_skip_dirs: Vec<String>,
    /// Maximum number of results returned by the reference finder.
    #[serde(default = "default_reference_limit")]
    pub reference_limit: usize,
}

fn default_catalog_file() -> String {
    "catalog.db".to_string()
}

fn default_reference_limit() -> usize {
    50
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            catalog_file: default_catalog_file(),
            extra_skip_dirs: Vec::new(),
            reference_limit: default_reference_limit(),
        }
    }
}

impl Settings {
    /// Load settings for a project root. A missing config file yields the
    /// defaults; a malformed one is reported.
    pub fn load(root: &Path) -> Result<Settings, SettingsError> {
        let path = root.join(".strata").join("config.json");
        if !path.exists() {
            return Ok(Settings::default());
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| SettingsError::Read(path.display().to_string(), e.to_string()))?;
        serde_json::from_str(&text)
            .map_err(|e| SettingsError::Parse(path.display().to_string(), e.to_string()))
    }

    /// Absolute path of the catalog database for a project root.
    pub fn catalog_path(&self, root: &Path) -> std::path::PathBuf {
        root.join(".strata").join(&self.catalog_file)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read {0}: {1}")]
    Read(String, String),

    #[error("failed to parse {0}: {1}")]
    Parse(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.reference_limit, 50);
    }

    #[test]
    fn test_load_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".strata")).unwrap();
        std::fs::write(
            dir.path().join(".strata/config.json"),
            r#"{"extra_skip_dirs": ["generated"]}"#,
        )
        .unwrap();

        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings.extra_skip_dirs, vec!["generated".to_string()]);
        assert_eq!(settings.catalog_file, "catalog.db");
    }

    #[test]
    fn test_malformed_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".strata")).unwrap();
        std::fs::write(dir.path().join(".strata/config.json"), "{not json").unwrap();
        assert!(Settings::load(dir.path()).is_err());
    }
}
