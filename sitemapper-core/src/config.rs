use crate::error::{ProjectError, Result};
use serde::{Deserialize, Serialize};
use sitemapper_scanner::crawler::DEFAULT_WORKERS;
use sitemapper_scanner::fetch::{DEFAULT_ENCODING, DEFAULT_TIMEOUT_SECS};
use std::fs;
use std::path::Path;

/// Per-project settings, stored as `project.json` in the project directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub root_url: String,
    pub threads: usize,
    pub use_robots: bool,
    /// `encoding_rs` label pages are decoded with.
    pub encoding: String,
    pub timeout_secs: u64,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root_url: String::new(),
            threads: DEFAULT_WORKERS,
            use_robots: true,
            encoding: DEFAULT_ENCODING.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ProjectConfig {
    pub fn new(root_url: impl Into<String>) -> Self {
        Self {
            root_url: root_url.into(),
            ..Default::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ProjectError::MissingFile(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|e| ProjectError::io(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| ProjectError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: ProjectConfig =
            serde_json::from_str(r#"{"root_url": "http://example.com", "threads": 2}"#).unwrap();
        assert_eq!(config.threads, 2);
        assert!(config.use_robots);
        assert_eq!(config.encoding, "utf-8");
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("project.json");

        let mut config = ProjectConfig::new("http://example.com");
        config.use_robots = false;
        config.save(&path).unwrap();

        assert_eq!(ProjectConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = ProjectConfig::load(&temp_dir.path().join("project.json"));
        assert!(matches!(result, Err(ProjectError::MissingFile(_))));
    }
}
