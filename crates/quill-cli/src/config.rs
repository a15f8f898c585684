//! Configuration file support for the shell.
//!
//! Loads shell settings from a TOML file, with sensible defaults when the
//! file is absent.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Shell configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// History file path. Defaults to `~/.quill_history`.
    #[serde(default)]
    pub history_file: Option<PathBuf>,

    /// Maximum history entries kept.
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

fn default_history_size() -> usize {
    1000
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            history_file: None,
            history_size: default_history_size(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Loads the default configuration: `~/.quillrc` if it exists, built-in
    /// defaults otherwise.
    pub fn load_default() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    /// The effective history file path, falling back to `~/.quill_history`.
    #[must_use]
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history_file.clone().or_else(|| {
            std::env::var_os("HOME").map(|home| Path::new(&home).join(".quill_history"))
        })
    }
}

fn default_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| Path::new(&home).join(".quillrc"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.history_size, 1000);
        assert!(config.history_file.is_none());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quillrc");
        std::fs::write(&path, "history_size = 42\nhistory_file = \"/tmp/h\"\n").unwrap();

        let config = CliConfig::from_file(&path).unwrap();
        assert_eq!(config.history_size, 42);
        assert_eq!(config.history_file, Some(PathBuf::from("/tmp/h")));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quillrc");
        std::fs::write(&path, "").unwrap();

        let config = CliConfig::from_file(&path).unwrap();
        assert_eq!(config.history_size, 1000);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quillrc");
        std::fs::write(&path, "history_size = \"many\"").unwrap();

        assert!(CliConfig::from_file(&path).is_err());
    }
}
