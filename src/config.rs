//! Persisted default-model configuration.
//!
//! The config is a small JSON file, `_data/default.json` by default:
//!
//! ```json
//! { "default_ollama_model": "llama3:latest" }
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::ConfigError;

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "_data/default.json";

/// On-disk shape of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultModelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_ollama_model: Option<String>,
}

/// Reads and writes the default model at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_PATH)
    }
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved default model.
    ///
    /// Returns `Ok(None)` when the file does not exist or holds no
    /// non-empty model name.
    pub fn load_default_model(&self) -> Result<Option<String>, ConfigError> {
        if !self.path.exists() {
            debug!("Config file {} not found", self.path.display());
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path).map_err(|source| {
            ConfigError::ReadFailed {
                path: self.path.clone(),
                source,
            }
        })?;

        let config: DefaultModelConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::ParseFailed {
                path: self.path.clone(),
                source,
            })?;

        Ok(config
            .default_ollama_model
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty()))
    }

    /// Save `model` as the default, replacing the file atomically.
    pub fn save_default_model(&self, model: &str) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::WriteFailed {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(write_err)?;

        let config = DefaultModelConfig {
            default_ollama_model: Some(model.to_string()),
        };
        let json = serde_json::to_string_pretty(&config).map_err(ConfigError::SerializeFailed)?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        debug!("Saved default model {} to {}", model, self.path.display());
        Ok(())
    }
}
