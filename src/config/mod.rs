//! Configuration management for the lookalike engine
//!
//! Handles loading, validation, and environment overrides for the TOML
//! configuration file.

use crate::error::{LookalikeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub engine: EngineConfig,
    pub search: SearchConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base data directory; the snapshot lives at `<data_dir>/snapshot`
    pub data_dir: PathBuf,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Text encoder model name (e.g. "all-MiniLM-L6-v2")
    pub text_model: String,
    /// Image encoder model name (e.g. "clip-vit-b-32")
    pub image_model: String,
}

/// Engine concurrency configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum time to wait for the index lock before failing with Busy
    pub lock_timeout_ms: u64,
}

impl EngineConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

/// Search defaults
///
/// Text and image scores are both cosine similarities in [-1, 1], but the
/// two encoders do not necessarily produce the same effective score
/// distribution. `default_text_weight` is the knob to calibrate if hybrid
/// rankings lean too far toward one modality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default number of results per query
    pub default_limit: usize,
    /// Default text weight for hybrid search, in [0, 1]
    pub default_text_weight: f32,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LookalikeError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| LookalikeError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LookalikeError::Io {
                source: e,
                context: format!("Failed to create config directory: {:?}", parent),
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| LookalikeError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration, falling back to defaults when no file exists
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let default = Self::default_path()?;
                if default.exists() {
                    Self::load(&default)
                } else {
                    let mut config = Self::default();
                    config.apply_env_overrides();
                    ConfigValidator::validate(&config)?;
                    Ok(config)
                }
            }
        }
    }

    /// Apply environment variable overrides
    /// Environment variables in format: LOOKALIKE_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("LOOKALIKE_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "STORAGE__DATA_DIR" => {
                self.storage.data_dir = PathBuf::from(value);
            }
            "EMBEDDING__TEXT_MODEL" => {
                self.embedding.text_model = value.to_string();
            }
            "EMBEDDING__IMAGE_MODEL" => {
                self.embedding.image_model = value.to_string();
            }
            "ENGINE__LOCK_TIMEOUT_MS" => {
                self.engine.lock_timeout_ms =
                    value.parse().map_err(|_| {
                        LookalikeError::Config(format!(
                            "Cannot parse '{}' as milliseconds",
                            value
                        ))
                    })?;
            }
            "SEARCH__DEFAULT_LIMIT" => {
                self.search.default_limit = value.parse().map_err(|_| {
                    LookalikeError::Config(format!("Cannot parse '{}' as integer", value))
                })?;
            }
            "SEARCH__DEFAULT_TEXT_WEIGHT" => {
                self.search.default_text_weight = value.parse().map_err(|_| {
                    LookalikeError::Config(format!("Cannot parse '{}' as float", value))
                })?;
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            LookalikeError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("lookalike").join("config.toml"))
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            LookalikeError::Config("Cannot determine data directory".to_string())
        })?;

        Ok(data_dir.join("lookalike"))
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = Self::default_data_dir().unwrap_or_else(|_| PathBuf::from(".lookalike"));

        Self {
            storage: StorageConfig { data_dir },
            embedding: EmbeddingConfig {
                text_model: "all-MiniLM-L6-v2".to_string(),
                image_model: "clip-vit-b-32".to_string(),
            },
            engine: EngineConfig {
                lock_timeout_ms: 2000,
            },
            search: SearchConfig {
                default_limit: 10,
                default_text_weight: 0.5,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let config = Config::default();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.embedding.text_model, config.embedding.text_model);
        assert_eq!(loaded.search.default_limit, config.search.default_limit);
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nope.toml");

        let result = Config::load(&path);
        assert!(matches!(
            result,
            Err(LookalikeError::ConfigNotFound { .. })
        ));
    }

    #[test]
    fn test_lock_timeout_conversion() {
        let config = Config::default();
        assert_eq!(
            config.engine.lock_timeout(),
            Duration::from_millis(config.engine.lock_timeout_ms)
        );
    }
}
