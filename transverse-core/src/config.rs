use crate::cache::DEFAULT_MAX_CACHE_SIZE;
use crate::error::{CoreError, Result};
use crate::pipeline::DEFAULT_CONCURRENCY;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpotifyConfig {
    /// Value of the `sp_dc` cookie from a logged-in open.spotify.com session
    #[serde(default)]
    pub sp_dc: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default = "default_target_language")]
    pub target_language: String,
    #[serde(default = "default_source_language")]
    pub source_language: String,
    /// Maximum number of lines translated at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_true")]
    pub translate_titles: bool,
}

fn default_target_language() -> String {
    "en".to_string()
}

fn default_source_language() -> String {
    "auto".to_string()
}

const fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

const fn default_true() -> bool {
    true
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            target_language: default_target_language(),
            source_language: default_source_language(),
            concurrency: default_concurrency(),
            translate_titles: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// Overrides the default cache file location
    #[serde(default)]
    pub path: Option<PathBuf>,
}

const fn default_max_size() -> usize {
    DEFAULT_MAX_CACHE_SIZE
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: default_max_size(),
            path: None,
        }
    }
}

impl CacheConfig {
    /// Cache file to use, falling back to the application data directory
    #[must_use]
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(crate::paths::translation_cache_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Back off exponentially while the player keeps failing
    #[serde(default)]
    pub backoff_on_error: bool,
}

const fn default_poll_interval() -> u64 {
    500
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            backoff_on_error: false,
        }
    }
}

impl TrackerConfig {
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to ~/.config/transverse/transverse.log
    #[serde(default)]
    pub enabled: bool,
}

impl Config {
    /// Get the configuration directory path (~/.config/transverse/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/transverse/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from file or create template on first run
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read, parsed, or if required fields are missing.
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_at(&Self::config_path())
    }

    /// Load config from `config_path`, writing the template there if it does
    /// not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing the template, or an
    /// error if the file cannot be read, parsed or validated.
    pub fn load_or_create_at(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(config_path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound {
                path: config_path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(config_path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or fails validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check required fields and value ranges
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.spotify.sp_dc.trim().is_empty() {
            return Err(CoreError::ConfigMissingField {
                field: "spotify.sp_dc".to_string(),
            });
        }
        if self.translation.target_language.trim().is_empty() {
            return Err(CoreError::ConfigMissingField {
                field: "translation.target_language".to_string(),
            });
        }
        if self.translation.concurrency == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "translation.concurrency must be at least 1".to_string(),
            });
        }
        if self.cache.max_size == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "cache.max_size must be at least 1".to_string(),
            });
        }
        if self.tracker.poll_interval_ms == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "tracker.poll_interval_ms must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

const CONFIG_TEMPLATE: &str = r#"# Transverse Configuration
# ~/.config/transverse/config.toml

[spotify]
# Required: the value of the "sp_dc" cookie from a logged-in
# https://open.spotify.com browser session
sp_dc = ""

[translation]
target_language = "en"
# "auto" lets the translation service detect the lyric language
source_language = "auto"
# Number of lines translated at once
concurrency = 4
translate_titles = true

[cache]
enabled = true
# Number of songs kept; the oldest song is dropped first
max_size = 1000
# path = "/custom/location/translation_cache.json"

[tracker]
poll_interval_ms = 500
# Wait progressively longer while Spotify cannot be reached
backoff_on_error = false

[logging]
# Also write logs to ~/.config/transverse/transverse.log
enabled = false
"#;
