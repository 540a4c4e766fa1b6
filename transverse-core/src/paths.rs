//! Path constants for configuration, cache and log files.

use std::path::PathBuf;

/// The name of the configuration directory under ~/.config/
pub const CONFIG_DIR_NAME: &str = "transverse";

/// The name of the main configuration file
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// The name of the translated lyrics cache file
pub const TRANSLATION_CACHE_FILE_NAME: &str = "translation_cache.json";

/// The name of the log file written when file logging is enabled
pub const LOG_FILE_NAME: &str = "transverse.log";

/// Get the configuration directory path (~/.config/transverse/)
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(CONFIG_DIR_NAME)
}

/// Get the config file path (~/.config/transverse/config.toml)
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Get the translation cache path (`~/.config/transverse/translation_cache.json`)
#[must_use]
pub fn translation_cache_path() -> PathBuf {
    config_dir().join(TRANSLATION_CACHE_FILE_NAME)
}

/// Get the log file path (`~/.config/transverse/transverse.log`)
#[must_use]
pub fn log_file_path() -> PathBuf {
    config_dir().join(LOG_FILE_NAME)
}
