use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created - please add your Spotify sp_dc cookie and restart.")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Missing required config field: {field}")]
    ConfigMissingField { field: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Player / lyrics source errors
    #[error("Playback unavailable: {reason}")]
    PlaybackUnavailable { reason: String },

    #[error("Lyrics unavailable for track {track_id}: {reason}")]
    LyricsUnavailable { track_id: String, reason: String },

    // Translation errors
    #[error("Translation unavailable: {reason}")]
    TranslationUnavailable { reason: String },

    #[error("Translation pipeline failed for track {track_id}: {reason}")]
    PipelineFailed { track_id: String, reason: String },

    // Cache errors
    #[error("Cache serialization error: {0}")]
    CacheSerialization(#[from] serde_json::Error),

    // Network errors
    #[error("Network request failed: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("HTTP middleware error: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
