pub mod cache;
pub mod config;
pub mod error;
pub mod lyrics;
pub mod paths;
pub mod pipeline;
pub mod playback;
pub mod source;
pub mod sync;
pub mod time;
pub mod tracker;
pub mod translate;

pub use cache::{TranslationCache, DEFAULT_MAX_CACHE_SIZE};
pub use config::{
    CacheConfig, Config, LoggingConfig, SpotifyConfig, TrackerConfig, TranslationConfig,
};

/// Re-export toml error type for config parsing error handling
pub use toml::de::Error as TomlParseError;
pub use error::{CoreError, Result};
pub use lyrics::{FetchedLyrics, LyricLine, RawLyricLine, TranslatedLine};
pub use paths::{
    config_dir, config_path, log_file_path, translation_cache_path, CONFIG_DIR_NAME,
    CONFIG_FILE_NAME, LOG_FILE_NAME, TRANSLATION_CACHE_FILE_NAME,
};
pub use pipeline::{CompletedBatch, SongTranslation, TranslationPipeline, DEFAULT_CONCURRENCY};
pub use playback::{PlaybackState, Track};
pub use source::{LyricSource, PlayerSource};
pub use sync::{active_line, PlaybackSnapshot, SyncEvent};
pub use time::DurationExt;
pub use tracker::{PlaybackTracker, DEFAULT_POLL_INTERVAL};
pub use translate::{LineTranslator, TranslationService};
