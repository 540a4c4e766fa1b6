mod render;
mod state;

use crate::state::{DisplayState, NO_SONG_MESSAGE};
use std::fs::File;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use transverse_core::{
    Config, CoreError, LineTranslator, PlaybackTracker, SyncEvent, TranslationCache,
    TranslationPipeline,
};
use transverse_spotify::sources;
use transverse_translate_google::GoogleTranslateService;

fn main() {
    // Check config for logging.enabled before full config load
    let file_logging_enabled = check_file_logging_enabled();
    init_tracing(file_logging_enabled);

    // Load config or create template on first run
    let config = match Config::load_or_create() {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            eprintln!(
                "A configuration file has been created at {}.\n\
                 Add the value of your Spotify \"sp_dc\" cookie under [spotify] and restart.",
                path.display()
            );
            std::process::exit(0);
        }
        Err(e) => {
            error!("{e}");
            eprintln!(
                "Please fix the configuration file at {}",
                Config::config_path().display()
            );
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Set up Ctrl+C handler to trigger graceful shutdown
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    if let Err(e) = runtime.block_on(run(&config, cancel_token)) {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(config: &Config, cancel_token: CancellationToken) -> Result<(), CoreError> {
    let (player, lyrics) = sources(&config.spotify.sp_dc)?;
    let translator = GoogleTranslateService::new(config.translation.source_language.clone())?;

    let cache = Arc::new(open_cache(config).await);
    let pipeline = TranslationPipeline::new(
        LineTranslator::new(Arc::new(translator), config.translation.target_language.clone()),
        Arc::clone(&cache),
        config.translation.concurrency,
    )
    .with_title_translation(config.translation.translate_titles);

    let tracker = PlaybackTracker::new(
        Box::new(player),
        Box::new(lyrics),
        cache,
        Arc::new(pipeline),
    )
    .with_poll_interval(config.tracker.poll_interval())
    .with_backoff(config.tracker.backoff_on_error)
    .with_cancel_token(cancel_token.clone());

    let events = tracker.subscribe();
    let tracker_handle = tracker.start();

    render::print(&render::message(NO_SONG_MESSAGE));
    display_events(events, cancel_token).await;

    if let Err(e) = tracker_handle.await {
        warn!("Playback tracker task ended abnormally: {}", e);
    }
    info!("Goodbye");
    Ok(())
}

async fn open_cache(config: &Config) -> TranslationCache {
    let max_size = config.cache.max_size;
    if !config.cache.enabled {
        info!("Translation cache disabled, keeping translations in memory only");
        return TranslationCache::in_memory(max_size);
    }

    let path = config.cache.resolved_path();
    let fallback_path = path.clone();
    match tokio::task::spawn_blocking(move || TranslationCache::open(path, max_size)).await {
        Ok(cache) => cache,
        Err(e) => {
            warn!("Loading the translation cache did not complete: {}", e);
            TranslationCache::new(fallback_path, max_size)
        }
    }
}

/// Print sync events until shutdown
async fn display_events(mut rx: broadcast::Receiver<SyncEvent>, cancel_token: CancellationToken) {
    let mut state = DisplayState::default();

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => break,
            event = rx.recv() => match event {
                Ok(event) => {
                    log_event(&event);
                    if let Some(output) = state
                        .apply(event)
                        .and_then(|change| render::render(&state, change))
                    {
                        render::print(&output);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Sync event channel closed");
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Display missed {} sync events", n);
                }
            }
        }
    }
}

fn log_event(event: &SyncEvent) {
    match event {
        SyncEvent::TrackChanged { track, lines, .. } => {
            info!(
                "Track changed: {} [{}] ({} lines)",
                track.display_name(),
                track.album,
                lines.len()
            );
        }
        SyncEvent::TranslationFailed { track_id, message } => {
            warn!("Translation failed for {}: {}", track_id, message);
        }
        SyncEvent::TranslationsReady {
            track_id,
            lines,
            from_cache,
            ..
        } => {
            info!(
                "Translations ready for {}: {} lines (cached: {})",
                track_id,
                lines.len(),
                from_cache
            );
        }
        SyncEvent::PlaybackTick(_) | SyncEvent::NoLyrics { .. } | SyncEvent::PlaybackStopped => {}
    }
}

fn check_file_logging_enabled() -> bool {
    // Minimal structs to parse just the logging.enabled field
    #[derive(serde::Deserialize)]
    struct PartialConfig {
        #[serde(default)]
        logging: PartialLoggingConfig,
    }
    #[derive(serde::Deserialize, Default)]
    struct PartialLoggingConfig {
        #[serde(default)]
        enabled: bool,
    }

    let Ok(content) = std::fs::read_to_string(Config::config_path()) else {
        return false;
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|c| c.logging.enabled)
        .unwrap_or(false)
}

/// Initialize tracing with console output and optional file logging.
///
/// Console logs go to stderr so they do not interleave with the lyrics on stdout.
fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest_retry=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if file_logging_enabled {
        let log_path = transverse_core::paths::log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
