//! Spotify player and lyric sources driven by the `sp_dc` web-player cookie.
//!
//! **WARNING:** This uses unofficial Spotify web-player endpoints that require
//! the `sp_dc` cookie from a logged-in Spotify web session. This may violate
//! Spotify's Terms of Service. Use at your own risk.

pub mod error;
mod lyrics;
mod player;
mod token;

use reqwest_middleware::ClientBuilder;
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use transverse_core::CoreError;

pub use error::SpotifyError;
pub use lyrics::SpotifyLyricSource;
pub use player::SpotifyPlayerSource;
pub use token::WebPlayerTokenManager;

/// Default timeout for HTTP requests (10 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Player polls are frequent, so they fail fast instead of retrying
const PLAYER_TIMEOUT_SECS: u64 = 3;
/// Default number of retry attempts for lyrics requests
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Build a player source and a lyric source sharing one access token.
///
/// # Errors
///
/// Returns an error if the `sp_dc` cookie is empty or an HTTP client cannot be
/// created.
pub fn sources(sp_dc: &str) -> Result<(SpotifyPlayerSource, SpotifyLyricSource), CoreError> {
    if sp_dc.trim().is_empty() {
        return Err(CoreError::ConfigMissingField {
            field: "spotify.sp_dc".to_string(),
        });
    }

    warn!(
        "Spotify sources enabled. WARNING: This uses unofficial Spotify endpoints \
         that may violate Spotify's Terms of Service. Use at your own risk."
    );

    let base_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(5))
        .build()?;
    let player_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(PLAYER_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(2))
        .build()?;

    let tokens = Arc::new(WebPlayerTokenManager::new(sp_dc.trim(), base_client.clone()));

    // Wrap with retry middleware (exponential backoff) for lyrics requests
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(DEFAULT_MAX_RETRIES);
    let lyrics_client = ClientBuilder::new(base_client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build();

    Ok((
        SpotifyPlayerSource::new(Arc::clone(&tokens), player_client),
        SpotifyLyricSource::new(tokens, lyrics_client),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_require_cookie() {
        assert!(matches!(
            sources("   "),
            Err(CoreError::ConfigMissingField { ref field }) if field == "spotify.sp_dc"
        ));
        assert!(sources("AQC-cookie").is_ok());
    }
}
