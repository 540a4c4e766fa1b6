use thiserror::Error;
use transverse_core::CoreError;

/// Errors from the Spotify web-player endpoints.
#[derive(Debug, Error)]
pub enum SpotifyError {
    /// The `sp_dc` cookie was rejected (Spotify handed out an anonymous token).
    #[error("sp_dc cookie is invalid or expired")]
    SpDcInvalid,

    /// The access token endpoint did not return a usable token.
    #[error("Failed to get access token: {0}")]
    TokenFetchFailed(String),

    /// An API call was rejected with 401; the cached token has been dropped.
    #[error("Spotify rejected the access token")]
    Unauthorized,

    /// Spotify API returned a rate limit response.
    #[error("Spotify API rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u32 },

    /// Any other non-success status.
    #[error("Spotify {endpoint} returned status {status}")]
    UnexpectedStatus { endpoint: &'static str, status: u16 },

    /// A response body did not have the expected shape.
    #[error("Malformed Spotify response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Network error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),
}

impl SpotifyError {
    /// Convert into the core error reported by the player source
    #[must_use]
    pub fn into_playback_error(self) -> CoreError {
        CoreError::PlaybackUnavailable {
            reason: self.to_string(),
        }
    }

    /// Convert into the core error reported by the lyric source
    #[must_use]
    pub fn into_lyrics_error(self, track_id: &str) -> CoreError {
        CoreError::LyricsUnavailable {
            track_id: track_id.to_string(),
            reason: self.to_string(),
        }
    }
}

/// Convenience type alias for Results with `SpotifyError`.
pub type Result<T> = std::result::Result<T, SpotifyError>;
