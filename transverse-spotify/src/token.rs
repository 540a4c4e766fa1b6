//! Web-player access tokens minted from the `sp_dc` cookie.

use crate::error::{Result, SpotifyError};
use serde::Deserialize;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// URL for exchanging the `sp_dc` cookie for a web-player access token
const TOKEN_URL: &str =
    "https://open.spotify.com/get_access_token?reason=transport&productType=web_player";

/// Refresh this long before the token actually expires
const TOKEN_REFRESH_BUFFER: Duration = Duration::from_secs(60);

/// User agent for requests
pub(crate) const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
    /// Milliseconds since the Unix epoch
    access_token_expiration_timestamp_ms: u64,
    #[serde(default)]
    is_anonymous: bool,
}

#[derive(Debug, Clone)]
struct CachedAccessToken {
    access_token: String,
    /// Monotonic deadline derived from the server-provided expiry
    expires_at: Instant,
}

impl CachedAccessToken {
    fn from_response(response: TokenResponse, now_ms: u64) -> Self {
        let lifetime = Duration::from_millis(
            response
                .access_token_expiration_timestamp_ms
                .saturating_sub(now_ms),
        );
        Self {
            access_token: response.access_token,
            expires_at: Instant::now() + lifetime,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_BUFFER >= self.expires_at
    }
}

/// Caches the web-player token and refreshes it on expiry or after a 401.
pub struct WebPlayerTokenManager {
    sp_dc: String,
    client: reqwest::Client,
    cached_token: RwLock<Option<CachedAccessToken>>,
}

impl WebPlayerTokenManager {
    #[must_use]
    pub fn new(sp_dc: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            sp_dc: sp_dc.into(),
            client,
            cached_token: RwLock::new(None),
        }
    }

    /// Get a valid access token, refreshing if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`SpotifyError::SpDcInvalid`] if the cookie is rejected, or a
    /// network error if the token endpoint cannot be reached.
    pub async fn access_token(&self) -> Result<String> {
        {
            let token_guard = self.cached_token.read().await;
            if let Some(ref token) = *token_guard {
                if !token.is_expired() {
                    return Ok(token.access_token.clone());
                }
                debug!("Cached Spotify token is expired or expiring soon");
            }
        }

        let mut token_guard = self.cached_token.write().await;
        // Another caller may have refreshed while we waited for the lock
        if let Some(ref token) = *token_guard {
            if !token.is_expired() {
                return Ok(token.access_token.clone());
            }
        }

        let token = self.fetch_token().await?;
        let access_token = token.access_token.clone();
        *token_guard = Some(token);
        Ok(access_token)
    }

    /// Invalidate the cached token, forcing a refresh on next request.
    pub async fn invalidate_token(&self) {
        *self.cached_token.write().await = None;
        debug!("Invalidated cached Spotify access token");
    }

    async fn fetch_token(&self) -> Result<CachedAccessToken> {
        info!("Refreshing Spotify web-player access token");

        let response = self
            .client
            .get(TOKEN_URL)
            .header("Cookie", format!("sp_dc={}", self.sp_dc))
            .header("App-Platform", "WebPlayer")
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            warn!("Token request failed: HTTP {}", status);
            return Err(SpotifyError::TokenFetchFailed(format!("HTTP {status}")));
        }

        let body = response.text().await?;
        let token = parse_token_response(&body, unix_millis())?;
        info!("Obtained Spotify access token");
        Ok(token)
    }
}

fn parse_token_response(body: &str, now_ms: u64) -> Result<CachedAccessToken> {
    let response: TokenResponse = serde_json::from_str(body)
        .map_err(|e| SpotifyError::TokenFetchFailed(e.to_string()))?;

    // An anonymous token means the cookie was not accepted
    if response.is_anonymous {
        warn!("Received anonymous token - sp_dc cookie is invalid or expired");
        return Err(SpotifyError::SpDcInvalid);
    }

    Ok(CachedAccessToken::from_response(response, now_ms))
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW_MS: u64 = 1_700_000_000_000;

    #[test]
    fn test_parse_valid_token() {
        let body = format!(
            r#"{{"clientId":"abc","accessToken":"BQD-token","accessTokenExpirationTimestampMs":{},"isAnonymous":false}}"#,
            NOW_MS + 3_600_000
        );

        let token = parse_token_response(&body, NOW_MS).unwrap();

        assert_eq!(token.access_token, "BQD-token");
        assert!(!token.is_expired());
    }

    #[test]
    fn test_parse_anonymous_token() {
        let body = format!(
            r#"{{"accessToken":"anon","accessTokenExpirationTimestampMs":{},"isAnonymous":true}}"#,
            NOW_MS + 3_600_000
        );

        assert!(matches!(
            parse_token_response(&body, NOW_MS),
            Err(SpotifyError::SpDcInvalid)
        ));
    }

    #[test]
    fn test_token_near_expiry_is_expired() {
        let body = format!(
            r#"{{"accessToken":"short","accessTokenExpirationTimestampMs":{}}}"#,
            NOW_MS + 30_000
        );

        let token = parse_token_response(&body, NOW_MS).unwrap();
        assert!(token.is_expired());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_token_response("<html>", NOW_MS),
            Err(SpotifyError::TokenFetchFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_invalidate_clears_cache() {
        let manager = WebPlayerTokenManager::new("cookie", reqwest::Client::new());
        *manager.cached_token.write().await = Some(CachedAccessToken {
            access_token: "cached".into(),
            expires_at: Instant::now() + Duration::from_secs(3600),
        });

        assert_eq!(manager.access_token().await.unwrap(), "cached");

        manager.invalidate_token().await;
        assert!(manager.cached_token.read().await.is_none());
    }
}
