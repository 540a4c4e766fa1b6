//! Spotify "currently playing" player source.

use crate::error::{Result, SpotifyError};
use crate::token::{WebPlayerTokenManager, USER_AGENT};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use transverse_core::{CoreError, DurationExt, PlaybackState, PlayerSource, Track};

const CURRENTLY_PLAYING_URL: &str = "https://api.spotify.com/v1/me/player/currently-playing";

#[derive(Debug, Deserialize)]
struct CurrentlyPlaying {
    #[serde(default)]
    progress_ms: Option<i64>,
    #[serde(default)]
    is_playing: bool,
    item: Option<PlayingItem>,
}

#[derive(Debug, Deserialize)]
struct PlayingItem {
    id: Option<String>,
    uri: Option<String>,
    name: String,
    #[serde(default)]
    duration_ms: u64,
    #[serde(default)]
    artists: Vec<NamedObject>,
    album: Option<NamedObject>,
    /// Present on podcast episodes instead of `artists`/`album`
    show: Option<NamedObject>,
}

#[derive(Debug, Deserialize)]
struct NamedObject {
    name: String,
}

impl PlayingItem {
    fn into_track(self) -> Option<Track> {
        // Local files have no id; their uri is still stable
        let id = self.id.or(self.uri)?;

        let artist = if self.artists.is_empty() {
            self.show.map(|show| show.name).unwrap_or_default()
        } else {
            self.artists
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let album = self.album.map(|album| album.name).unwrap_or_default();

        Some(Track::new(id, self.name, artist, album, self.duration_ms))
    }
}

/// Reads the user's current playback through the web-player credential.
pub struct SpotifyPlayerSource {
    tokens: Arc<WebPlayerTokenManager>,
    client: reqwest::Client,
}

impl SpotifyPlayerSource {
    #[must_use]
    pub fn new(tokens: Arc<WebPlayerTokenManager>, client: reqwest::Client) -> Self {
        Self { tokens, client }
    }

    async fn poll_once(&self) -> Result<Option<PlaybackState>> {
        let access_token = self.tokens.access_token().await?;

        let request_start = Instant::now();
        let response = self
            .client
            .get(CURRENTLY_PLAYING_URL)
            .bearer_auth(access_token)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;
        let request_latency = request_start.elapsed();

        match response.status() {
            reqwest::StatusCode::NO_CONTENT => return Ok(None),
            reqwest::StatusCode::UNAUTHORIZED => {
                warn!("Received 401 Unauthorized - invalidating cached token");
                self.tokens.invalidate_token().await;
                return Err(SpotifyError::Unauthorized);
            }
            reqwest::StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1);
                return Err(SpotifyError::RateLimited { retry_after_secs });
            }
            status if !status.is_success() => {
                return Err(SpotifyError::UnexpectedStatus {
                    endpoint: "currently-playing",
                    status: status.as_u16(),
                });
            }
            _ => {}
        }

        let body = response.text().await?;
        parse_currently_playing(&body, request_latency)
    }
}

/// Build playback state from a currently-playing response body.
///
/// The reported progress is assumed to be sampled halfway through the request,
/// so half the round trip is added to it while playing.
fn parse_currently_playing(body: &str, request_latency: Duration) -> Result<Option<PlaybackState>> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    let playing: CurrentlyPlaying = serde_json::from_str(body)?;
    let Some(track) = playing.item.and_then(PlayingItem::into_track) else {
        return Ok(None);
    };

    let latency_compensation = if playing.is_playing {
        (request_latency / 2).as_millis_i64()
    } else {
        0
    };
    let position_ms = playing
        .progress_ms
        .unwrap_or(0)
        .saturating_add(latency_compensation);

    debug!(
        "Polled Spotify: playing={}, track={}, position={}ms",
        playing.is_playing, track.title, position_ms
    );

    Ok(Some(PlaybackState::new(track, position_ms, playing.is_playing)))
}

#[async_trait]
impl PlayerSource for SpotifyPlayerSource {
    fn name(&self) -> &'static str {
        "spotify"
    }

    async fn current_playback(&self) -> std::result::Result<Option<PlaybackState>, CoreError> {
        self.poll_once()
            .await
            .map_err(SpotifyError::into_playback_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACK_BODY: &str = r#"{
        "timestamp": 1700000000000,
        "progress_ms": 42000,
        "is_playing": true,
        "currently_playing_type": "track",
        "item": {
            "id": "4iV5W9uYEdYUVa79Axb7Rh",
            "uri": "spotify:track:4iV5W9uYEdYUVa79Axb7Rh",
            "name": "Despacito",
            "duration_ms": 229360,
            "artists": [{"name": "Luis Fonsi"}, {"name": "Daddy Yankee"}],
            "album": {"name": "VIDA"}
        }
    }"#;

    #[test]
    fn test_parse_track() {
        let state = parse_currently_playing(TRACK_BODY, Duration::ZERO)
            .unwrap()
            .unwrap();

        assert_eq!(state.track_id(), "4iV5W9uYEdYUVa79Axb7Rh");
        assert_eq!(state.track.title, "Despacito");
        assert_eq!(state.track.artist, "Luis Fonsi, Daddy Yankee");
        assert_eq!(state.track.album, "VIDA");
        assert_eq!(state.track.duration_ms, 229_360);
        assert_eq!(state.position_ms, 42_000);
        assert!(state.playing);
    }

    #[test]
    fn test_latency_compensation_only_while_playing() {
        let state = parse_currently_playing(TRACK_BODY, Duration::from_millis(300))
            .unwrap()
            .unwrap();
        assert_eq!(state.position_ms, 42_150);

        let paused = TRACK_BODY.replace("\"is_playing\": true", "\"is_playing\": false");
        let state = parse_currently_playing(&paused, Duration::from_millis(300))
            .unwrap()
            .unwrap();
        assert_eq!(state.position_ms, 42_000);
    }

    #[test]
    fn test_nothing_playing() {
        assert!(parse_currently_playing("", Duration::ZERO).unwrap().is_none());
        assert!(parse_currently_playing(
            r#"{"progress_ms": null, "is_playing": false, "item": null}"#,
            Duration::ZERO
        )
        .unwrap()
        .is_none());
    }

    #[test]
    fn test_local_file_uses_uri() {
        let body = r#"{
            "progress_ms": 1000,
            "is_playing": true,
            "item": {"id": null, "uri": "spotify:local:a:b:c:180", "name": "Demo", "duration_ms": 180000, "artists": []}
        }"#;

        let state = parse_currently_playing(body, Duration::ZERO).unwrap().unwrap();
        assert_eq!(state.track_id(), "spotify:local:a:b:c:180");
        assert_eq!(state.track.artist, "");
    }

    #[test]
    fn test_episode_uses_show_name() {
        let body = r#"{
            "progress_ms": 5000,
            "is_playing": true,
            "item": {"id": "ep1", "name": "Episode 1", "duration_ms": 3600000, "show": {"name": "A Podcast"}}
        }"#;

        let state = parse_currently_playing(body, Duration::ZERO).unwrap().unwrap();
        assert_eq!(state.track.artist, "A Podcast");
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(
            parse_currently_playing("{not json", Duration::ZERO),
            Err(SpotifyError::Json(_))
        ));
    }
}
