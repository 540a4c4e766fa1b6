//! Spotify color-lyrics source.

use crate::error::{Result, SpotifyError};
use crate::token::{WebPlayerTokenManager, USER_AGENT};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use transverse_core::{CoreError, FetchedLyrics, LyricSource, RawLyricLine};

const SPOTIFY_LYRICS_API: &str = "https://spclient.wg.spotify.com/color-lyrics/v2/track";

#[derive(Debug, Deserialize)]
struct SpotifyLyricsResponse {
    lyrics: SpotifyLyrics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpotifyLyrics {
    #[serde(default)]
    sync_type: String,
    #[serde(default)]
    lines: Vec<SpotifyLyricsLine>,
    language: Option<String>,
}

/// Timestamps arrive as strings but are not guaranteed to; keep them loose
/// and let [`RawLyricLine`] validation decide.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpotifyLyricsLine {
    start_time_ms: Option<Value>,
    words: Option<String>,
}

impl From<SpotifyLyricsLine> for RawLyricLine {
    fn from(line: SpotifyLyricsLine) -> Self {
        let start_ms = line.start_time_ms.and_then(|value| match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        Self {
            start_ms,
            text: line.words,
        }
    }
}

/// Fetches time-synced lyrics for a Spotify track id.
pub struct SpotifyLyricSource {
    tokens: Arc<WebPlayerTokenManager>,
    client: ClientWithMiddleware,
}

impl SpotifyLyricSource {
    #[must_use]
    pub fn new(tokens: Arc<WebPlayerTokenManager>, client: ClientWithMiddleware) -> Self {
        Self { tokens, client }
    }

    async fn fetch(&self, track_id: &str) -> Result<Option<FetchedLyrics>> {
        let access_token = self.tokens.access_token().await?;

        let url = format!("{SPOTIFY_LYRICS_API}/{track_id}?format=json&market=from_token");
        debug!("Spotify GET: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {access_token}"))
            .header("App-Platform", "WebPlayer")
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        match response.status() {
            reqwest::StatusCode::NOT_FOUND => {
                info!("No Spotify lyrics found for track: {}", track_id);
                return Ok(None);
            }
            reqwest::StatusCode::UNAUTHORIZED => {
                warn!("Received 401 Unauthorized - invalidating cached token");
                self.tokens.invalidate_token().await;
                return Err(SpotifyError::Unauthorized);
            }
            status if !status.is_success() => {
                warn!("Spotify lyrics API returned status: {}", status);
                return Err(SpotifyError::UnexpectedStatus {
                    endpoint: "color-lyrics",
                    status: status.as_u16(),
                });
            }
            _ => {}
        }

        let body = response.text().await?;
        parse_lyrics(&body)
    }
}

fn parse_lyrics(body: &str) -> Result<Option<FetchedLyrics>> {
    let response: SpotifyLyricsResponse = serde_json::from_str(body)?;
    let lyrics = response.lyrics;

    match lyrics.sync_type.as_str() {
        "LINE_SYNCED" | "SYLLABLE_SYNCED" => {}
        "UNSYNCED" => {
            info!("Spotify only has unsynced lyrics for this track");
            return Ok(None);
        }
        other => {
            warn!("Unknown Spotify sync type: {}", other);
            return Ok(None);
        }
    }

    let fetched = FetchedLyrics::from_raw(
        lyrics.lines.into_iter().map(RawLyricLine::from),
        lyrics.language,
    );
    info!("Got Spotify synced lyrics with {} lines", fetched.lines.len());

    if fetched.is_empty() {
        Ok(None)
    } else {
        Ok(Some(fetched))
    }
}

#[async_trait]
impl LyricSource for SpotifyLyricSource {
    fn name(&self) -> &'static str {
        "spotify_lyrics"
    }

    async fn lyrics(&self, track_id: &str) -> std::result::Result<Option<FetchedLyrics>, CoreError> {
        self.fetch(track_id)
            .await
            .map_err(|e| e.into_lyrics_error(track_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_synced_lyrics() {
        let body = r#"{
            "lyrics": {
                "syncType": "LINE_SYNCED",
                "lines": [
                    {"startTimeMs": "1000", "words": "Hola", "syllables": [], "endTimeMs": "0"},
                    {"startTimeMs": "3500", "words": "♪", "syllables": [], "endTimeMs": "0"},
                    {"startTimeMs": "5200", "words": "Adiós", "syllables": [], "endTimeMs": "0"}
                ],
                "provider": "MusixMatch",
                "language": "es"
            },
            "colors": {"background": -1, "text": -1, "highlightText": -1},
            "hasVocalRemoval": false
        }"#;

        let fetched = parse_lyrics(body).unwrap().unwrap();

        assert_eq!(fetched.language.as_deref(), Some("es"));
        let lines: Vec<_> = fetched
            .lines
            .iter()
            .map(|l| (l.start_ms, l.text.as_str()))
            .collect();
        assert_eq!(lines, vec![(1000, "Hola"), (3500, "♪"), (5200, "Adiós")]);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let body = r#"{
            "lyrics": {
                "syncType": "LINE_SYNCED",
                "lines": [
                    {"startTimeMs": "2000", "words": "dos"},
                    {"words": "sin tiempo"},
                    {"startTimeMs": "abc", "words": "mal"},
                    {"startTimeMs": "3000"},
                    {"startTimeMs": 1000, "words": "uno"}
                ]
            }
        }"#;

        let fetched = parse_lyrics(body).unwrap().unwrap();

        let texts: Vec<_> = fetched.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["uno", "dos"]);
        assert!(fetched.language.is_none());
    }

    #[test]
    fn test_unsynced_lyrics_are_ignored() {
        let body = r#"{"lyrics": {"syncType": "UNSYNCED", "lines": [{"startTimeMs": "0", "words": "x"}]}}"#;
        assert!(parse_lyrics(body).unwrap().is_none());
    }

    #[test]
    fn test_all_lines_malformed() {
        let body = r#"{"lyrics": {"syncType": "LINE_SYNCED", "lines": [{"words": "x"}]}}"#;
        assert!(parse_lyrics(body).unwrap().is_none());
    }

    #[test]
    fn test_missing_lyrics_object() {
        assert!(matches!(parse_lyrics("{}"), Err(SpotifyError::Json(_))));
    }
}
