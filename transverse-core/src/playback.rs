use serde::{Deserialize, Serialize};

/// Information about the currently playing track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Opaque identifier, stable per song. Used as the cache and sync key.
    pub id: String,
    /// Track name
    pub title: String,
    /// Artist name(s)
    pub artist: String,
    /// Album name
    pub album: String,
    /// Track duration in milliseconds (0 when the source does not report one)
    pub duration_ms: u64,
}

impl Track {
    /// Create a new track
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
            duration_ms,
        }
    }

    /// Human readable "Artist - Title" label
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.artist.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.artist, self.title)
        }
    }
}

/// Current playback state reported by the player source.
///
/// Refreshed on every poll. The position is not assumed to be monotonic within
/// a track since the user may seek in either direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackState {
    /// The track being played
    pub track: Track,
    /// Current playback position in milliseconds, within `[0, duration_ms]`
    pub position_ms: i64,
    /// Whether music is currently playing
    pub playing: bool,
}

impl PlaybackState {
    /// Create a new playback state, clamping the position into the track bounds.
    ///
    /// The upper bound is only applied when the track reports a duration.
    #[must_use]
    pub fn new(track: Track, position_ms: i64, playing: bool) -> Self {
        let upper = if track.duration_ms == 0 {
            i64::MAX
        } else {
            i64::try_from(track.duration_ms).unwrap_or(i64::MAX)
        };

        Self {
            position_ms: position_ms.clamp(0, upper),
            track,
            playing,
        }
    }

    /// Identifier of the track being played
    #[must_use]
    pub fn track_id(&self) -> &str {
        &self.track.id
    }
}
