use crate::lyrics::{LyricLine, TranslatedLine};
use crate::playback::Track;

/// Find the active line for a playback position.
///
/// Returns the index of the last line whose start time is at or before
/// `position_ms`, or `None` when the position precedes every line. Lines must
/// be sorted ascending by start time; among duplicate start times the later
/// line wins. This is recomputed from scratch on every tick, so seeks in
/// either direction need no special handling.
#[must_use]
pub fn active_line(lines: &[LyricLine], position_ms: i64) -> Option<usize> {
    lines
        .partition_point(|line| line.start_ms <= position_ms)
        .checked_sub(1)
}

/// Per-tick view of playback handed to the display layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub track: Track,
    pub position_ms: i64,
    pub duration_ms: u64,
    pub playing: bool,
    pub active_line: Option<usize>,
}

/// Events emitted by the playback tracker
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Regular poll tick while a track is playing
    PlaybackTick(PlaybackSnapshot),
    /// A new track is being tracked; original lyrics are available immediately
    TrackChanged {
        track: Track,
        lines: Vec<LyricLine>,
        language: Option<String>,
    },
    /// No lyrics exist for the current track
    NoLyrics { track_id: String },
    /// Translations are ready. Consumers must ignore this if `track_id` is not
    /// the track they are showing.
    TranslationsReady {
        track_id: String,
        lines: Vec<TranslatedLine>,
        translated_title: Option<String>,
        from_cache: bool,
    },
    /// Translating the current track failed as a whole
    TranslationFailed { track_id: String, message: String },
    /// Nothing is playing, or the player could not be reached
    PlaybackStopped,
}
