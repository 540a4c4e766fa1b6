use transverse_core::{LyricLine, SyncEvent, Track, TranslatedLine};

/// Shown when nothing is playing
pub const NO_SONG_MESSAGE: &str = "(No song playing)";
/// Shown when the current track has no usable lyrics
pub const NO_LYRICS_MESSAGE: &str = "(No lyrics available)";

/// What the terminal needs to redraw after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayChange {
    /// A new track is shown
    Track,
    /// The active line moved
    ActiveLine(usize),
    /// Translations arrived for the shown track
    Translations,
    /// Replace the lyrics with a status message
    Message(&'static str),
}

/// Everything the terminal display shows, rebuilt from sync events.
#[derive(Debug, Default)]
pub struct DisplayState {
    pub track: Option<Track>,
    pub language: Option<String>,
    pub lines: Vec<LyricLine>,
    pub translations: Option<Vec<TranslatedLine>>,
    pub translated_title: Option<String>,
    pub from_cache: bool,
    pub active_line: Option<usize>,
    pub position_ms: i64,
    pub playing: bool,
}

impl DisplayState {
    /// Apply an event and report what changed, if anything.
    ///
    /// Events for a track other than the one shown are ignored.
    pub fn apply(&mut self, event: SyncEvent) -> Option<DisplayChange> {
        match event {
            SyncEvent::TrackChanged {
                track,
                lines,
                language,
            } => {
                *self = Self {
                    track: Some(track),
                    language,
                    lines,
                    ..Self::default()
                };
                Some(DisplayChange::Track)
            }
            SyncEvent::NoLyrics { track_id } => {
                if !self.is_showing(&track_id) {
                    return None;
                }
                self.lines.clear();
                self.translations = None;
                Some(DisplayChange::Message(NO_LYRICS_MESSAGE))
            }
            SyncEvent::TranslationsReady {
                track_id,
                lines,
                translated_title,
                from_cache,
            } => {
                if !self.is_showing(&track_id) {
                    return None;
                }
                self.translations = Some(lines);
                self.from_cache = from_cache;
                if translated_title.is_some() {
                    self.translated_title = translated_title;
                }
                Some(DisplayChange::Translations)
            }
            SyncEvent::TranslationFailed { track_id, .. } => {
                if !self.is_showing(&track_id) {
                    return None;
                }
                self.lines.clear();
                self.translations = None;
                Some(DisplayChange::Message(NO_LYRICS_MESSAGE))
            }
            SyncEvent::PlaybackTick(snapshot) => {
                if !self.is_showing(&snapshot.track.id) {
                    return None;
                }
                self.position_ms = snapshot.position_ms;
                self.playing = snapshot.playing;

                if snapshot.active_line == self.active_line {
                    return None;
                }
                self.active_line = snapshot.active_line;
                self.active_line.map(DisplayChange::ActiveLine)
            }
            SyncEvent::PlaybackStopped => {
                *self = Self::default();
                Some(DisplayChange::Message(NO_SONG_MESSAGE))
            }
        }
    }

    /// Original and translated text of a line. The translation falls back to
    /// the original until translations arrive.
    #[must_use]
    pub fn line(&self, index: usize) -> Option<(i64, &str, Option<&str>)> {
        let line = self.lines.get(index)?;
        let translated = self
            .translations
            .as_ref()
            .and_then(|translations| translations.get(index))
            .map(|t| t.translated.as_str())
            .filter(|translated| *translated != line.text);
        Some((line.start_ms, line.text.as_str(), translated))
    }

    fn is_showing(&self, track_id: &str) -> bool {
        self.track.as_ref().is_some_and(|track| track.id == track_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transverse_core::PlaybackSnapshot;

    fn track(id: &str) -> Track {
        Track::new(id, "Canción", "Artista", "Álbum", 200_000)
    }

    fn lines() -> Vec<LyricLine> {
        vec![LyricLine::new(0, "hola"), LyricLine::new(2000, "mundo")]
    }

    fn tick(id: &str, position_ms: i64, active_line: Option<usize>) -> SyncEvent {
        SyncEvent::PlaybackTick(PlaybackSnapshot {
            track: track(id),
            position_ms,
            duration_ms: 200_000,
            playing: true,
            active_line,
        })
    }

    fn showing(id: &str) -> DisplayState {
        let mut state = DisplayState::default();
        state.apply(SyncEvent::TrackChanged {
            track: track(id),
            lines: lines(),
            language: Some("es".into()),
        });
        state
    }

    #[test]
    fn test_track_change_resets_state() {
        let mut state = showing("a");
        state.apply(tick("a", 2500, Some(1)));

        let change = state.apply(SyncEvent::TrackChanged {
            track: track("b"),
            lines: Vec::new(),
            language: None,
        });

        assert_eq!(change, Some(DisplayChange::Track));
        assert_eq!(state.track.as_ref().map(|t| t.id.as_str()), Some("b"));
        assert!(state.active_line.is_none());
        assert!(state.lines.is_empty());
    }

    #[test]
    fn test_translations_for_other_track_are_ignored() {
        let mut state = showing("b");

        let change = state.apply(SyncEvent::TranslationsReady {
            track_id: "a".into(),
            lines: vec![TranslatedLine::new(&lines()[0], "hello")],
            translated_title: None,
            from_cache: false,
        });

        assert_eq!(change, None);
        assert!(state.translations.is_none());
    }

    #[test]
    fn test_translations_for_shown_track() {
        let mut state = showing("a");
        let translated = lines()
            .iter()
            .zip(["hello", "world"])
            .map(|(line, t)| TranslatedLine::new(line, t))
            .collect();

        let change = state.apply(SyncEvent::TranslationsReady {
            track_id: "a".into(),
            lines: translated,
            translated_title: Some("Song".into()),
            from_cache: true,
        });

        assert_eq!(change, Some(DisplayChange::Translations));
        assert_eq!(state.line(1), Some((2000, "mundo", Some("world"))));
        assert_eq!(state.translated_title.as_deref(), Some("Song"));
        assert!(state.from_cache);
    }

    #[test]
    fn test_untranslated_line_shows_original_only() {
        let state = showing("a");
        assert_eq!(state.line(0), Some((0, "hola", None)));
        assert_eq!(state.line(5), None);
    }

    #[test]
    fn test_tick_reports_only_line_changes() {
        let mut state = showing("a");

        assert_eq!(state.apply(tick("a", 100, Some(0))), Some(DisplayChange::ActiveLine(0)));
        assert_eq!(state.apply(tick("a", 600, Some(0))), None);
        assert_eq!(state.position_ms, 600);
        assert_eq!(state.apply(tick("a", 2100, Some(1))), Some(DisplayChange::ActiveLine(1)));
        assert_eq!(state.apply(tick("a", 50, Some(0))), Some(DisplayChange::ActiveLine(0)));
    }

    #[test]
    fn test_failure_and_missing_lyrics_show_message() {
        let mut state = showing("a");
        assert_eq!(
            state.apply(SyncEvent::TranslationFailed {
                track_id: "a".into(),
                message: "boom".into(),
            }),
            Some(DisplayChange::Message(NO_LYRICS_MESSAGE))
        );

        let mut state = showing("a");
        assert_eq!(
            state.apply(SyncEvent::NoLyrics { track_id: "a".into() }),
            Some(DisplayChange::Message(NO_LYRICS_MESSAGE))
        );
        assert_eq!(state.apply(SyncEvent::NoLyrics { track_id: "zzz".into() }), None);
    }

    #[test]
    fn test_stop_clears_everything() {
        let mut state = showing("a");

        assert_eq!(
            state.apply(SyncEvent::PlaybackStopped),
            Some(DisplayChange::Message(NO_SONG_MESSAGE))
        );
        assert!(state.track.is_none());
        assert_eq!(state.apply(tick("a", 0, Some(0))), None);
    }
}
