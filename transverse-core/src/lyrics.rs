//! Lyric line records and validation at the ingestion boundary.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// A single time-stamped lyric line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricLine {
    /// When this line starts (milliseconds from track start)
    pub start_ms: i64,
    /// The lyric text
    pub text: String,
}

impl LyricLine {
    /// Create a new lyric line
    pub fn new(start_ms: i64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            text: text.into(),
        }
    }

    /// Validate a raw line from a lyric backend.
    ///
    /// Returns `None` when the start time or text is missing, when the start
    /// time is not an integer, or when it is negative.
    #[must_use]
    pub fn from_raw(raw: RawLyricLine) -> Option<Self> {
        let start_ms = raw.start_ms?.trim().parse::<i64>().ok()?;
        if start_ms < 0 {
            return None;
        }
        Some(Self {
            start_ms,
            text: raw.text?,
        })
    }
}

/// A lyric line as delivered by a backend, before validation.
///
/// Backends disagree on whether timestamps are strings or numbers, and some
/// omit fields entirely, so everything is optional text here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLyricLine {
    pub start_ms: Option<String>,
    pub text: Option<String>,
}

/// A lyric line paired with its translation. One-to-one with [`LyricLine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedLine {
    pub start_ms: i64,
    /// Original text
    pub text: String,
    /// Translated text (equal to `text` when translation failed)
    pub translated: String,
}

impl TranslatedLine {
    /// Pair a lyric line with its translation
    #[must_use]
    pub fn new(line: &LyricLine, translated: impl Into<String>) -> Self {
        Self {
            start_ms: line.start_ms,
            text: line.text.clone(),
            translated: translated.into(),
        }
    }

    /// Untranslated passthrough of a lyric line
    #[must_use]
    pub fn passthrough(line: &LyricLine) -> Self {
        Self::new(line, line.text.clone())
    }
}

/// Lyrics returned by a lyric source for one track
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedLyrics {
    /// Validated lines, sorted ascending by start time
    pub lines: Vec<LyricLine>,
    /// Detected source language tag (display only)
    pub language: Option<String>,
}

impl FetchedLyrics {
    /// Build lyrics from raw backend lines, skipping malformed entries.
    ///
    /// Lines are stably sorted by start time so duplicate timestamps keep their
    /// source order.
    pub fn from_raw(raw: impl IntoIterator<Item = RawLyricLine>, language: Option<String>) -> Self {
        let mut skipped = 0_usize;
        let mut lines: Vec<LyricLine> = raw
            .into_iter()
            .filter_map(|raw| {
                let line = LyricLine::from_raw(raw);
                if line.is_none() {
                    skipped += 1;
                }
                line
            })
            .collect();

        if skipped > 0 {
            warn!("Skipped {} malformed lyric line(s)", skipped);
        }

        lines.sort_by_key(|line| line.start_ms);

        Self { lines, language }
    }

    /// Check if there are any lines
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(start_ms: Option<&str>, text: Option<&str>) -> RawLyricLine {
        RawLyricLine {
            start_ms: start_ms.map(String::from),
            text: text.map(String::from),
        }
    }

    #[test]
    fn test_from_raw_valid() {
        let line = LyricLine::from_raw(raw(Some("1500"), Some("hello")));
        assert_eq!(line, Some(LyricLine::new(1500, "hello")));
    }

    #[test]
    fn test_from_raw_rejects_malformed() {
        assert_eq!(LyricLine::from_raw(raw(None, Some("hello"))), None);
        assert_eq!(LyricLine::from_raw(raw(Some("1500"), None)), None);
        assert_eq!(LyricLine::from_raw(raw(Some("abc"), Some("hello"))), None);
        assert_eq!(LyricLine::from_raw(raw(Some("-5"), Some("hello"))), None);
    }

    #[test]
    fn test_fetched_lyrics_skips_and_sorts() {
        let fetched = FetchedLyrics::from_raw(
            vec![
                raw(Some("2000"), Some("second")),
                raw(None, Some("broken")),
                raw(Some("0"), Some("first")),
                raw(Some("2000"), Some("second duplicate")),
            ],
            Some("ja".to_string()),
        );

        let texts: Vec<_> = fetched.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "second duplicate"]);
        assert_eq!(fetched.language.as_deref(), Some("ja"));
    }

    #[test]
    fn test_translated_line_passthrough() {
        let line = LyricLine::new(1000, "hola");
        let translated = TranslatedLine::passthrough(&line);

        assert_eq!(translated.start_ms, 1000);
        assert_eq!(translated.text, "hola");
        assert_eq!(translated.translated, "hola");
    }
}
