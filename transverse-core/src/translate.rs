//! Translation service trait and single-line translation with fallback.

use crate::error::Result;
use crate::lyrics::{LyricLine, TranslatedLine};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Instrumental marker some lyric backends emit for wordless sections
const INSTRUMENTAL_MARKER: &str = "♪";

/// Trait for translation backends
#[async_trait]
pub trait TranslationService: Send + Sync {
    /// Get the service name
    fn name(&self) -> &'static str;

    /// Translate one piece of text into `target_language`.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::TranslationUnavailable`](crate::CoreError::TranslationUnavailable)
    /// on network or quota errors.
    async fn translate(&self, text: &str, target_language: &str) -> Result<String>;
}

/// Translates a single lyric line, never failing.
///
/// Any error or empty response from the service yields the original text, so
/// one bad line cannot abort a whole song.
#[derive(Clone)]
pub struct LineTranslator {
    service: Arc<dyn TranslationService>,
    target_language: String,
}

impl LineTranslator {
    /// Create a new line translator
    pub fn new(service: Arc<dyn TranslationService>, target_language: impl Into<String>) -> Self {
        Self {
            service,
            target_language: target_language.into(),
        }
    }

    /// Language lines are translated into
    #[must_use]
    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    /// Translate a line, falling back to the original text on failure
    pub async fn translate(&self, line: &LyricLine) -> TranslatedLine {
        if is_untranslatable(&line.text) {
            return TranslatedLine::passthrough(line);
        }

        match self.translate_text(&line.text).await {
            Some(translated) => TranslatedLine::new(line, translated),
            None => TranslatedLine::passthrough(line),
        }
    }

    /// Translate free text (e.g. a track title). Returns `None` on failure.
    pub async fn translate_text(&self, text: &str) -> Option<String> {
        match self.service.translate(text, &self.target_language).await {
            Ok(translated) if !translated.trim().is_empty() => Some(translated),
            Ok(_) => {
                debug!(
                    "{} returned an empty translation for '{}'",
                    self.service.name(),
                    text
                );
                None
            }
            Err(e) => {
                warn!("Error translating '{}' via {}: {}", text, self.service.name(), e);
                None
            }
        }
    }
}

fn is_untranslatable(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed == INSTRUMENTAL_MARKER
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::CoreError;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Uppercases text. Texts in `failing` error, texts in `empty` come back
    /// blank, and texts listed in `delays` sleep first so tests can control
    /// completion order.
    #[derive(Default)]
    pub(crate) struct MockTranslationService {
        pub failing: HashSet<String>,
        pub empty: HashSet<String>,
        pub delays: Vec<(String, Duration)>,
        pub calls: AtomicUsize,
        pub active: AtomicUsize,
        pub max_active: AtomicUsize,
        pub completed: Mutex<Vec<String>>,
    }

    impl MockTranslationService {
        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TranslationService for MockTranslationService {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);

            if let Some((_, delay)) = self.delays.iter().find(|(t, _)| t == text) {
                tokio::time::sleep(*delay).await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.completed.lock().unwrap().push(text.to_string());

            if self.failing.contains(text) {
                return Err(CoreError::TranslationUnavailable {
                    reason: "mock failure".into(),
                });
            }
            if self.empty.contains(text) {
                return Ok(String::new());
            }
            Ok(format!("{}[{target_language}]", text.to_uppercase()))
        }
    }

    #[tokio::test]
    async fn test_translate_success() {
        let service = Arc::new(MockTranslationService::default());
        let translator = LineTranslator::new(service.clone(), "en");

        let result = translator.translate(&LyricLine::new(1000, "hola")).await;

        assert_eq!(result.start_ms, 1000);
        assert_eq!(result.text, "hola");
        assert_eq!(result.translated, "HOLA[en]");
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_translate_failure_falls_back() {
        let service = Arc::new(MockTranslationService {
            failing: HashSet::from(["hola".to_string()]),
            ..Default::default()
        });
        let translator = LineTranslator::new(service, "en");

        let result = translator.translate(&LyricLine::new(0, "hola")).await;

        assert_eq!(result.translated, "hola");
    }

    #[tokio::test]
    async fn test_translate_empty_response_falls_back() {
        let service = Arc::new(MockTranslationService {
            empty: HashSet::from(["hola".to_string()]),
            ..Default::default()
        });
        let translator = LineTranslator::new(service, "en");

        let result = translator.translate(&LyricLine::new(0, "hola")).await;

        assert_eq!(result.translated, "hola");
    }

    #[tokio::test]
    async fn test_blank_and_instrumental_lines_skip_service() {
        let service = Arc::new(MockTranslationService::default());
        let translator = LineTranslator::new(service.clone(), "en");

        let blank = translator.translate(&LyricLine::new(0, "   ")).await;
        let marker = translator.translate(&LyricLine::new(10, "♪")).await;

        assert_eq!(blank.translated, "   ");
        assert_eq!(marker.translated, "♪");
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_translate_text() {
        let service = Arc::new(MockTranslationService {
            failing: HashSet::from(["bad".to_string()]),
            ..Default::default()
        });
        let translator = LineTranslator::new(service, "de");

        assert_eq!(translator.translate_text("gut").await.as_deref(), Some("GUT[de]"));
        assert_eq!(translator.translate_text("bad").await, None);
        assert_eq!(translator.target_language(), "de");
    }
}
