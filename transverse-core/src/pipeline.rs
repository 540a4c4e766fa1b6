//! Song-level translation: concurrent fan-out, ordered fan-in, cache commit.

use crate::cache::TranslationCache;
use crate::error::{CoreError, Result};
use crate::lyrics::{LyricLine, TranslatedLine};
use crate::playback::Track;
use crate::translate::LineTranslator;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Default number of lines translated concurrently
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Translated lyrics for one track, in original line order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongTranslation {
    pub track_id: String,
    pub lines: Vec<TranslatedLine>,
    /// Best-effort translation of the track title (never persisted)
    pub translated_title: Option<String>,
}

/// Outcome of a background translation batch, posted back to the tracker
#[derive(Debug)]
pub struct CompletedBatch {
    /// Newest generation that asked for this track
    pub generation: u64,
    pub track_id: String,
    pub result: Result<SongTranslation>,
}

/// Translates whole songs on a bounded pool and commits them to the cache.
pub struct TranslationPipeline {
    translator: LineTranslator,
    cache: Arc<TranslationCache>,
    concurrency: usize,
    translate_titles: bool,
    /// Track id -> newest generation waiting on the running batch
    in_flight: Mutex<HashMap<String, u64>>,
}

impl TranslationPipeline {
    /// Create a new pipeline
    ///
    /// # Arguments
    /// * `translator` - Line translator wrapping the translation service
    /// * `cache` - Cache that receives every completed song
    /// * `concurrency` - Maximum number of lines translated at once
    pub fn new(translator: LineTranslator, cache: Arc<TranslationCache>, concurrency: usize) -> Self {
        Self {
            translator,
            cache,
            concurrency: concurrency.max(1),
            translate_titles: true,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Enable or disable the track title side query
    #[must_use]
    pub const fn with_title_translation(mut self, enabled: bool) -> Self {
        self.translate_titles = enabled;
        self
    }

    /// The cache this pipeline commits to
    #[must_use]
    pub fn cache(&self) -> &Arc<TranslationCache> {
        &self.cache
    }

    /// Check if a batch for this track is currently running
    #[must_use]
    pub fn is_in_flight(&self, track_id: &str) -> bool {
        self.lock_in_flight().contains_key(track_id)
    }

    /// Translate every line of a song and store the result in the cache.
    ///
    /// Lines are translated concurrently but the result is always in input
    /// order. Individual line failures fall back to the original text.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PipelineFailed`] if a worker could not be scheduled
    /// or did not complete.
    pub async fn translate_song(&self, track: &Track, lines: &[LyricLine]) -> Result<SongTranslation> {
        let started = Instant::now();

        let (lines, translated_title) =
            tokio::join!(self.translate_lines(track, lines), self.translate_title(track));
        let lines = lines?;

        let cache = Arc::clone(&self.cache);
        let track_id = track.id.clone();
        let to_store = lines.clone();
        tokio::task::spawn_blocking(move || cache.add(&track_id, to_store))
            .await
            .map_err(|e| pipeline_failed(track, format!("cache commit did not complete: {e}")))?;

        info!(
            "Translated {} line(s) for {} in {:?}",
            lines.len(),
            track.display_name(),
            started.elapsed()
        );

        Ok(SongTranslation {
            track_id: track.id.clone(),
            lines,
            translated_title,
        })
    }

    /// Start translating a song in the background and post the outcome to
    /// `results`.
    ///
    /// At most one batch runs per track. If a batch for the same track is
    /// already running, no new work starts; the running batch is re-tagged with
    /// `generation` so the newest requester receives it. Returns `true` if a new
    /// batch was started.
    pub fn spawn(
        self: &Arc<Self>,
        track: Track,
        lines: Vec<LyricLine>,
        generation: u64,
        results: mpsc::Sender<CompletedBatch>,
    ) -> bool {
        {
            let mut in_flight = self.lock_in_flight();
            if let Some(waiting) = in_flight.get_mut(&track.id) {
                debug!(
                    "Translation for {} already running, re-tagging with generation {}",
                    track.id, generation
                );
                *waiting = generation;
                return false;
            }
            in_flight.insert(track.id.clone(), generation);
        }

        let slot = InFlightSlot {
            pipeline: Arc::clone(self),
            track_id: track.id.clone(),
            results: results.clone(),
            released: false,
        };
        tokio::spawn(async move {
            let result = slot.pipeline.translate_song(&track, &lines).await;
            let generation = slot.release().unwrap_or(generation);

            let batch = CompletedBatch {
                generation,
                track_id: track.id,
                result,
            };
            if results.send(batch).await.is_err() {
                debug!("Tracker stopped before translation finished, dropping result");
            }
        });

        true
    }

    async fn translate_lines(&self, track: &Track, lines: &[LyricLine]) -> Result<Vec<TranslatedLine>> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut workers = JoinSet::new();

        for (index, line) in lines.iter().cloned().enumerate() {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| pipeline_failed(track, format!("cannot schedule worker: {e}")))?;
            let translator = self.translator.clone();

            workers.spawn(async move {
                let _permit = permit;
                (index, translator.translate(&line).await)
            });
        }

        // Completion order is arbitrary; place each result by its source index
        let mut slots: Vec<Option<TranslatedLine>> = vec![None; lines.len()];
        while let Some(joined) = workers.join_next().await {
            let (index, translated) = joined
                .map_err(|e| pipeline_failed(track, format!("translation worker failed: {e}")))?;
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(translated);
            }
        }

        slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| pipeline_failed(track, "a translation worker produced no result".into()))
    }

    async fn translate_title(&self, track: &Track) -> Option<String> {
        if !self.translate_titles || track.title.trim().is_empty() {
            return None;
        }

        // A panic in the service stays inside this task
        let translator = self.translator.clone();
        let title = track.title.clone();
        match tokio::spawn(async move { translator.translate_text(&title).await }).await {
            Ok(Some(translated)) => Some(translated),
            Ok(None) => {
                warn!("Could not translate title of {}", track.display_name());
                None
            }
            Err(e) => {
                warn!(
                    "Title translation for {} did not complete: {}",
                    track.display_name(),
                    e
                );
                None
            }
        }
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds a track's in-flight entry for the lifetime of its batch task.
///
/// If the task unwinds before releasing, dropping the slot frees the entry and
/// posts a failed batch so the track can be translated again.
struct InFlightSlot {
    pipeline: Arc<TranslationPipeline>,
    track_id: String,
    results: mpsc::Sender<CompletedBatch>,
    released: bool,
}

impl InFlightSlot {
    /// Free the entry, returning the newest generation waiting on it
    fn release(mut self) -> Option<u64> {
        self.released = true;
        self.pipeline.lock_in_flight().remove(&self.track_id)
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Some(generation) = self.pipeline.lock_in_flight().remove(&self.track_id) else {
            return;
        };

        error!("Translation task for {} ended without a result", self.track_id);
        let batch = CompletedBatch {
            generation,
            track_id: self.track_id.clone(),
            result: Err(CoreError::PipelineFailed {
                track_id: self.track_id.clone(),
                reason: "translation task ended without a result".into(),
            }),
        };
        if self.results.try_send(batch).is_err() {
            debug!("Could not report failed translation for {}", self.track_id);
        }
    }
}

fn pipeline_failed(track: &Track, reason: String) -> CoreError {
    CoreError::PipelineFailed {
        track_id: track.id.clone(),
        reason,
    }
}
