use crate::cache::TranslationCache;
use crate::error::Result;
use crate::lyrics::{LyricLine, TranslatedLine};
use crate::pipeline::{CompletedBatch, TranslationPipeline};
use crate::playback::{PlaybackState, Track};
use crate::source::{LyricSource, PlayerSource};
use crate::sync::{active_line, PlaybackSnapshot, SyncEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default interval between player polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

const MAX_BACKOFF: Duration = Duration::from_secs(30);
const EVENT_CHANNEL_CAPACITY: usize = 64;
const BATCH_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug)]
enum TrackerState {
    Idle,
    Tracking {
        track: Track,
        lines: Vec<LyricLine>,
        generation: u64,
    },
}

/// Polls the player, follows song changes and drives translation.
///
/// The tracker owns both sources and is the only task that talks to them.
/// Translation runs in the background; finished batches come back over an
/// mpsc channel and are applied only if they belong to the current
/// generation, so a slow batch for a previous song can never overwrite the
/// song on screen.
pub struct PlaybackTracker {
    player: Box<dyn PlayerSource>,
    lyrics: Box<dyn LyricSource>,
    cache: Arc<TranslationCache>,
    pipeline: Arc<TranslationPipeline>,
    poll_interval: Duration,
    backoff_on_error: bool,
    cancel_token: CancellationToken,
    event_tx: broadcast::Sender<SyncEvent>,
    batch_tx: mpsc::Sender<CompletedBatch>,
    batch_rx: mpsc::Receiver<CompletedBatch>,
    state: TrackerState,
    generation: u64,
}

impl PlaybackTracker {
    /// Create a new playback tracker
    pub fn new(
        player: Box<dyn PlayerSource>,
        lyrics: Box<dyn LyricSource>,
        cache: Arc<TranslationCache>,
        pipeline: Arc<TranslationPipeline>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (batch_tx, batch_rx) = mpsc::channel(BATCH_CHANNEL_CAPACITY);

        Self {
            player,
            lyrics,
            cache,
            pipeline,
            poll_interval: DEFAULT_POLL_INTERVAL,
            backoff_on_error: false,
            cancel_token: CancellationToken::new(),
            event_tx,
            batch_tx,
            batch_rx,
            state: TrackerState::Idle,
            generation: 0,
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Back off exponentially while the player keeps failing instead of
    /// retrying on every tick
    #[must_use]
    pub const fn with_backoff(mut self, enabled: bool) -> Self {
        self.backoff_on_error = enabled;
        self
    }

    /// Use an externally owned cancellation token
    #[must_use]
    pub fn with_cancel_token(mut self, cancel_token: CancellationToken) -> Self {
        self.cancel_token = cancel_token;
        self
    }

    /// Subscribe to sync events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.event_tx.subscribe()
    }

    /// Get a clone of the cancellation token
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Start tracking in a background task
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run the poll loop until cancelled
    pub async fn run(mut self) {
        info!(
            "Starting playback tracker ({} / {}), polling every {:?}",
            self.player.name(),
            self.lyrics.name(),
            self.poll_interval
        );

        let cancel_token = self.cancel_token.clone();
        let mut consecutive_errors: u32 = 0;
        let poll = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(poll);

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => {
                    info!("Playback tracker shutting down");
                    break;
                }
                Some(batch) = self.batch_rx.recv() => {
                    self.handle_batch(batch);
                }
                () = &mut poll => {
                    // A slow source must not delay shutdown
                    let ticked = tokio::select! {
                        () = cancel_token.cancelled() => {
                            info!("Playback tracker shutting down mid-poll");
                            break;
                        }
                        ticked = self.tick() => ticked,
                    };
                    match ticked {
                        Ok(()) => consecutive_errors = 0,
                        Err(e) => {
                            consecutive_errors = consecutive_errors.saturating_add(1);
                            warn!("Poll error (attempt {}): {}", consecutive_errors, e);
                        }
                    }

                    let delay = self.next_delay(consecutive_errors);
                    if consecutive_errors >= 5 && self.backoff_on_error {
                        error!("Too many consecutive player errors, waiting {:?}", delay);
                    }
                    poll.as_mut().reset(tokio::time::Instant::now() + delay);
                }
            }
        }
    }

    /// Poll the player once and react to what it reports.
    ///
    /// On error the tracker has already moved to idle; the error is returned so
    /// the caller can decide how long to wait before the next poll.
    ///
    /// # Errors
    ///
    /// Returns the player source error, if any.
    pub async fn tick(&mut self) -> Result<()> {
        let playback = match self.player.current_playback().await {
            Ok(playback) => playback,
            Err(e) => {
                self.stop_tracking();
                return Err(e);
            }
        };

        let Some(playback) = playback else {
            self.stop_tracking();
            return Ok(());
        };

        let is_new_track = match &self.state {
            TrackerState::Tracking { track, .. } => track.id != playback.track.id,
            TrackerState::Idle => true,
        };
        if is_new_track {
            self.start_tracking(playback.track.clone()).await;
        }

        self.publish_tick(playback);
        Ok(())
    }

    /// Apply a finished translation batch if it belongs to the current
    /// generation. Returns `true` if the batch was applied.
    pub fn handle_batch(&mut self, batch: CompletedBatch) -> bool {
        let is_current = matches!(
            &self.state,
            TrackerState::Tracking { track, generation, .. }
                if *generation == batch.generation && track.id == batch.track_id
        );
        if !is_current {
            debug!(
                "Dropping stale translation for {} (generation {})",
                batch.track_id, batch.generation
            );
            return false;
        }

        match batch.result {
            Ok(song) => {
                self.emit(SyncEvent::TranslationsReady {
                    track_id: song.track_id,
                    lines: song.lines,
                    translated_title: song.translated_title,
                    from_cache: false,
                });
            }
            Err(e) => {
                error!("Translation failed for {}: {}", batch.track_id, e);
                self.emit(SyncEvent::TranslationFailed {
                    track_id: batch.track_id,
                    message: e.to_string(),
                });
            }
        }
        true
    }

    async fn start_tracking(&mut self, track: Track) {
        self.generation += 1;
        let generation = self.generation;
        info!("Now playing: {} ({})", track.display_name(), track.id);

        let fetched = match self.lyrics.lyrics(&track.id).await {
            Ok(Some(fetched)) if !fetched.is_empty() => Some(fetched),
            Ok(_) => None,
            Err(e) => {
                warn!("Error fetching lyrics from {}: {}", self.lyrics.name(), e);
                None
            }
        };

        let Some(fetched) = fetched else {
            info!("No lyrics for {}", track.display_name());
            self.emit(SyncEvent::TrackChanged {
                track: track.clone(),
                lines: Vec::new(),
                language: None,
            });
            self.emit(SyncEvent::NoLyrics {
                track_id: track.id.clone(),
            });
            self.state = TrackerState::Tracking {
                track,
                lines: Vec::new(),
                generation,
            };
            return;
        };

        self.emit(SyncEvent::TrackChanged {
            track: track.clone(),
            lines: fetched.lines.clone(),
            language: fetched.language,
        });

        match self.cached_translation(&track.id).await {
            Some(lines) => {
                debug!("Translation cache hit for {}", track.id);
                self.emit(SyncEvent::TranslationsReady {
                    track_id: track.id.clone(),
                    lines,
                    translated_title: None,
                    from_cache: true,
                });
            }
            None => {
                debug!(
                    "Translating {} line(s) for {}",
                    fetched.lines.len(),
                    track.id
                );
                self.pipeline.spawn(
                    track.clone(),
                    fetched.lines.clone(),
                    generation,
                    self.batch_tx.clone(),
                );
            }
        }

        self.state = TrackerState::Tracking {
            track,
            lines: fetched.lines,
            generation,
        };
    }

    async fn cached_translation(&self, track_id: &str) -> Option<Vec<TranslatedLine>> {
        let cache = Arc::clone(&self.cache);
        let track_id = track_id.to_string();
        match tokio::task::spawn_blocking(move || cache.get(&track_id)).await {
            Ok(lines) => lines,
            Err(e) => {
                warn!("Translation cache lookup did not complete: {}", e);
                None
            }
        }
    }

    fn stop_tracking(&mut self) {
        if matches!(self.state, TrackerState::Idle) {
            return;
        }
        info!("Playback stopped");
        self.state = TrackerState::Idle;
        self.emit(SyncEvent::PlaybackStopped);
    }

    fn publish_tick(&self, playback: PlaybackState) {
        let TrackerState::Tracking { lines, .. } = &self.state else {
            return;
        };

        let snapshot = PlaybackSnapshot {
            active_line: active_line(lines, playback.position_ms),
            position_ms: playback.position_ms,
            duration_ms: playback.track.duration_ms,
            playing: playback.playing,
            track: playback.track,
        };
        self.emit(SyncEvent::PlaybackTick(snapshot));
    }

    fn next_delay(&self, consecutive_errors: u32) -> Duration {
        if !self.backoff_on_error || consecutive_errors == 0 {
            return self.poll_interval;
        }
        backoff_delay(consecutive_errors).max(self.poll_interval)
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}

/// Exponential backoff after `consecutive_errors` failed polls, capped at 30s
fn backoff_delay(consecutive_errors: u32) -> Duration {
    let millis = 100_u64.saturating_mul(2_u64.pow(consecutive_errors.min(10)));
    Duration::from_millis(millis).min(MAX_BACKOFF)
}
