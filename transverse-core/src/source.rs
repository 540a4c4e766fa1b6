//! Player and lyric source traits.

use crate::error::Result;
use crate::lyrics::FetchedLyrics;
use crate::playback::PlaybackState;
use async_trait::async_trait;

/// Trait for sources that report what the remote player is doing.
///
/// The tracker is the only caller and polls from a single task, so
/// implementations do not need to support concurrent calls. They should:
///
/// - Return `Ok(None)` when nothing is playing
/// - Fail with [`CoreError::PlaybackUnavailable`](crate::CoreError::PlaybackUnavailable)
///   when the session is invalid or the account lacks the required entitlement
#[async_trait]
pub trait PlayerSource: Send + Sync {
    /// Returns a human-readable name for this source.
    fn name(&self) -> &'static str;

    /// Fetch the current playback state.
    ///
    /// # Errors
    ///
    /// Returns an error if the player cannot be reached.
    async fn current_playback(&self) -> Result<Option<PlaybackState>>;
}

/// Trait for sources that provide time-stamped lyrics for a track id.
#[async_trait]
pub trait LyricSource: Send + Sync {
    /// Returns a human-readable name for this source.
    fn name(&self) -> &'static str;

    /// Fetch lyrics for a track. `Ok(None)` means the track has no lyrics.
    ///
    /// # Errors
    ///
    /// Returns an error if the lyrics backend cannot be reached.
    async fn lyrics(&self, track_id: &str) -> Result<Option<FetchedLyrics>>;
}
