//! Time and duration conversion utilities.
//!
//! Lyric timestamps and playback offsets are plain milliseconds. The display
//! form is `M:SS` (minutes unbounded, seconds zero-padded), which only has
//! whole-second granularity.

use std::time::Duration;

/// Display value used for any input that cannot be formatted.
pub const ZERO_DISPLAY: &str = "0:00";

const MILLIS_PER_SECOND: i64 = 1000;
const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;

/// Format milliseconds as `M:SS`.
///
/// Negative input yields `"0:00"`.
#[must_use]
pub fn to_display(ms: i64) -> String {
    if ms < 0 {
        return ZERO_DISPLAY.to_string();
    }

    let minutes = ms / MILLIS_PER_MINUTE;
    let seconds = (ms % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND;
    format!("{minutes}:{seconds:02}")
}

/// Parse an `M:SS` string back into milliseconds.
///
/// Malformed input yields `0`.
#[must_use]
pub fn to_millis(display: &str) -> i64 {
    let Some((minutes, seconds)) = display.trim().split_once(':') else {
        return 0;
    };

    match (minutes.parse::<u32>(), seconds.parse::<u32>()) {
        (Ok(minutes), Ok(seconds)) => {
            i64::from(minutes) * MILLIS_PER_MINUTE + i64::from(seconds) * MILLIS_PER_SECOND
        }
        _ => 0,
    }
}

/// Extension trait for safe Duration conversions.
pub trait DurationExt {
    /// Convert duration to milliseconds as i64, saturating at `i64::MAX`.
    ///
    /// Playback offsets are signed so that "before the first line" can be
    /// represented without a separate flag.
    fn as_millis_i64(&self) -> i64;
}

impl DurationExt for Duration {
    fn as_millis_i64(&self) -> i64 {
        i64::try_from(self.as_millis()).unwrap_or(i64::MAX)
    }
}
