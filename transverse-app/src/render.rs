//! Plain terminal rendering of the display state.

use crate::state::{DisplayChange, DisplayState};
use std::io::{self, Write};
use transverse_core::time;

/// Header line: artist, title, translated title, language and progress
#[must_use]
pub fn header(state: &DisplayState) -> Option<String> {
    let track = state.track.as_ref()?;

    let mut header = format!("♫ {}", track.display_name());
    if let Some(title) = state
        .translated_title
        .as_deref()
        .filter(|title| *title != track.title)
    {
        header.push_str(&format!(" ({title})"));
    }
    if let Some(language) = &state.language {
        header.push_str(&format!(" [{language}]"));
    }
    header.push_str(&format!(
        "  {} / {}",
        time::to_display(state.position_ms),
        time::to_display(i64::try_from(track.duration_ms).unwrap_or(i64::MAX))
    ));
    Some(header)
}

/// One lyric line with its timestamp, followed by its translation if any
#[must_use]
pub fn lyric_line(state: &DisplayState, index: usize) -> Option<String> {
    let (start_ms, text, translated) = state.line(index)?;
    let timestamp = time::to_display(start_ms);

    let mut out = format!("[{timestamp}] {text}");
    if let Some(translated) = translated {
        out.push_str(&format!("\n{:width$}  → {translated}", "", width = timestamp.len()));
    }
    Some(out)
}

/// Status message in the same layout as a lyric line
#[must_use]
pub fn message(text: &str) -> String {
    format!("[{}] {text}", time::ZERO_DISPLAY)
}

/// Text to print for a change, or `None` if nothing should be printed
#[must_use]
pub fn render(state: &DisplayState, change: DisplayChange) -> Option<String> {
    match change {
        DisplayChange::Track => header(state),
        DisplayChange::ActiveLine(index) => {
            let line = lyric_line(state, index)?;
            Some(format!("{}\n{line}", progress(state)))
        }
        DisplayChange::Translations => {
            let note = if state.from_cache {
                "Translations loaded from cache"
            } else {
                "Translations ready"
            };
            let mut out = format!("  ({note})");
            // Reprint the current line so its translation shows immediately
            if let Some(line) = state.active_line.and_then(|i| lyric_line(state, i)) {
                out.push('\n');
                out.push_str(&line);
            }
            Some(out)
        }
        DisplayChange::Message(text) => Some(message(text)),
    }
}

fn progress(state: &DisplayState) -> String {
    let duration_ms = state
        .track
        .as_ref()
        .map_or(0, |track| i64::try_from(track.duration_ms).unwrap_or(i64::MAX));
    format!(
        "  {} {} / {}",
        if state.playing { "▶" } else { "⏸" },
        time::to_display(state.position_ms),
        time::to_display(duration_ms)
    )
}

/// Write rendered output to stdout
pub fn print(output: &str) {
    let mut stdout = io::stdout().lock();
    // A closed stdout is not worth crashing over
    let _ = writeln!(stdout, "{output}");
    let _ = stdout.flush();
}
