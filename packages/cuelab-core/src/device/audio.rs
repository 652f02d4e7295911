//! Audio engine (DAW) command surface.
//!
//! Message builders for the DAW's OSC endpoints plus the literal mapping
//! from marker index to the DAW's "go to marker" action code. The mapping
//! is not a formula that can be tidied up: the DAW's action list numbers
//! markers 1-9, marker 10 and markers above 10 in three separate bands.

use crate::osc::OscMessage;
use crate::protocol_constants::{
    ACTION_MARKER_BASE, ACTION_MARKER_HIGH_BASE, AUDIO_ACTION_ADDR, AUDIO_PAUSE_ADDR,
    AUDIO_PLAY_ADDR, AUDIO_STOP_ADDR,
};

/// Returns the DAW action code that jumps to `marker`.
///
/// Markers 1-9 live at `40160 + marker`, marker 10 wraps onto the band base
/// `40160`, and markers above 10 live at `41240 + marker`.
///
/// # Panics
///
/// Markers are 1-based; calling this with 0 is a programming error.
#[must_use]
pub fn marker_action(marker: u32) -> i32 {
    assert!(marker >= 1, "markers are 1-based");
    match marker {
        1..=9 => ACTION_MARKER_BASE + marker as i32,
        10 => ACTION_MARKER_BASE,
        _ => ACTION_MARKER_HIGH_BASE + marker as i32,
    }
}

/// `/action` with a numeric action code.
#[must_use]
pub fn action(code: i32) -> OscMessage {
    OscMessage::new(AUDIO_ACTION_ADDR).arg(code)
}

/// `/track/{n}/mute`. `muted` maps to int 1, audible to int 0.
#[must_use]
pub fn track_mute(track: u32, muted: bool) -> OscMessage {
    OscMessage::new(format!("/track/{}/mute", track)).arg(i32::from(muted))
}

/// `/play` with int 1 (start) or 0.
#[must_use]
pub fn play(on: bool) -> OscMessage {
    OscMessage::new(AUDIO_PLAY_ADDR).arg(i32::from(on))
}

/// `/pause` with int 1. The DAW treats this as a toggle, so the same
/// message both pauses and resumes.
#[must_use]
pub fn pause() -> OscMessage {
    OscMessage::new(AUDIO_PAUSE_ADDR).arg(1)
}

/// `/stop` with int 1.
#[must_use]
pub fn stop() -> OscMessage {
    OscMessage::new(AUDIO_STOP_ADDR).arg(1)
}
