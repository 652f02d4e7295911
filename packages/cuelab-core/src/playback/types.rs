//! Core playback value types.

use serde::{Deserialize, Serialize};

use crate::utils::now_stamp;

/// Lifecycle state of one stimulus player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Constructed, never played.
    Idle,
    /// Audibly playing.
    Playing,
    /// Paused mid-stimulus; resumable.
    Paused,
    /// Stopped (explicitly, or displaced by another player).
    Stopped,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Last transport state echoed back by the audio device.
///
/// The DAW confirms `/play`, `/pause` and `/stop` asynchronously with a
/// float `1.0` on the same addresses. Until the first echo arrives the
/// remote state is simply unknown; correlation is by address, not by
/// request/response pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportEcho {
    /// No echo received yet.
    #[default]
    Unknown,
    /// Remote transport reports playing.
    Playing,
    /// Remote transport reports paused.
    Paused,
    /// Remote transport reports stopped.
    Stopped,
}

/// Everything a player needs to know about one stimulus.
///
/// Created when a trial page is instantiated, owned by exactly one player
/// (or one slot of a MUSHRA session), immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StimulusSpec {
    /// DAW marker the stimulus starts at (1-based).
    pub start_marker: u32,
    /// Optional end marker, when the stimulus region is bounded.
    pub end_marker: Option<u32>,
    /// Tracks audible for this stimulus (1-based indices). Every other
    /// track up to the live track count is muted on play.
    pub tracks: Vec<u32>,
    /// Name/path of the video cue bound to this stimulus, if any.
    pub video_ref: Option<String>,
    /// Whether this stimulus may take part in a crossfade hand-off.
    pub crossfade_eligible: bool,
    /// Auto-advance delay revealing gated page content, if configured.
    pub auto_advance_ms: Option<u64>,
}

impl StimulusSpec {
    /// Creates a minimal spec: one marker, one set of audible tracks.
    #[must_use]
    pub fn new(start_marker: u32, tracks: Vec<u32>) -> Self {
        Self {
            start_marker,
            end_marker: None,
            tracks,
            video_ref: None,
            crossfade_eligible: false,
            auto_advance_ms: None,
        }
    }

    /// Builder-style crossfade eligibility.
    #[must_use]
    pub fn with_crossfade(mut self, eligible: bool) -> Self {
        self.crossfade_eligible = eligible;
        self
    }

    /// Builder-style video reference.
    #[must_use]
    pub fn with_video(mut self, video_ref: impl Into<String>) -> Self {
        self.video_ref = Some(video_ref.into());
        self
    }

    /// Builder-style auto-advance delay.
    #[must_use]
    pub fn with_auto_advance_ms(mut self, ms: u64) -> Self {
        self.auto_advance_ms = Some(ms);
        self
    }

    /// True when the two specs share no audible track.
    #[must_use]
    pub fn tracks_disjoint_with(&self, other: &StimulusSpec) -> bool {
        !self.tracks.iter().any(|t| other.tracks.contains(t))
    }
}

/// One completed playback interval, appended whenever a player leaves the
/// playing state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationRecord {
    /// Wall-clock stamp of when the interval ended (`HH:MM:SS.mmm`).
    pub stamp: String,
    /// Elapsed seconds of the interval.
    pub seconds: f64,
}

impl DurationRecord {
    /// Creates a record stamped with the current wall-clock time.
    #[must_use]
    pub fn close(seconds: f64) -> Self {
        Self {
            stamp: now_stamp(),
            seconds,
        }
    }

    /// Human-readable log line for the experimenter-facing duration log.
    #[must_use]
    pub fn log_line(&self, marker: u32) -> String {
        format!("{} marker {} played {:.3}s", self.stamp, marker, self.seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playback_state_display() {
        assert_eq!(PlaybackState::Playing.to_string(), "playing");
        assert_eq!(PlaybackState::Idle.to_string(), "idle");
    }

    #[test]
    fn disjoint_tracks() {
        let a = StimulusSpec::new(1, vec![1, 2]);
        let b = StimulusSpec::new(2, vec![3, 4]);
        let c = StimulusSpec::new(3, vec![2, 5]);
        assert!(a.tracks_disjoint_with(&b));
        assert!(!a.tracks_disjoint_with(&c));
    }

    #[test]
    fn duration_log_line_format() {
        let record = DurationRecord {
            stamp: "12:30:01.250".to_string(),
            seconds: 4.5,
        };
        assert_eq!(record.log_line(7), "12:30:01.250 marker 7 played 4.500s");
    }
}
