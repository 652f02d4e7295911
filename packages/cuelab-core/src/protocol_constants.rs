//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by the external devices' control surfaces (the
//! DAW's action-ID list, the video players' OSC namespaces) and changing
//! them would break the remote side.

// ─────────────────────────────────────────────────────────────────────────────
// DAW Action IDs
// ─────────────────────────────────────────────────────────────────────────────

/// Base of the "go to marker" action band for markers 1-10.
///
/// Markers 1-9 map to `40160 + marker`; marker 10 wraps back onto the base
/// itself (the DAW numbers "go to marker 10" as 40160). See
/// [`crate::device::audio::marker_action`].
pub const ACTION_MARKER_BASE: i32 = 40160;

/// Base of the "go to marker" action band for markers above 10.
///
/// Markers 11.. map to `41240 + marker`.
pub const ACTION_MARKER_HIGH_BASE: i32 = 41240;

/// Mute all tracks. The same action ID also releases any solo state on the
/// DAW side, so it doubles as the unsolo-all step of the page cleanup.
pub const ACTION_MUTE_UNSOLO_ALL: i32 = 40341;

/// Unselect all tracks.
pub const ACTION_UNSELECT_ALL: i32 = 40297;

/// Enable transport repeat (loop playback).
pub const ACTION_LOOP_ON: i32 = 40632;

/// Disable transport repeat.
pub const ACTION_LOOP_OFF: i32 = 40633;

// ─────────────────────────────────────────────────────────────────────────────
// OSC Addresses (audio device)
// ─────────────────────────────────────────────────────────────────────────────

/// Address of the numeric action endpoint on the audio device.
pub const AUDIO_ACTION_ADDR: &str = "/action";

/// Address of the transport play endpoint (int 1|0).
pub const AUDIO_PLAY_ADDR: &str = "/play";

/// Address of the transport pause toggle endpoint (int 1).
pub const AUDIO_PAUSE_ADDR: &str = "/pause";

/// Address of the transport stop endpoint (int 1).
pub const AUDIO_STOP_ADDR: &str = "/stop";

/// Prefix of per-track endpoints; `/track/{n}/mute` outbound, and inbound
/// `/track/{n}/...` traffic is used to learn the live track count.
pub const AUDIO_TRACK_PREFIX: &str = "/track/";

// ─────────────────────────────────────────────────────────────────────────────
// OSC Addresses (status channel)
// ─────────────────────────────────────────────────────────────────────────────

/// Participant pressed the help affordance.
pub const STATUS_HELP_ADDR: &str = "/help_request";

/// Current page description, one string per notification.
pub const STATUS_PAGE_ADDR: &str = "/page";

/// A configured peer stopped answering reachability probes.
pub const STATUS_CONNECTION_LOST_ADDR: &str = "/connection_lost";

/// The questionnaire session finished.
pub const STATUS_FINISHED_ADDR: &str = "/questionnaire_finished";

// ─────────────────────────────────────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Default total track count assumed until inbound `/track/{n}/...` traffic
/// reveals the live count.
pub const DEFAULT_TRACK_COUNT: usize = 8;

/// Default interval between connectivity probes (seconds).
pub const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 5;

/// Default timeout for a single reachability probe (milliseconds).
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 500;

/// Maximum UDP datagram size accepted by the receiver.
///
/// OSC messages in this protocol are tiny; 4 KiB leaves generous headroom.
pub const MAX_DATAGRAM_SIZE: usize = 4096;
