//! Session configuration types.
//!
//! The host (GUI or headless runner) parses its own config surface and
//! hands the core a fully resolved [`Config`]. All fields have sensible
//! defaults for a single-machine lab setup.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::device::video::VideoBackend;
use crate::osc::PeerAddr;
use crate::protocol_constants::{
    DEFAULT_MONITOR_INTERVAL_SECS, DEFAULT_PROBE_TIMEOUT_MS, DEFAULT_TRACK_COUNT,
};

/// Where the trial orders for randomized page groups come from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RandomizationMode {
    /// Pages keep their authored order.
    #[default]
    None,
    /// Orders come from the balanced Latin square construction.
    BalancedLatinSquare,
    /// Orders come from an externally authored file.
    FromFile {
        /// Path to the order file.
        path: PathBuf,
    },
}

/// Configuration for one questionnaire session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Audio engine (DAW) peer.
    pub audio_peer: PeerAddr,

    /// UDP port this session listens on for device echoes.
    pub receive_port: u16,

    /// Video engine peer, when the study uses video stimuli.
    pub video_peer: Option<PeerAddr>,

    /// Command table for the video engine.
    pub video_backend: VideoBackend,

    /// Monitoring/status peer receiving `/page`, `/help_request` and
    /// friends. Absent in headless/preview mode.
    pub status_peer: Option<PeerAddr>,

    /// Total track count assumed until the device reveals the live count.
    pub track_count: usize,

    /// Lock each play affordance after its first successful play.
    pub play_once: bool,

    /// Trial-order source for randomized page groups.
    pub randomization: RandomizationMode,

    /// Interval between connectivity probes (seconds).
    pub monitor_interval_secs: u64,

    /// Timeout for a single reachability probe (milliseconds).
    pub probe_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio_peer: PeerAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000),
            receive_port: 9000,
            video_peer: None,
            video_backend: VideoBackend::None,
            status_peer: None,
            track_count: DEFAULT_TRACK_COUNT,
            play_once: false,
            randomization: RandomizationMode::None,
            monitor_interval_secs: DEFAULT_MONITOR_INTERVAL_SECS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when a value would break the session.
    pub fn validate(&self) -> Result<(), String> {
        if self.track_count == 0 {
            return Err("track_count must be >= 1".to_string());
        }
        if self.monitor_interval_secs == 0 {
            return Err("monitor_interval_secs must be >= 1".to_string());
        }
        if self.video_peer.is_some() && self.video_backend == VideoBackend::None {
            return Err(
                "video_peer is configured but video_backend is 'none'".to_string(),
            );
        }
        if self.video_peer.is_none() && self.video_backend != VideoBackend::None {
            return Err(format!(
                "video_backend '{}' needs a video_peer",
                self.video_backend
            ));
        }
        Ok(())
    }

    /// Peers the connectivity monitor should probe.
    #[must_use]
    pub fn monitored_peers(&self) -> Vec<PeerAddr> {
        let mut peers = vec![self.audio_peer];
        peers.extend(self.video_peer);
        peers
    }
}
