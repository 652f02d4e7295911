//! Runner configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use cuelab_core::{PeerAddr, RandomizationMode, VideoBackend};

/// Runner configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Audio engine (DAW) peer.
    /// Overrides: `CUELAB_AUDIO_HOST`, `CUELAB_AUDIO_PORT`
    pub audio_peer: PeerAddr,

    /// UDP port to listen on for device echoes.
    /// Override: `CUELAB_RECEIVE_PORT`
    pub receive_port: u16,

    /// Video engine peer, when the study uses video stimuli.
    pub video_peer: Option<PeerAddr>,

    /// Command table for the video engine.
    pub video_backend: VideoBackend,

    /// Monitoring peer receiving status notifications. Usually absent in
    /// headless runs.
    pub status_peer: Option<PeerAddr>,

    /// Total track count assumed until the device reveals the live count.
    pub track_count: usize,

    /// Lock each play affordance after its first successful play.
    pub play_once: bool,

    /// Trial-order source for randomized page groups.
    pub randomization: RandomizationMode,

    /// Interval in seconds between connectivity probes.
    /// Override: `CUELAB_MONITOR_INTERVAL`
    pub monitor_interval_secs: u64,

    /// Timeout in milliseconds for a single reachability probe.
    pub probe_timeout_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let core = cuelab_core::Config::default();
        Self {
            audio_peer: core.audio_peer,
            receive_port: core.receive_port,
            video_peer: core.video_peer,
            video_backend: core.video_backend,
            status_peer: core.status_peer,
            track_count: core.track_count,
            play_once: core.play_once,
            randomization: core.randomization,
            monitor_interval_secs: core.monitor_interval_secs,
            probe_timeout_ms: core.probe_timeout_ms,
        }
    }
}

impl RunnerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CUELAB_AUDIO_HOST") {
            if let Ok(host) = val.parse::<IpAddr>() {
                self.audio_peer.host = host;
            }
        }

        if let Ok(val) = std::env::var("CUELAB_AUDIO_PORT") {
            if let Ok(port) = val.parse() {
                self.audio_peer.port = port;
            }
        }

        if let Ok(val) = std::env::var("CUELAB_RECEIVE_PORT") {
            if let Ok(port) = val.parse() {
                self.receive_port = port;
            }
        }

        if let Ok(val) = std::env::var("CUELAB_MONITOR_INTERVAL") {
            if let Ok(interval) = val.parse() {
                self.monitor_interval_secs = interval;
            }
        }

        if let Ok(val) = std::env::var("CUELAB_ORDER_FILE") {
            self.randomization = RandomizationMode::FromFile {
                path: PathBuf::from(val),
            };
        }
    }

    /// Converts to cuelab-core's Config type.
    pub fn to_core_config(&self) -> cuelab_core::Config {
        cuelab_core::Config {
            audio_peer: self.audio_peer,
            receive_port: self.receive_port,
            video_peer: self.video_peer,
            video_backend: self.video_backend,
            status_peer: self.status_peer,
            track_count: self.track_count,
            play_once: self.play_once,
            randomization: self.randomization.clone(),
            monitor_interval_secs: self.monitor_interval_secs,
            probe_timeout_ms: self.probe_timeout_ms,
        }
    }
}
