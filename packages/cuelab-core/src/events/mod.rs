//! Event system for host-facing notifications.
//!
//! This module provides:
//! - [`EventEmitter`] trait for core services to emit events
//! - Event types for the playback and network domains
//!
//! The host UI (out of scope here) subscribes to these instead of polling
//! player state; the headless runner just logs them.

mod emitter;

pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

#[cfg(test)]
pub(crate) use emitter::test_support;

use serde::Serialize;
use uuid::Uuid;

use crate::osc::PeerAddr;

/// Events emitted to the host.
///
/// Each category has its own inner event type with specific variants.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum SessionEvent {
    /// Events from the playback state machines.
    Playback(PlaybackEvent),

    /// Events related to peer reachability.
    Network(NetworkEvent),
}

/// Events from the playback state machines.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaybackEvent {
    /// A stimulus entered the playing state.
    Started {
        /// Identity of the player in its registry.
        #[serde(rename = "playerId")]
        player_id: Uuid,
        /// The stimulus start marker.
        marker: u32,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A stimulus was paused.
    Paused {
        /// Identity of the player in its registry.
        #[serde(rename = "playerId")]
        player_id: Uuid,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A stimulus stopped (explicitly or by displacement).
    Stopped {
        /// Identity of the player in its registry.
        #[serde(rename = "playerId")]
        player_id: Uuid,
        /// Elapsed seconds of the playback interval that just ended.
        seconds: f64,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A player's auto-advance timer elapsed; gated page content may now be
    /// revealed. Playback itself is not affected.
    AdvanceElapsed {
        /// Identity of the player in its registry.
        #[serde(rename = "playerId")]
        player_id: Uuid,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Events related to peer reachability.
///
/// Advisory only: the host decides whether to show a dialog, log, or
/// suppress them in preview mode.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NetworkEvent {
    /// A configured peer stopped answering probes. Emitted once per loss.
    PeerLost {
        /// The unreachable peer.
        peer: PeerAddr,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A previously lost peer answers probes again.
    PeerRestored {
        /// The recovered peer.
        peer: PeerAddr,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

impl SessionEvent {
    /// Serializes the event for a host that forwards events as JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

// From implementations for converting inner events to SessionEvent
impl From<PlaybackEvent> for SessionEvent {
    fn from(event: PlaybackEvent) -> Self {
        SessionEvent::Playback(event)
    }
}

impl From<NetworkEvent> for SessionEvent {
    fn from(event: NetworkEvent) -> Self {
        SessionEvent::Network(event)
    }
}
