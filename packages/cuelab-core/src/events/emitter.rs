//! Event emitter abstraction for decoupling services from transport.
//!
//! Services depend on the [`EventEmitter`] trait rather than a concrete
//! channel or UI bridge, enabling testing and alternative hosts.

use super::{NetworkEvent, PlaybackEvent};

/// Trait for emitting domain events without knowledge of transport.
///
/// Players, MUSHRA sessions and the connectivity monitor use this trait to
/// emit events, decoupling them from how the host delivers them (GUI
/// signal, log line, broadcast channel).
pub trait EventEmitter: Send + Sync {
    /// Emits a playback state-machine event.
    fn emit_playback(&self, event: PlaybackEvent);

    /// Emits a peer reachability event.
    fn emit_network(&self, event: NetworkEvent);
}

/// No-op emitter for preview mode or testing.
///
/// Events are silently discarded.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_playback(&self, _event: PlaybackEvent) {
        // No-op
    }

    fn emit_network(&self, _event: NetworkEvent) {
        // No-op
    }
}

/// Logging emitter for the headless runner and development.
///
/// Logs all events at debug level.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_playback(&self, event: PlaybackEvent) {
        tracing::debug!(?event, "playback_event");
    }

    fn emit_network(&self, event: NetworkEvent) {
        tracing::debug!(?event, "network_event");
    }
}
