//! Shared session context handed into players and MUSHRA sessions.
//!
//! This module provides [`SessionContext`], which bundles the transport
//! handle, peer addresses, device backend selection and the live runtime
//! state every player needs. It is passed explicitly into constructors;
//! there is no ambient or static session state anywhere in the crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::device::video::VideoBackend;
use crate::events::EventEmitter;
use crate::osc::{OscMessage, OscSender, PeerAddr};
use crate::playback::types::TransportEcho;
use crate::runtime::TaskSpawner;

/// Video engine target: where to send, and which command table to use.
#[derive(Debug, Clone, Copy)]
pub struct VideoTarget {
    /// The video engine peer.
    pub peer: PeerAddr,
    /// The command table to resolve against.
    pub backend: VideoBackend,
}

/// Everything players share within one questionnaire session.
///
/// One context per session; players, MUSHRA sessions, the status channel
/// and the connectivity monitor all hold an `Arc` to it. Mutable pieces
/// (live track count, transport echo) are interior and lock-free or
/// briefly locked, since the OSC receive task updates them concurrently
/// with UI-triggered reads.
pub struct SessionContext {
    /// Outbound message sink shared by all peers.
    pub sender: Arc<dyn OscSender>,
    /// Spawner for timers and background loops.
    pub spawner: Arc<dyn TaskSpawner>,
    /// Host-facing event sink.
    pub emitter: Arc<dyn EventEmitter>,
    /// The audio engine peer.
    pub audio_peer: PeerAddr,
    /// The video engine, when one is configured.
    pub video: Option<VideoTarget>,
    /// Whether the play affordance locks after the first successful play.
    pub play_once: bool,
    /// Live total track count on the audio device.
    track_count: AtomicUsize,
    /// Last transport state echoed by the audio device.
    audio_echo: RwLock<TransportEcho>,
}

impl SessionContext {
    /// Creates a context.
    ///
    /// `default_track_count` seeds the live count until inbound
    /// `/track/{n}/...` traffic reveals the real one.
    #[must_use]
    pub fn new(
        sender: Arc<dyn OscSender>,
        spawner: Arc<dyn TaskSpawner>,
        emitter: Arc<dyn EventEmitter>,
        audio_peer: PeerAddr,
        video: Option<VideoTarget>,
        default_track_count: usize,
        play_once: bool,
    ) -> Self {
        Self {
            sender,
            spawner,
            emitter,
            audio_peer,
            video,
            play_once,
            track_count: AtomicUsize::new(default_track_count),
            audio_echo: RwLock::new(TransportEcho::Unknown),
        }
    }

    /// Sends one message to the audio engine, best-effort.
    pub fn send_audio(&self, msg: &OscMessage) {
        self.sender.send(self.audio_peer, msg);
    }

    /// Sends one message to the video engine, if one is configured.
    pub fn send_video(&self, msg: &OscMessage) {
        if let Some(video) = &self.video {
            self.sender.send(video.peer, msg);
        }
    }

    /// The video backend, [`VideoBackend::None`] when unconfigured.
    #[must_use]
    pub fn video_backend(&self) -> VideoBackend {
        self.video.map_or(VideoBackend::None, |v| v.backend)
    }

    /// Current live track count.
    #[must_use]
    pub fn track_count(&self) -> usize {
        self.track_count.load(Ordering::Relaxed)
    }

    /// Raises the live track count when inbound traffic reveals a higher
    /// track index. Never shrinks: the DAW does not drop tracks mid-session.
    pub fn observe_track_index(&self, index: usize) {
        self.track_count.fetch_max(index, Ordering::Relaxed);
    }

    /// Last transport state echoed by the audio device.
    #[must_use]
    pub fn audio_echo(&self) -> TransportEcho {
        *self.audio_echo.read()
    }

    /// Records a transport state echo. Called from the OSC receive task.
    pub fn set_audio_echo(&self, echo: TransportEcho) {
        *self.audio_echo.write() = echo;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::events::test_support::RecordingEventEmitter;
    use crate::osc::OscMessage;
    use crate::protocol_constants::DEFAULT_TRACK_COUNT;
    use parking_lot::Mutex;
    use std::net::{IpAddr, Ipv4Addr};

    /// Sender that records every message with its destination.
    #[derive(Default)]
    pub struct RecordingSender {
        pub sent: Mutex<Vec<(PeerAddr, OscMessage)>>,
    }

    impl RecordingSender {
        pub fn arc() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// All recorded messages for one peer.
        pub fn sent_to(&self, peer: PeerAddr) -> Vec<OscMessage> {
            self.sent
                .lock()
                .iter()
                .filter(|(p, _)| *p == peer)
                .map(|(_, m)| m.clone())
                .collect()
        }

        pub fn clear(&self) {
            self.sent.lock().clear();
        }
    }

    impl OscSender for RecordingSender {
        fn send(&self, peer: PeerAddr, msg: &OscMessage) {
            self.sent.lock().push((peer, msg.clone()));
        }
    }

    /// Spawner that drops the future: tests drive timers explicitly or run
    /// under a tokio runtime with `TokioSpawner` instead.
    pub struct DiscardSpawner;

    impl TaskSpawner for DiscardSpawner {
        fn spawn(
            &self,
            _future: std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'static>>,
        ) {
        }
    }

    pub fn audio_peer() -> PeerAddr {
        PeerAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000)
    }

    pub fn video_peer() -> PeerAddr {
        PeerAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8010)
    }

    pub struct TestHarness {
        pub sender: Arc<RecordingSender>,
        pub emitter: Arc<RecordingEventEmitter>,
        pub ctx: Arc<SessionContext>,
    }

    /// Context over recording doubles, no video, default track count.
    pub fn harness() -> TestHarness {
        harness_with(None, false)
    }

    /// Context over recording doubles with optional video target.
    pub fn harness_with(video: Option<VideoTarget>, play_once: bool) -> TestHarness {
        let sender = RecordingSender::arc();
        let emitter = RecordingEventEmitter::arc();
        let ctx = Arc::new(SessionContext::new(
            sender.clone(),
            Arc::new(DiscardSpawner),
            emitter.clone(),
            audio_peer(),
            video,
            DEFAULT_TRACK_COUNT,
            play_once,
        ));
        TestHarness {
            sender,
            emitter,
            ctx,
        }
    }
}
