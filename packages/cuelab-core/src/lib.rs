//! CueLab Core - shared library for CueLab.
//!
//! This crate provides the playback-orchestration core of CueLab, a
//! perceptual-study questionnaire runner. It drives a remote DAW and video
//! player over OSC/UDP, runs the per-stimulus playback state machines
//! (displacement, crossfade hand-off, track muting), and computes
//! counterbalanced trial orders per participant. It is designed to be used
//! by both a GUI questionnaire host and the headless runner.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`runtime`]: Task spawning abstraction for async runtime independence
//! - [`events`]: Event system for host notifications
//! - [`context`]: Shared session context handed into players
//! - [`state`]: Session configuration
//! - [`osc`]: Wire codec and UDP transport
//! - [`device`]: Command tables for the audio and video engines
//! - [`playback`]: Players, MUSHRA sessions, trial pages
//! - [`order`]: Balanced Latin squares and order files
//! - [`monitor`]: Peer reachability watchdog
//! - [`status`]: Fire-and-forget monitoring channel
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! The crate defines several traits to decouple core logic from
//! host-specific implementations:
//!
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks
//! - [`EventEmitter`](events::EventEmitter): Emitting domain events
//! - [`OscSender`](osc::OscSender): Outbound datagrams
//! - [`ReachabilityProbe`](monitor::ReachabilityProbe): Connectivity probes
//!
//! Each trait has a default implementation suitable for the headless
//! runner; a GUI host provides its own where needed.

#![warn(clippy::all)]

pub mod bootstrap;
pub mod context;
pub mod device;
pub mod error;
pub mod events;
pub mod monitor;
pub mod order;
pub mod osc;
pub mod playback;
pub mod protocol_constants;
pub mod runtime;
pub mod state;
pub mod status;
pub mod utils;

// Re-export commonly used types at the crate root
pub use bootstrap::{bootstrap_session, OrderPlan, SessionServices};
pub use context::{SessionContext, VideoTarget};
pub use error::{CuelabError, CuelabResult, ErrorCode};
pub use events::{
    EventEmitter, LoggingEventEmitter, NetworkEvent, NoopEventEmitter, PlaybackEvent, SessionEvent,
};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::{Config, RandomizationMode};
pub use status::StatusChannel;
pub use utils::now_millis;

// Re-export protocol types
pub use osc::{DecodeError, OscArg, OscMessage, OscSender, PeerAddr, UdpOscSender};

// Re-export device types
pub use device::video::{TableError, VideoAction, VideoBackend};

// Re-export playback types
pub use playback::{
    MushraSession, PageItem, PlaybackState, Player, PlayerRegistry, StimulusSpec, TrialPage,
};

// Re-export order types
pub use order::{balanced_latin_square, order_from_file, OrderError, OrderRow, OrderSet};

// Re-export monitor types
pub use monitor::{ConnectivityMonitor, ReachabilityProbe, TcpProbe};
