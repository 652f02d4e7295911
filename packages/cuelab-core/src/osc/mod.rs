//! OSC wire protocol: pure codec plus UDP transport.
//!
//! - [`codec`]: encode/decode of OSC 1.0 datagrams (no I/O)
//! - [`transport`]: fire-and-forget sender, per-port receive loop, and the
//!   address dispatcher

pub mod codec;
pub mod transport;

pub use codec::{decode, encode, DecodeError, OscArg, OscMessage};
pub use transport::{
    MessageHandler, OscDispatcher, OscReceiver, OscSender, PeerAddr, UdpOscSender,
};
