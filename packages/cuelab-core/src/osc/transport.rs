//! UDP transport for OSC messages.
//!
//! One reusable abstraction serves all three remote peers (audio engine,
//! video engine, monitoring channel):
//!
//! - [`OscSender`]: fire-and-forget outbound datagrams. Sends are
//!   synchronous but non-blocking; a failed send degrades to a logged
//!   warning and never reaches the caller, so playback state can always
//!   advance locally even when a peer is down.
//! - [`OscReceiver`]: binds a listening port once and runs a dedicated
//!   receive loop per bound port, dispatching each decoded datagram through
//!   an [`OscDispatcher`]. Dispatch happens on the receive task; handlers
//!   must only do non-blocking shared-state updates.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use socket2::{Domain, Protocol, Socket, Type};
use tokio_util::sync::CancellationToken;

use super::codec::{decode, encode, OscMessage};
use crate::protocol_constants::MAX_DATAGRAM_SIZE;
use crate::runtime::TaskSpawner;

/// Address of one external device (audio engine, video engine, monitor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerAddr {
    /// IP literal of the peer.
    pub host: IpAddr,
    /// UDP port the peer listens on.
    pub port: u16,
}

impl PeerAddr {
    /// Creates a peer address.
    #[must_use]
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self { host, port }
    }
}

impl From<PeerAddr> for SocketAddr {
    fn from(peer: PeerAddr) -> Self {
        SocketAddr::new(peer.host, peer.port)
    }
}

impl std::fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Outbound message sink.
///
/// Object-safe and infallible: implementations swallow transport failures
/// (after logging them) so callers never block or branch on network state.
/// The playback tests substitute a recording implementation.
pub trait OscSender: Send + Sync {
    /// Sends one message to `peer`, best-effort.
    fn send(&self, peer: PeerAddr, msg: &OscMessage);
}

/// Real UDP sender over a single unconnected, non-blocking socket.
pub struct UdpOscSender {
    socket: std::net::UdpSocket,
}

impl UdpOscSender {
    /// Binds the outbound socket (ephemeral port, any interface).
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be created or bound.
    pub fn bind() -> std::io::Result<Self> {
        let socket = std::net::UdpSocket::bind(("0.0.0.0", 0))?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket })
    }

    /// Wraps the sender in an `Arc<dyn OscSender>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be created or bound.
    pub fn arc() -> std::io::Result<Arc<dyn OscSender>> {
        Ok(Arc::new(Self::bind()?))
    }
}

impl OscSender for UdpOscSender {
    fn send(&self, peer: PeerAddr, msg: &OscMessage) {
        let wire = encode(msg);
        match self.socket.send_to(&wire, SocketAddr::from(peer)) {
            Ok(_) => log::trace!("[Osc] -> {}: {}", peer, msg),
            Err(e) => log::warn!("[Osc] send to {} failed ({}): {}", peer, msg.addr, e),
        }
    }
}

/// Handler invoked for a dispatched inbound message.
pub type MessageHandler = Arc<dyn Fn(&OscMessage) + Send + Sync>;

/// Routes inbound messages to registered handlers by address.
///
/// Exact-address handlers win over prefix handlers; among prefix handlers
/// the longest registered prefix wins. Unroutable messages are dropped with
/// a trace log; inbound traffic from a DAW includes plenty of addresses the
/// session doesn't care about.
#[derive(Default)]
pub struct OscDispatcher {
    exact: DashMap<String, MessageHandler>,
    prefixes: DashMap<String, MessageHandler>,
}

impl OscDispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for one exact address.
    pub fn on_exact(&self, addr: impl Into<String>, handler: MessageHandler) {
        self.exact.insert(addr.into(), handler);
    }

    /// Registers a handler for every address starting with `prefix`.
    pub fn on_prefix(&self, prefix: impl Into<String>, handler: MessageHandler) {
        self.prefixes.insert(prefix.into(), handler);
    }

    /// Dispatches one decoded message.
    pub fn dispatch(&self, msg: &OscMessage) {
        if let Some(handler) = self.exact.get(&msg.addr) {
            handler(msg);
            return;
        }

        let mut best: Option<(usize, MessageHandler)> = None;
        for entry in self.prefixes.iter() {
            if msg.addr.starts_with(entry.key().as_str()) {
                let len = entry.key().len();
                if best.as_ref().map_or(true, |(best_len, _)| len > *best_len) {
                    best = Some((len, entry.value().clone()));
                }
            }
        }

        match best {
            Some((_, handler)) => handler(msg),
            None => log::trace!("[Osc] no handler for {}", msg.addr),
        }
    }
}

/// Bound inbound UDP port with its receive loop.
pub struct OscReceiver {
    socket: Arc<tokio::net::UdpSocket>,
    local_addr: SocketAddr,
    cancel: CancellationToken,
}

impl OscReceiver {
    /// Binds the listening port (0 = ephemeral).
    ///
    /// SO_REUSEADDR is set before bind so the session can rebind quickly
    /// after a restart.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be bound.
    pub fn bind(port: u16) -> std::io::Result<Self> {
        let bind_addr: SocketAddr = SocketAddr::new(IpAddr::from([0, 0, 0, 0]), port);

        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        if let Err(e) = socket.set_reuse_address(true) {
            log::warn!("[Osc] failed to set SO_REUSEADDR on port {}: {}", port, e);
        }
        socket.set_nonblocking(true)?;
        socket.bind(&bind_addr.into())?;

        let std_socket: std::net::UdpSocket = socket.into();
        let local_addr = std_socket.local_addr()?;
        let socket = tokio::net::UdpSocket::from_std(std_socket)?;

        Ok(Self {
            socket: Arc::new(socket),
            local_addr,
            cancel: CancellationToken::new(),
        })
    }

    /// The actually bound address (useful when port 0 was requested).
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Token that stops the receive loop when cancelled.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawns the receive loop.
    ///
    /// One loop per bound port. Malformed datagrams are dropped with a
    /// warning; socket errors are logged and the loop keeps running. The
    /// loop ends when the cancellation token fires.
    pub fn spawn(&self, spawner: &Arc<dyn TaskSpawner>, dispatcher: Arc<OscDispatcher>) {
        let socket = Arc::clone(&self.socket);
        let cancel = self.cancel.clone();
        let local = self.local_addr;

        spawner.spawn_task(async move {
            let mut buf = [0u8; MAX_DATAGRAM_SIZE];
            log::debug!("[Osc] receive loop started on {}", local);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = socket.recv_from(&mut buf) => match received {
                        Ok((len, src)) => match decode(&buf[..len]) {
                            Ok(msg) => {
                                log::trace!("[Osc] <- {}: {}", src, msg);
                                dispatcher.dispatch(&msg);
                            }
                            Err(e) => {
                                log::warn!("[Osc] dropped malformed datagram from {}: {}", src, e);
                            }
                        },
                        Err(e) => {
                            log::warn!("[Osc] recv error on {}: {}", local, e);
                        }
                    }
                }
            }

            log::debug!("[Osc] receive loop on {} stopped", local);
        });
    }
}

impl Drop for OscReceiver {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
