//! Connectivity monitor for the configured peers.
//!
//! Periodically probes each peer's reachability with a short timeout and
//! emits [`NetworkEvent::PeerLost`] exactly once per loss transition (and
//! [`NetworkEvent::PeerRestored`] on recovery). The monitor is advisory
//! only: it never retries faster than its interval and never attempts any
//! reconnection itself. It shares nothing mutable with the players beyond
//! the read-only peer addresses.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::events::{EventEmitter, NetworkEvent};
use crate::osc::PeerAddr;
use crate::runtime::TaskSpawner;
use crate::status::StatusChannel;
use crate::utils::now_millis;

/// One reachability check against one peer.
///
/// Injectable so tests can script loss and recovery.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// True when the peer looks reachable within `timeout`.
    async fn probe(&self, peer: PeerAddr, timeout: Duration) -> bool;
}

/// Default probe: a TCP connect attempt.
///
/// The control protocol itself is connectionless and gives no delivery
/// signal, so the probe asks whether the host is there at all. A refused
/// connection proves a live host (the port just isn't TCP) and counts as
/// reachable; only timeouts and unreachable-network errors count as loss.
pub struct TcpProbe;

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn probe(&self, peer: PeerAddr, timeout: Duration) -> bool {
        let addr = SocketAddr::from(peer);
        match tokio::time::timeout(timeout, tokio::net::TcpStream::connect(addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => e.kind() == std::io::ErrorKind::ConnectionRefused,
            Err(_) => false,
        }
    }
}

/// Periodic reachability watchdog over the configured peers.
pub struct ConnectivityMonitor {
    peers: Vec<PeerAddr>,
    interval: Duration,
    probe_timeout: Duration,
    probe: Arc<dyn ReachabilityProbe>,
    emitter: Arc<dyn EventEmitter>,
    status: StatusChannel,
    cancel: CancellationToken,
}

impl ConnectivityMonitor {
    /// Creates a monitor with the default TCP probe.
    #[must_use]
    pub fn new(
        peers: Vec<PeerAddr>,
        interval: Duration,
        probe_timeout: Duration,
        emitter: Arc<dyn EventEmitter>,
        status: StatusChannel,
    ) -> Self {
        Self::with_probe(peers, interval, probe_timeout, Arc::new(TcpProbe), emitter, status)
    }

    /// Creates a monitor with an injected probe.
    #[must_use]
    pub fn with_probe(
        peers: Vec<PeerAddr>,
        interval: Duration,
        probe_timeout: Duration,
        probe: Arc<dyn ReachabilityProbe>,
        emitter: Arc<dyn EventEmitter>,
        status: StatusChannel,
    ) -> Self {
        Self {
            peers,
            interval,
            probe_timeout,
            probe,
            emitter,
            status,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the probe loop when cancelled.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawns the probe loop.
    ///
    /// Every peer starts out assumed reachable; the first failed probe
    /// emits the loss event, further failures stay silent until the peer
    /// recovers.
    pub fn spawn(&self, spawner: &Arc<dyn TaskSpawner>) {
        let peers = self.peers.clone();
        let interval = self.interval;
        let probe_timeout = self.probe_timeout;
        let probe = Arc::clone(&self.probe);
        let emitter = Arc::clone(&self.emitter);
        let status = self.status.clone();
        let cancel = self.cancel.clone();

        spawner.spawn_task(async move {
            let mut reachable: HashMap<PeerAddr, bool> =
                peers.iter().map(|p| (*p, true)).collect();
            log::debug!(
                "[Monitor] watching {} peer(s) every {:?}",
                peers.len(),
                interval
            );

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }

                // Probe all peers concurrently; one slow peer must not delay
                // the verdict on the others
                let results = futures::future::join_all(
                    peers.iter().map(|peer| probe.probe(*peer, probe_timeout)),
                )
                .await;

                for (peer, up) in peers.iter().zip(results) {
                    let was_up = reachable.insert(*peer, up).unwrap_or(true);

                    if was_up && !up {
                        log::warn!("[Monitor] peer {} became unreachable", peer);
                        emitter.emit_network(NetworkEvent::PeerLost {
                            peer: *peer,
                            timestamp: now_millis(),
                        });
                        status.connection_lost();
                    } else if !was_up && up {
                        log::info!("[Monitor] peer {} is reachable again", peer);
                        emitter.emit_network(NetworkEvent::PeerRestored {
                            peer: *peer,
                            timestamp: now_millis(),
                        });
                    }
                }
            }

            log::debug!("[Monitor] probe loop stopped");
        });
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
