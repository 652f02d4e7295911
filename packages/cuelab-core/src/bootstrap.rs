//! Service bootstrap: wiring the transport, echo handlers, trial orders
//! and the connectivity monitor into one [`SessionServices`] bundle.
//!
//! Everything that can fail fails here, before any page is shown: config
//! validation, command-table checks for the selected video backend,
//! order-file loading, socket binds. After bootstrap the session only does
//! best-effort sends and advisory probes.

use std::sync::Arc;

use crate::context::{SessionContext, VideoTarget};
use crate::device::video::{self, VideoAction, VideoBackend};
use crate::error::{CuelabError, CuelabResult};
use crate::events::EventEmitter;
use crate::monitor::ConnectivityMonitor;
use crate::order::{balanced_latin_square, order_from_file, OrderRow, OrderSet};
use crate::osc::{OscDispatcher, OscMessage, OscReceiver, UdpOscSender};
use crate::playback::types::TransportEcho;
use crate::protocol_constants::{
    AUDIO_PAUSE_ADDR, AUDIO_PLAY_ADDR, AUDIO_STOP_ADDR, AUDIO_TRACK_PREFIX,
};
use crate::runtime::TaskSpawner;
use crate::state::{Config, RandomizationMode};
use crate::status::StatusChannel;

/// Resolved trial-order source, validated at bootstrap.
pub enum OrderPlan {
    /// Pages keep their authored order.
    None,
    /// Squares are generated (and cached) per group size on demand.
    Balanced,
    /// Orders were loaded and validated from a file.
    File(OrderSet),
}

impl OrderPlan {
    /// The presentation order for one participant and one randomized group.
    ///
    /// Returns `None` when randomization is off (authored order applies) or
    /// the participant number is 0.
    #[must_use]
    pub fn order_for(&self, group_size: usize, participant: u32) -> Option<OrderRow> {
        match self {
            OrderPlan::None => None,
            OrderPlan::Balanced => {
                let squares = balanced_latin_square(group_size);
                crate::order::order_for_participant(&squares, participant).cloned()
            }
            OrderPlan::File(orders) => {
                if let Some(first) = orders.first() {
                    if first.len() != group_size {
                        log::warn!(
                            "[Order] file orders have {} positions, group has {}",
                            first.len(),
                            group_size
                        );
                    }
                }
                crate::order::order_for_participant(orders, participant).cloned()
            }
        }
    }
}

/// All long-lived services of one questionnaire session.
pub struct SessionServices {
    /// Shared context handed into players and pages.
    pub ctx: Arc<SessionContext>,
    /// Monitoring-peer notifications.
    pub status: StatusChannel,
    /// Validated trial-order source.
    pub orders: OrderPlan,
    receiver: OscReceiver,
    monitor: ConnectivityMonitor,
}

impl SessionServices {
    /// Stops the receive loop and the connectivity monitor.
    pub fn shutdown(&self) {
        self.receiver.cancel_token().cancel();
        self.monitor.cancel_token().cancel();
    }

    /// The actually bound receive port (useful when 0 was configured).
    #[must_use]
    pub fn receive_port(&self) -> u16 {
        self.receiver.local_addr().port()
    }
}

/// Checks that the selected backend maps every action the players send
/// unconditionally. Actions with documented fallbacks or per-stimulus
/// applicability are exempt.
fn validate_video_tables(backend: VideoBackend) -> CuelabResult<()> {
    if backend == VideoBackend::None {
        return Ok(());
    }
    for action in [VideoAction::Play, VideoAction::Pause, VideoAction::Stop] {
        video::resolve(backend, action)?;
    }
    Ok(())
}

/// Parses the track index out of an inbound `/track/{n}/...` address.
fn parse_track_index(addr: &str) -> Option<usize> {
    addr.strip_prefix(AUDIO_TRACK_PREFIX)?
        .split('/')
        .next()?
        .parse()
        .ok()
}

/// Registers the audio-device echo handlers on the dispatcher.
///
/// The DAW confirms transport changes with a float `1.0` on `/play`,
/// `/pause` and `/stop`, and its per-track traffic reveals the live track
/// count.
fn wire_audio_echoes(dispatcher: &OscDispatcher, ctx: &Arc<SessionContext>) {
    for (addr, echo) in [
        (AUDIO_PLAY_ADDR, TransportEcho::Playing),
        (AUDIO_PAUSE_ADDR, TransportEcho::Paused),
        (AUDIO_STOP_ADDR, TransportEcho::Stopped),
    ] {
        let ctx = Arc::clone(ctx);
        dispatcher.on_exact(
            addr,
            Arc::new(move |msg: &OscMessage| {
                if msg.float_arg() == Some(1.0) {
                    ctx.set_audio_echo(echo);
                }
            }),
        );
    }

    let ctx = Arc::clone(ctx);
    dispatcher.on_prefix(
        AUDIO_TRACK_PREFIX,
        Arc::new(move |msg: &OscMessage| {
            if let Some(index) = parse_track_index(&msg.addr) {
                ctx.observe_track_index(index);
            }
        }),
    );
}

/// Builds and starts all session services.
///
/// Must be called within a Tokio runtime context (the receive socket
/// registers with the runtime's reactor).
///
/// # Errors
///
/// Configuration inconsistencies, command-table misses for the selected
/// video backend, unreadable/invalid order files and socket bind failures
/// are all fatal here.
pub fn bootstrap_session(
    config: &Config,
    spawner: Arc<dyn TaskSpawner>,
    emitter: Arc<dyn EventEmitter>,
) -> CuelabResult<SessionServices> {
    config.validate().map_err(CuelabError::Configuration)?;
    validate_video_tables(config.video_backend)?;

    // Trial order must be known upfront; a bad file aborts the session
    // before the first page.
    let orders = match &config.randomization {
        RandomizationMode::None => OrderPlan::None,
        RandomizationMode::BalancedLatinSquare => OrderPlan::Balanced,
        RandomizationMode::FromFile { path } => OrderPlan::File(order_from_file(path)?),
    };

    let sender = UdpOscSender::arc().map_err(|e| CuelabError::Transport(e.to_string()))?;
    let receiver =
        OscReceiver::bind(config.receive_port).map_err(|e| CuelabError::Transport(e.to_string()))?;

    let video = config.video_peer.map(|peer| VideoTarget {
        peer,
        backend: config.video_backend,
    });

    let ctx = Arc::new(SessionContext::new(
        Arc::clone(&sender),
        Arc::clone(&spawner),
        Arc::clone(&emitter),
        config.audio_peer,
        video,
        config.track_count,
        config.play_once,
    ));

    let dispatcher = Arc::new(OscDispatcher::new());
    wire_audio_echoes(&dispatcher, &ctx);
    receiver.spawn(&spawner, dispatcher);

    let status = StatusChannel::new(Arc::clone(&sender), config.status_peer);

    let monitor = ConnectivityMonitor::new(
        config.monitored_peers(),
        std::time::Duration::from_secs(config.monitor_interval_secs),
        std::time::Duration::from_millis(config.probe_timeout_ms),
        Arc::clone(&emitter),
        status.clone(),
    );
    monitor.spawn(&spawner);

    log::info!(
        "[Bootstrap] session up: audio={}, video={}, receive_port={}, randomization={:?}",
        config.audio_peer,
        config
            .video_peer
            .map_or_else(|| "none".to_string(), |p| p.to_string()),
        receiver.local_addr().port(),
        config.randomization
    );

    Ok(SessionServices {
        ctx,
        status,
        orders,
        receiver,
        monitor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoopEventEmitter;
    use crate::osc::{OscSender, PeerAddr};
    use crate::runtime::TokioSpawner;
    use std::io::Write;
    use std::net::IpAddr;

    #[test]
    fn parse_track_index_extracts_leading_number() {
        assert_eq!(parse_track_index("/track/3/mute"), Some(3));
        assert_eq!(parse_track_index("/track/12/volume"), Some(12));
        assert_eq!(parse_track_index("/track/x/mute"), None);
        assert_eq!(parse_track_index("/master/volume"), None);
    }

    #[test]
    fn video_tables_validate_for_both_backends() {
        assert!(validate_video_tables(VideoBackend::MadMapper).is_ok());
        assert!(validate_video_tables(VideoBackend::Vlc).is_ok());
        assert!(validate_video_tables(VideoBackend::None).is_ok());
    }

    #[test]
    fn order_plan_balanced_assigns_wrapping_rows() {
        let plan = OrderPlan::Balanced;
        let first = plan.order_for(4, 1).unwrap();
        let wrapped = plan.order_for(4, 5).unwrap();
        assert_eq!(first, wrapped, "participant 5 of 4 rows wraps to row 0");
        assert!(plan.order_for(4, 0).is_none());
    }

    #[test]
    fn order_plan_none_defers_to_authored_order() {
        assert!(OrderPlan::None.order_for(4, 1).is_none());
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_bad_order_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "1,2,3\n9,9,9").unwrap();

        let config = Config {
            receive_port: 0,
            randomization: RandomizationMode::FromFile {
                path: file.path().to_path_buf(),
            },
            ..Default::default()
        };

        let result = bootstrap_session(
            &config,
            Arc::new(TokioSpawner::current()),
            Arc::new(NoopEventEmitter),
        );
        assert!(matches!(result, Err(CuelabError::Order(_))));
    }

    #[tokio::test]
    async fn bootstrap_rejects_invalid_config() {
        let config = Config {
            receive_port: 0,
            track_count: 0,
            ..Default::default()
        };
        let result = bootstrap_session(
            &config,
            Arc::new(TokioSpawner::current()),
            Arc::new(NoopEventEmitter),
        );
        assert!(matches!(result, Err(CuelabError::Configuration(_))));
    }

    #[tokio::test]
    async fn bootstrap_wires_echoes_and_track_learning() {
        let config = Config {
            receive_port: 0,
            ..Default::default()
        };
        let services = bootstrap_session(
            &config,
            Arc::new(TokioSpawner::current()),
            Arc::new(NoopEventEmitter),
        )
        .unwrap();

        let port = services.receive_port();
        let peer = PeerAddr::new(IpAddr::from([127, 0, 0, 1]), port);
        let sender = UdpOscSender::bind().unwrap();

        // DAW echoes a stopped transport and reveals track 12
        sender.send(peer, &crate::osc::OscMessage::new("/stop").arg(1.0f32));
        sender.send(peer, &crate::osc::OscMessage::new("/track/12/mute").arg(0));

        // Wait for the receive loop to apply both updates
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
        while std::time::Instant::now() < deadline {
            if services.ctx.audio_echo() == TransportEcho::Stopped
                && services.ctx.track_count() >= 12
            {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        assert_eq!(services.ctx.audio_echo(), TransportEcho::Stopped);
        assert_eq!(services.ctx.track_count(), 12);

        services.shutdown();
    }
}
