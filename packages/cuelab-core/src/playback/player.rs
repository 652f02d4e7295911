//! The per-stimulus playback state machine.
//!
//! One [`Player`] owns one stimulus's lifecycle: Idle → Playing ⇄ Paused →
//! Stopped → (re-enter Playing). Transitions send best-effort datagrams to
//! the audio and video engines and always update local state, so the
//! machine never desyncs from the host UI when a peer is down.
//!
//! Transitions are invoked from host-triggered events and run to completion
//! before the next is accepted; the one cross-player mutation is the
//! crossfade hand-off, sequenced incoming-player-first through
//! [`PlayerRegistry::displace_for`].

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use uuid::Uuid;

use super::registry::{Displacement, PlayerId, PlayerRegistry};
use super::timer::AdvanceTimer;
use super::types::{DurationRecord, PlaybackState, StimulusSpec, TransportEcho};
use crate::context::SessionContext;
use crate::device::video::{resume_template, VideoAction};
use crate::device::{audio, video};
use crate::events::PlaybackEvent;
use crate::utils::now_millis;

struct PlayerInner {
    state: PlaybackState,
    /// Start of the currently open playing interval.
    started_at: Option<Instant>,
    /// Closed playing intervals, append-only.
    durations: Vec<DurationRecord>,
    /// Experimenter-facing log, one line per closed interval.
    duration_log: Vec<String>,
    play_enabled: bool,
    pause_enabled: bool,
    stop_enabled: bool,
    played_once: bool,
}

/// State machine for one stimulus.
pub struct Player {
    id: PlayerId,
    spec: StimulusSpec,
    ctx: Arc<SessionContext>,
    timer: Option<AdvanceTimer>,
    inner: Mutex<PlayerInner>,
}

impl Player {
    /// Creates a player bound to one stimulus spec.
    #[must_use]
    pub fn new(spec: StimulusSpec, ctx: Arc<SessionContext>) -> Arc<Self> {
        let timer = spec
            .auto_advance_ms
            .map(|ms| AdvanceTimer::new(std::time::Duration::from_millis(ms)));
        Arc::new(Self {
            id: Uuid::new_v4(),
            spec,
            ctx,
            timer,
            inner: Mutex::new(PlayerInner {
                state: PlaybackState::Idle,
                started_at: None,
                durations: Vec::new(),
                duration_log: Vec::new(),
                play_enabled: true,
                pause_enabled: false,
                stop_enabled: false,
                played_once: false,
            }),
        })
    }

    /// Registry identity.
    #[must_use]
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// The stimulus this player drives.
    #[must_use]
    pub fn spec(&self) -> &StimulusSpec {
        &self.spec
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.inner.lock().state
    }

    /// Closed playing intervals so far.
    #[must_use]
    pub fn durations(&self) -> Vec<DurationRecord> {
        self.inner.lock().durations.clone()
    }

    /// Experimenter-facing duration log lines.
    #[must_use]
    pub fn duration_log(&self) -> Vec<String> {
        self.inner.lock().duration_log.clone()
    }

    /// Whether the play affordance is currently interactable.
    #[must_use]
    pub fn play_enabled(&self) -> bool {
        self.inner.lock().play_enabled
    }

    /// Whether the pause affordance is currently interactable.
    #[must_use]
    pub fn pause_enabled(&self) -> bool {
        self.inner.lock().pause_enabled
    }

    /// Whether the stop affordance is currently interactable.
    #[must_use]
    pub fn stop_enabled(&self) -> bool {
        self.inner.lock().stop_enabled
    }

    /// True once the stimulus has been audible at least once.
    #[must_use]
    pub fn played_once(&self) -> bool {
        self.inner.lock().played_once
    }

    // ─────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────

    /// Starts or resumes the stimulus.
    ///
    /// `registry` is the mutual-exclusion scope this player lives in;
    /// whatever else is audible there is displaced first (force-stopped, or
    /// silently faded when both sides are crossfade-eligible).
    pub fn play(&self, registry: &PlayerRegistry) {
        match self.state() {
            PlaybackState::Playing => {
                log::debug!("[Player] marker {}: play ignored, already playing", self.spec.start_marker);
            }
            PlaybackState::Paused => self.resume(),
            PlaybackState::Idle | PlaybackState::Stopped => self.start(registry),
        }
    }

    /// Fresh start from Idle/Stopped.
    fn start(&self, registry: &PlayerRegistry) {
        let displacement = registry.displace_for(self);

        // Hand-off sequencing: this player is marked audible before the
        // partner is silenced, so the scope never has neither player marked.
        self.mark_playing();

        let partner = match displacement {
            Displacement::Crossfade { partner } => {
                partner.displace_silently();
                Some(partner)
            }
            _ => None,
        };

        // Mutes are re-sent on every play: another player may have remapped
        // them since the last time this stimulus was audible.
        self.send_track_mutes();
        self.send_video_start();

        // A hand-off landing on the marker the faded partner just left can
        // keep the transport rolling, but only when the remote echo has
        // positively confirmed a stopped transport; an unconfirmed echo gets
        // the full jump-stop-play sequence.
        let same_marker_fast_path = partner
            .as_ref()
            .is_some_and(|p| p.spec.start_marker == self.spec.start_marker)
            && self.ctx.audio_echo() == TransportEcho::Stopped;

        if same_marker_fast_path {
            self.ctx.send_audio(&audio::play(true));
        } else {
            self.ctx
                .send_audio(&audio::action(audio::marker_action(self.spec.start_marker)));
            self.ctx.send_audio(&audio::stop());
            self.ctx.send_audio(&audio::play(true));
        }

        self.arm_timer_full();
        self.emit_started();
    }

    /// Resume from Paused: unpause-equivalents instead of a fresh play.
    fn resume(&self) {
        self.ctx.send_audio(&audio::pause());
        if let Some(template) = resume_template(self.ctx.video_backend()) {
            if self.spec.video_ref.is_some() {
                self.ctx.send_video(&template.message(None));
            }
        }

        self.mark_playing();
        self.resume_timer();
        self.emit_started();
    }

    /// Pauses an audible stimulus.
    pub fn pause(&self) {
        if self.state() != PlaybackState::Playing {
            log::debug!("[Player] marker {}: pause ignored while {}", self.spec.start_marker, self.state());
            return;
        }

        self.ctx.send_audio(&audio::pause());
        if self.spec.video_ref.is_some() {
            if let Ok(msg) = video::command(self.ctx.video_backend(), VideoAction::Pause, None) {
                self.ctx.send_video(&msg);
            }
        }

        if let Some(timer) = &self.timer {
            timer.pause();
        }

        {
            let mut inner = self.inner.lock();
            self.close_interval(&mut inner);
            inner.state = PlaybackState::Paused;
            inner.play_enabled = true;
            inner.pause_enabled = false;
            inner.stop_enabled = true;
        }

        self.ctx.emitter.emit_playback(PlaybackEvent::Paused {
            player_id: self.id,
            timestamp: now_millis(),
        });
    }

    /// Stops the stimulus.
    ///
    /// Audio always gets the stop command; video only when the player was
    /// actually audible (a merely paused video keeps its frame). Any
    /// scheduled auto-advance firing is cancelled; cancellation itself
    /// sends nothing.
    pub fn stop(&self) {
        let state = self.state();
        if state != PlaybackState::Playing && state != PlaybackState::Paused {
            log::debug!("[Player] marker {}: stop ignored while {}", self.spec.start_marker, state);
            return;
        }

        self.ctx.send_audio(&audio::stop());
        if state == PlaybackState::Playing {
            self.send_video_stop();
        }

        self.finish_stopped();
    }

    /// Displacement by a non-partner: full stop, with the video stop decided
    /// by the incoming player's video ref.
    pub(crate) fn force_stop_displaced(&self, send_video_stop: bool) {
        let state = self.state();
        if state != PlaybackState::Playing {
            return;
        }

        self.ctx.send_audio(&audio::stop());
        if send_video_stop {
            self.send_video_stop();
        }

        self.finish_stopped();
    }

    /// Crossfade hand-off: transition to Stopped without sending anything,
    /// so the remote transport is not audibly restarted.
    pub(crate) fn displace_silently(&self) {
        if self.state() != PlaybackState::Playing {
            return;
        }
        self.finish_stopped();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    /// Shared tail of every path into Stopped: timer, interval, affordances.
    fn finish_stopped(&self) {
        if let Some(timer) = &self.timer {
            timer.cancel();
        }

        let seconds = {
            let mut inner = self.inner.lock();
            let seconds = self.close_interval(&mut inner);
            inner.state = PlaybackState::Stopped;
            inner.pause_enabled = false;
            inner.stop_enabled = false;
            inner.play_enabled = !(self.ctx.play_once && inner.played_once);
            seconds
        };

        self.ctx.emitter.emit_playback(PlaybackEvent::Stopped {
            player_id: self.id,
            seconds,
            timestamp: now_millis(),
        });
    }

    fn mark_playing(&self) {
        let mut inner = self.inner.lock();
        inner.state = PlaybackState::Playing;
        inner.started_at = Some(Instant::now());
        inner.played_once = true;
        inner.play_enabled = false;
        inner.pause_enabled = true;
        inner.stop_enabled = true;
    }

    /// Closes the open playing interval, if any, appending its record and
    /// log line. Returns the elapsed seconds (0.0 when nothing was open).
    fn close_interval(&self, inner: &mut PlayerInner) -> f64 {
        let Some(started_at) = inner.started_at.take() else {
            return 0.0;
        };
        let seconds = started_at.elapsed().as_secs_f64();
        let record = DurationRecord::close(seconds);
        log::info!("[Player] {}", record.log_line(self.spec.start_marker));
        inner.duration_log.push(record.log_line(self.spec.start_marker));
        inner.durations.push(record);
        seconds
    }

    fn send_track_mutes(&self) {
        for track in 1..=self.ctx.track_count() as u32 {
            let audible = self.spec.tracks.contains(&track);
            self.ctx.send_audio(&audio::track_mute(track, !audible));
        }
    }

    fn send_video_start(&self) {
        let Some(video_ref) = &self.spec.video_ref else {
            return;
        };
        let backend = self.ctx.video_backend();
        if let Ok(msg) = video::command(backend, VideoAction::Select, Some(video_ref)) {
            self.ctx.send_video(&msg);
        }
        if let Ok(msg) = video::command(backend, VideoAction::Play, Some(video_ref)) {
            self.ctx.send_video(&msg);
        }
    }

    fn send_video_stop(&self) {
        if self.spec.video_ref.is_none() {
            return;
        }
        if let Ok(msg) = video::command(self.ctx.video_backend(), VideoAction::Stop, None) {
            self.ctx.send_video(&msg);
        }
    }

    fn arm_timer_full(&self) {
        let Some(timer) = &self.timer else { return };
        timer.arm(&self.ctx.spawner, self.elapsed_handler());
    }

    fn resume_timer(&self) {
        let Some(timer) = &self.timer else { return };
        timer.resume(&self.ctx.spawner, self.elapsed_handler());
    }

    fn elapsed_handler(&self) -> super::timer::ElapsedHandler {
        let emitter = Arc::clone(&self.ctx.emitter);
        let player_id = self.id;
        Arc::new(move || {
            emitter.emit_playback(PlaybackEvent::AdvanceElapsed {
                player_id,
                timestamp: now_millis(),
            });
        })
    }

    fn emit_started(&self) {
        self.ctx.emitter.emit_playback(PlaybackEvent::Started {
            player_id: self.id,
            marker: self.spec.start_marker,
            timestamp: now_millis(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::{audio_peer, harness, harness_with, video_peer};
    use crate::context::VideoTarget;
    use crate::device::video::VideoBackend;
    use crate::osc::OscMessage;
    use crate::protocol_constants::DEFAULT_TRACK_COUNT;

    fn mute_messages(sent: &[OscMessage]) -> Vec<String> {
        sent.iter()
            .filter(|m| m.addr.starts_with("/track/"))
            .map(|m| m.to_string())
            .collect()
    }

    fn action_codes(sent: &[OscMessage]) -> Vec<i32> {
        sent.iter()
            .filter(|m| m.addr == "/action")
            .filter_map(|m| m.int_arg())
            .collect()
    }

    #[test]
    fn fresh_play_sends_mutes_for_every_track_then_jump_stop_play() {
        let h = harness();
        let registry = PlayerRegistry::new();
        let player = Player::new(StimulusSpec::new(3, vec![1, 4]), h.ctx.clone());
        registry.register(player.clone());

        player.play(&registry);

        assert_eq!(player.state(), PlaybackState::Playing);
        let sent = h.sender.sent_to(audio_peer());

        // One mute per track 1..=N, every play
        let mutes = mute_messages(&sent);
        assert_eq!(mutes.len(), DEFAULT_TRACK_COUNT);
        assert!(mutes.contains(&"/track/1/mute 0".to_string()));
        assert!(mutes.contains(&"/track/4/mute 0".to_string()));
        assert!(mutes.contains(&"/track/2/mute 1".to_string()));

        // Marker jump, then stop, then play
        assert_eq!(action_codes(&sent), vec![40163]);
        let tail: Vec<String> = sent.iter().rev().take(2).rev().map(|m| m.to_string()).collect();
        assert_eq!(tail, vec!["/stop 1".to_string(), "/play 1".to_string()]);
    }

    #[test]
    fn displacement_stops_non_partner_with_one_duration_record() {
        let h = harness();
        let registry = PlayerRegistry::new();
        let a = Player::new(StimulusSpec::new(1, vec![1]), h.ctx.clone());
        let b = Player::new(StimulusSpec::new(2, vec![2]), h.ctx.clone());
        registry.register(a.clone());
        registry.register(b.clone());

        b.play(&registry);
        assert_eq!(b.state(), PlaybackState::Playing);
        h.sender.clear();

        a.play(&registry);

        assert_eq!(b.state(), PlaybackState::Stopped);
        assert_eq!(a.state(), PlaybackState::Playing);
        assert_eq!(b.durations().len(), 1, "displacement closes exactly one interval");

        // B's forced stop went out before A's sequence, and A still sends
        // mutes for every track
        let sent = h.sender.sent_to(audio_peer());
        assert_eq!(sent[0].to_string(), "/stop 1");
        assert_eq!(mute_messages(&sent).len(), DEFAULT_TRACK_COUNT);
    }

    #[test]
    fn crossfade_partner_is_silenced_without_datagrams() {
        let h = harness();
        let registry = PlayerRegistry::new();
        let a = Player::new(
            StimulusSpec::new(1, vec![1, 2]).with_crossfade(true),
            h.ctx.clone(),
        );
        let b = Player::new(
            StimulusSpec::new(2, vec![3, 4]).with_crossfade(true),
            h.ctx.clone(),
        );
        registry.register(a.clone());
        registry.register(b.clone());

        b.play(&registry);
        h.sender.clear();

        a.play(&registry);

        assert_eq!(b.state(), PlaybackState::Stopped);
        assert_eq!(a.state(), PlaybackState::Playing);
        assert_eq!(b.durations().len(), 1);

        let sent = h.sender.sent_to(audio_peer());
        // No marker jump for B; only A's own jump goes out
        assert_eq!(action_codes(&sent), vec![audio::marker_action(1)]);
        // B was not sent a stop of its own: the only /stop is part of A's
        // jump-stop-play sequence, after A's mutes
        let stop_positions: Vec<usize> = sent
            .iter()
            .enumerate()
            .filter(|(_, m)| m.addr == "/stop")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(stop_positions.len(), 1);
        assert!(stop_positions[0] > 0, "stop belongs to A's sequence, not a forced stop of B");
    }

    #[test]
    fn crossfade_same_marker_plays_alone_when_remote_confirmed_stopped() {
        let h = harness();
        let registry = PlayerRegistry::new();
        let a = Player::new(
            StimulusSpec::new(5, vec![1]).with_crossfade(true),
            h.ctx.clone(),
        );
        let b = Player::new(
            StimulusSpec::new(5, vec![2]).with_crossfade(true),
            h.ctx.clone(),
        );
        registry.register(a.clone());
        registry.register(b.clone());

        b.play(&registry);
        h.ctx.set_audio_echo(TransportEcho::Stopped);
        h.sender.clear();

        a.play(&registry);

        let sent = h.sender.sent_to(audio_peer());
        assert!(action_codes(&sent).is_empty(), "no marker jump on the fast path");
        assert!(sent.iter().all(|m| m.addr != "/stop"));
        assert_eq!(sent.last().unwrap().to_string(), "/play 1");
    }

    #[test]
    fn crossfade_same_marker_without_echo_takes_full_sequence() {
        let h = harness();
        let registry = PlayerRegistry::new();
        let a = Player::new(
            StimulusSpec::new(5, vec![1]).with_crossfade(true),
            h.ctx.clone(),
        );
        let b = Player::new(
            StimulusSpec::new(5, vec![2]).with_crossfade(true),
            h.ctx.clone(),
        );
        registry.register(a.clone());
        registry.register(b.clone());

        b.play(&registry);
        h.sender.clear();

        // Echo still Unknown: the ambiguous race resolves conservatively
        a.play(&registry);

        let sent = h.sender.sent_to(audio_peer());
        assert_eq!(action_codes(&sent), vec![audio::marker_action(5)]);
    }

    #[test]
    fn pause_and_resume_round_trip() {
        let h = harness();
        let registry = PlayerRegistry::new();
        let player = Player::new(StimulusSpec::new(2, vec![1]), h.ctx.clone());
        registry.register(player.clone());

        player.play(&registry);
        assert!(player.pause_enabled());

        player.pause();
        assert_eq!(player.state(), PlaybackState::Paused);
        assert_eq!(player.durations().len(), 1, "pause closes the interval");
        assert!(player.play_enabled());
        assert!(!player.pause_enabled());
        assert!(player.stop_enabled());

        h.sender.clear();
        player.play(&registry);
        assert_eq!(player.state(), PlaybackState::Playing);

        // Resume is an unpause toggle, not a fresh jump-stop-play
        let sent = h.sender.sent_to(audio_peer());
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to_string(), "/pause 1");
    }

    #[test]
    fn stop_from_paused_skips_video_stop() {
        let video = VideoTarget {
            peer: video_peer(),
            backend: VideoBackend::Vlc,
        };
        let h = harness_with(Some(video), false);
        let registry = PlayerRegistry::new();
        let player = Player::new(
            StimulusSpec::new(1, vec![1]).with_video("clip.mp4"),
            h.ctx.clone(),
        );
        registry.register(player.clone());

        player.play(&registry);
        player.pause();
        h.sender.clear();

        player.stop();

        assert_eq!(player.state(), PlaybackState::Stopped);
        // Audio stop went out, video got nothing (still frame keeps state)
        assert_eq!(h.sender.sent_to(audio_peer()).len(), 1);
        assert!(h.sender.sent_to(video_peer()).is_empty());
        // Paused interval was already closed; stop does not add another
        assert_eq!(player.durations().len(), 1);
    }

    #[test]
    fn stop_while_playing_stops_video_too() {
        let video = VideoTarget {
            peer: video_peer(),
            backend: VideoBackend::Vlc,
        };
        let h = harness_with(Some(video), false);
        let registry = PlayerRegistry::new();
        let player = Player::new(
            StimulusSpec::new(1, vec![1]).with_video("clip.mp4"),
            h.ctx.clone(),
        );
        registry.register(player.clone());

        player.play(&registry);
        h.sender.clear();
        player.stop();

        let video_sent = h.sender.sent_to(video_peer());
        assert_eq!(video_sent.len(), 1);
        assert_eq!(video_sent[0].addr, "/vlc_stop");
        assert!(player.play_enabled(), "play re-enables after stop");
        assert!(!player.stop_enabled());
    }

    #[test]
    fn play_once_locks_the_play_affordance_after_stop() {
        let h = harness_with(None, true);
        let registry = PlayerRegistry::new();
        let player = Player::new(StimulusSpec::new(1, vec![1]), h.ctx.clone());
        registry.register(player.clone());

        player.play(&registry);
        player.stop();

        assert_eq!(player.state(), PlaybackState::Stopped);
        assert!(!player.play_enabled(), "play_once keeps play locked");
    }

    #[test]
    fn displaced_video_stop_only_when_refs_differ() {
        let video = VideoTarget {
            peer: video_peer(),
            backend: VideoBackend::MadMapper,
        };
        let h = harness_with(Some(video), false);
        let registry = PlayerRegistry::new();
        let a = Player::new(
            StimulusSpec::new(1, vec![1]).with_video("scene"),
            h.ctx.clone(),
        );
        let b = Player::new(
            StimulusSpec::new(2, vec![2]).with_video("scene"),
            h.ctx.clone(),
        );
        registry.register(a.clone());
        registry.register(b.clone());

        b.play(&registry);
        h.sender.clear();
        a.play(&registry);

        // Same video ref: B's displacement must not stop the shared video.
        // The mapper's stop mapping is its /pause toggle, so no /pause may
        // appear; the only video traffic is A's own select + play.
        let video_sent = h.sender.sent_to(video_peer());
        assert!(video_sent.iter().all(|m| m.addr != "/pause"));
        assert!(video_sent[0].addr.starts_with("/cues/"));
    }

    #[test]
    fn unplayed_player_records_nothing() {
        let h = harness();
        let player = Player::new(StimulusSpec::new(1, vec![1]), h.ctx.clone());
        player.stop();
        assert_eq!(player.state(), PlaybackState::Idle);
        assert!(player.durations().is_empty());
        assert!(h.sender.sent.lock().is_empty());
    }

    #[test]
    fn started_events_are_emitted_with_marker() {
        let h = harness();
        let registry = PlayerRegistry::new();
        let player = Player::new(StimulusSpec::new(9, vec![1]), h.ctx.clone());
        registry.register(player.clone());

        player.play(&registry);
        player.stop();

        let events = h.emitter.playback.lock();
        assert!(matches!(
            events[0],
            PlaybackEvent::Started { marker: 9, .. }
        ));
        assert!(matches!(events[1], PlaybackEvent::Stopped { .. }));
    }
}
