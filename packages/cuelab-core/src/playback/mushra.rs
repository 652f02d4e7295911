//! Comparative multi-stimulus controller.
//!
//! A MUSHRA session wraps one reference player plus N alternatives over a
//! private registry scope: starting any member displaces whichever other
//! member is audible; players outside the session are untouched. Rating
//! sliders unlock once the reference has been heard at least once; the loop
//! toggle is only interactable while the whole session is silent.

use std::sync::Arc;

use parking_lot::Mutex;

use super::player::Player;
use super::registry::PlayerRegistry;
use super::types::StimulusSpec;
use crate::context::SessionContext;
use crate::device::audio;
use crate::protocol_constants::{ACTION_LOOP_OFF, ACTION_LOOP_ON};

struct MushraInner {
    ratings: Vec<u8>,
    loop_enabled: bool,
}

/// One reference + N alternatives, mutually exclusive within the session.
pub struct MushraSession {
    ctx: Arc<SessionContext>,
    registry: PlayerRegistry,
    reference: Arc<Player>,
    alternatives: Vec<Arc<Player>>,
    inner: Mutex<MushraInner>,
}

impl MushraSession {
    /// Builds the session's players from the reference and alternative specs.
    #[must_use]
    pub fn new(
        ctx: Arc<SessionContext>,
        reference_spec: StimulusSpec,
        alternative_specs: Vec<StimulusSpec>,
    ) -> Self {
        let registry = PlayerRegistry::new();

        let reference = Player::new(reference_spec, ctx.clone());
        registry.register(reference.clone());

        let alternatives: Vec<Arc<Player>> = alternative_specs
            .into_iter()
            .map(|spec| {
                let player = Player::new(spec, ctx.clone());
                registry.register(player.clone());
                player
            })
            .collect();

        // Grading starts from the top anchor and is pulled down.
        let ratings = vec![100; alternatives.len()];

        Self {
            ctx,
            registry,
            reference,
            alternatives,
            inner: Mutex::new(MushraInner {
                ratings,
                loop_enabled: false,
            }),
        }
    }

    /// The shared reference player.
    #[must_use]
    pub fn reference(&self) -> &Arc<Player> {
        &self.reference
    }

    /// The alternative players, in presentation order.
    #[must_use]
    pub fn alternatives(&self) -> &[Arc<Player>] {
        &self.alternatives
    }

    /// All players of the session (reference first).
    #[must_use]
    pub fn players(&self) -> Vec<Arc<Player>> {
        let mut players = vec![self.reference.clone()];
        players.extend(self.alternatives.iter().cloned());
        players
    }

    /// True while any member of the session is audible.
    #[must_use]
    pub fn any_playing(&self) -> bool {
        self.registry.any_playing()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Playback
    // ─────────────────────────────────────────────────────────────────────

    /// Plays the reference, displacing whatever session member is audible.
    pub fn play_reference(&self) {
        self.reference.play(&self.registry);
    }

    /// Plays alternative `index`, displacing whatever session member is
    /// audible (including the reference).
    pub fn play_alternative(&self, index: usize) {
        if let Some(player) = self.alternatives.get(index) {
            player.play(&self.registry);
        } else {
            log::warn!("[Mushra] no alternative at index {}", index);
        }
    }

    /// Stops whichever member is audible or paused.
    pub fn stop_all(&self) {
        for player in self.players() {
            player.stop();
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Ratings
    // ─────────────────────────────────────────────────────────────────────

    /// Whether the rating sliders are interactable: the reference must have
    /// been heard at least once.
    #[must_use]
    pub fn sliders_enabled(&self) -> bool {
        self.reference.played_once()
    }

    /// Sets the rating for alternative `index`, clamped to 0..=100.
    ///
    /// Returns false (and changes nothing) while the sliders are still
    /// locked or the index is out of range.
    pub fn set_rating(&self, index: usize, rating: u8) -> bool {
        if !self.sliders_enabled() {
            return false;
        }
        let mut inner = self.inner.lock();
        match inner.ratings.get_mut(index) {
            Some(slot) => {
                *slot = rating.min(100);
                true
            }
            None => false,
        }
    }

    /// Current ratings, one per alternative, in presentation order.
    #[must_use]
    pub fn ratings(&self) -> Vec<u8> {
        self.inner.lock().ratings.clone()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Loop toggle
    // ─────────────────────────────────────────────────────────────────────

    /// Whether the loop toggle is interactable: only while the whole
    /// session is silent.
    #[must_use]
    pub fn loop_toggle_enabled(&self) -> bool {
        !self.registry.any_playing()
    }

    /// Current loop state.
    #[must_use]
    pub fn loop_enabled(&self) -> bool {
        self.inner.lock().loop_enabled
    }

    /// Flips the loop state, emitting the device's loop on/off action code.
    ///
    /// Returns false (and sends nothing) while a session member is audible.
    pub fn set_loop(&self, enabled: bool) -> bool {
        if !self.loop_toggle_enabled() {
            return false;
        }
        self.inner.lock().loop_enabled = enabled;
        let code = if enabled { ACTION_LOOP_ON } else { ACTION_LOOP_OFF };
        self.ctx.send_audio(&audio::action(code));
        true
    }
}
