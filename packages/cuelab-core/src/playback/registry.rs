//! Session-owned player registry.
//!
//! Players never hold owning pointers to each other; displacement and
//! crossfade-partner discovery go through the registry that owns them, so
//! teardown order is irrelevant. Each scope that enforces mutual exclusion
//! (a trial page's standalone players, or one MUSHRA session) owns exactly
//! one registry, which is also what confines MUSHRA displacement to the
//! session's own player set.

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use super::player::Player;
use super::types::PlaybackState;

/// Identity of a player within its registry.
pub type PlayerId = Uuid;

/// The outcome of a displacement scan, driving the caller's send sequence.
pub enum Displacement {
    /// Nothing else was audible.
    None,
    /// A non-partner was force-stopped (its stop datagrams are already out).
    Stopped,
    /// A crossfade partner is still audible. Per the hand-off sequencing
    /// rule the incoming player marks itself playing first, then silences
    /// the partner via [`Player::displace_silently`].
    Crossfade {
        /// The still-playing partner.
        partner: Arc<Player>,
    },
}

/// Id → player map for one mutual-exclusion scope.
#[derive(Default)]
pub struct PlayerRegistry {
    players: DashMap<PlayerId, Arc<Player>>,
}

impl PlayerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a player to the scope.
    pub fn register(&self, player: Arc<Player>) {
        self.players.insert(player.id(), player);
    }

    /// Removes a player from the scope.
    pub fn remove(&self, id: PlayerId) -> Option<Arc<Player>> {
        self.players.remove(&id).map(|(_, p)| p)
    }

    /// Looks a player up by id.
    #[must_use]
    pub fn get(&self, id: PlayerId) -> Option<Arc<Player>> {
        self.players.get(&id).map(|r| Arc::clone(r.value()))
    }

    /// All players currently in the scope.
    #[must_use]
    pub fn players(&self) -> Vec<Arc<Player>> {
        self.players.iter().map(|r| Arc::clone(r.value())).collect()
    }

    /// Number of players in the scope.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// True when the scope is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// True while any player in the scope is audible.
    #[must_use]
    pub fn any_playing(&self) -> bool {
        self.players
            .iter()
            .any(|r| r.value().state() == PlaybackState::Playing)
    }

    /// Clears whatever else is audible so `incoming` can start.
    ///
    /// Non-partners are force-stopped on the spot (audio stop, plus a video
    /// stop when their video ref differs from the incoming player's).
    /// A crossfade partner (both players eligible) is returned instead,
    /// because the hand-off must mark the incoming player as playing before
    /// the partner is silenced.
    pub fn displace_for(&self, incoming: &Player) -> Displacement {
        let audible: Vec<Arc<Player>> = self
            .players
            .iter()
            .filter(|r| {
                *r.key() != incoming.id() && r.value().state() == PlaybackState::Playing
            })
            .map(|r| Arc::clone(r.value()))
            .collect();

        // Outside a hand-off window the scope never has two audible players.
        debug_assert!(
            audible.len() <= 1,
            "{} players audible in one scope",
            audible.len()
        );

        let mut outcome = Displacement::None;
        for other in audible {
            if incoming.spec().crossfade_eligible && other.spec().crossfade_eligible {
                outcome = Displacement::Crossfade { partner: other };
            } else {
                let video_differs = other.spec().video_ref != incoming.spec().video_ref;
                other.force_stop_displaced(video_differs);
                outcome = Displacement::Stopped;
            }
        }
        outcome
    }
}
