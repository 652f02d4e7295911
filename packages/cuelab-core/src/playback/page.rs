//! Trial page scope: the players and MUSHRA sessions of one visible page.
//!
//! The host resolves a page's stimulus specs and hands them over; the page
//! owns the mutual-exclusion scope for its standalone players, produces the
//! status-channel description and the per-stimulus duration report, and
//! performs the once-per-page device cleanup on teardown (MUSHRA sessions
//! on the same page share the device, so cleanup belongs to the page, not
//! to any single session).

use std::sync::Arc;

use parking_lot::Mutex;

use super::mushra::MushraSession;
use super::player::Player;
use super::registry::PlayerRegistry;
use super::types::{DurationRecord, StimulusSpec};
use crate::context::SessionContext;
use crate::device::audio;
use crate::protocol_constants::{
    ACTION_LOOP_OFF, ACTION_MUTE_UNSOLO_ALL, ACTION_UNSELECT_ALL,
};

/// One entry of a trial page, as resolved by the host.
pub enum PageItem {
    /// A standalone stimulus with its own play affordance.
    Stimulus(StimulusSpec),
    /// A comparative block: reference plus alternatives.
    Mushra {
        /// The reference stimulus.
        reference: StimulusSpec,
        /// The alternatives under test.
        alternatives: Vec<StimulusSpec>,
    },
}

/// Players and sessions of one active trial page.
pub struct TrialPage {
    index: usize,
    ctx: Arc<SessionContext>,
    registry: PlayerRegistry,
    players: Vec<Arc<Player>>,
    sessions: Vec<MushraSession>,
    cleaned_up: Mutex<bool>,
}

impl TrialPage {
    /// Instantiates the page's players and sessions.
    #[must_use]
    pub fn new(index: usize, items: Vec<PageItem>, ctx: Arc<SessionContext>) -> Self {
        let registry = PlayerRegistry::new();
        let mut players = Vec::new();
        let mut sessions = Vec::new();

        for item in items {
            match item {
                PageItem::Stimulus(spec) => {
                    let player = Player::new(spec, ctx.clone());
                    registry.register(player.clone());
                    players.push(player);
                }
                PageItem::Mushra {
                    reference,
                    alternatives,
                } => {
                    sessions.push(MushraSession::new(ctx.clone(), reference, alternatives));
                }
            }
        }

        Self {
            index,
            ctx,
            registry,
            players,
            sessions,
            cleaned_up: Mutex::new(false),
        }
    }

    /// 0-based page index within the questionnaire.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The page's standalone players, in authored order.
    #[must_use]
    pub fn players(&self) -> &[Arc<Player>] {
        &self.players
    }

    /// The page's MUSHRA sessions, in authored order.
    #[must_use]
    pub fn sessions(&self) -> &[MushraSession] {
        &self.sessions
    }

    /// Starts standalone stimulus `index`, displacing page-mates.
    pub fn play_stimulus(&self, index: usize) {
        if let Some(player) = self.players.get(index) {
            player.play(&self.registry);
        } else {
            log::warn!("[Page {}] no stimulus at index {}", self.index, index);
        }
    }

    /// Pauses standalone stimulus `index`.
    pub fn pause_stimulus(&self, index: usize) {
        if let Some(player) = self.players.get(index) {
            player.pause();
        }
    }

    /// Stops standalone stimulus `index`.
    pub fn stop_stimulus(&self, index: usize) {
        if let Some(player) = self.players.get(index) {
            player.stop();
        }
    }

    /// Every player on the page, standalone and session members alike.
    fn all_players(&self) -> Vec<Arc<Player>> {
        let mut all = self.players.clone();
        for session in &self.sessions {
            all.extend(session.players());
        }
        all
    }

    /// Status-channel description: one
    /// `"{pageIndex}\tmarker:{m} track:{t}"` segment per active player.
    #[must_use]
    pub fn describe(&self) -> String {
        self.all_players()
            .iter()
            .map(|player| {
                let tracks = player
                    .spec()
                    .tracks
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                format!(
                    "{}\tmarker:{} track:{}",
                    self.index,
                    player.spec().start_marker,
                    tracks
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Per-stimulus duration records, read when the page is submitted.
    #[must_use]
    pub fn duration_report(&self) -> Vec<(u32, Vec<DurationRecord>)> {
        self.all_players()
            .iter()
            .map(|player| (player.spec().start_marker, player.durations()))
            .collect()
    }

    /// Stops everything and leaves the device in a clean shared state for
    /// the next page: mute/unsolo all, loop off, unselect all. The cleanup
    /// sequence goes out exactly once per page, no matter how often
    /// teardown is invoked.
    pub fn teardown(&self) {
        for player in self.all_players() {
            player.stop();
        }

        let mut cleaned_up = self.cleaned_up.lock();
        if *cleaned_up {
            return;
        }
        *cleaned_up = true;

        self.ctx.send_audio(&audio::action(ACTION_MUTE_UNSOLO_ALL));
        self.ctx.send_audio(&audio::action(ACTION_LOOP_OFF));
        self.ctx.send_audio(&audio::action(ACTION_UNSELECT_ALL));
        log::debug!("[Page {}] device cleanup sent", self.index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::{audio_peer, harness};
    use crate::playback::types::PlaybackState;

    fn page(h: &crate::context::test_support::TestHarness) -> TrialPage {
        TrialPage::new(
            2,
            vec![
                PageItem::Stimulus(StimulusSpec::new(1, vec![1, 2])),
                PageItem::Stimulus(StimulusSpec::new(4, vec![3])),
                PageItem::Mushra {
                    reference: StimulusSpec::new(6, vec![1]),
                    alternatives: vec![StimulusSpec::new(6, vec![2])],
                },
            ],
            h.ctx.clone(),
        )
    }

    #[test]
    fn describe_lists_every_player_with_page_index() {
        let h = harness();
        let p = page(&h);

        let description = p.describe();
        let lines: Vec<&str> = description.lines().collect();
        assert_eq!(lines.len(), 4, "two standalone + reference + alternative");
        assert_eq!(lines[0], "2\tmarker:1 track:1,2");
        assert_eq!(lines[1], "2\tmarker:4 track:3");
    }

    #[test]
    fn page_mates_displace_each_other() {
        let h = harness();
        let p = page(&h);

        p.play_stimulus(0);
        p.play_stimulus(1);

        assert_eq!(p.players()[0].state(), PlaybackState::Stopped);
        assert_eq!(p.players()[1].state(), PlaybackState::Playing);
    }

    #[test]
    fn duration_report_covers_all_players() {
        let h = harness();
        let p = page(&h);

        p.play_stimulus(0);
        p.stop_stimulus(0);

        let report = p.duration_report();
        assert_eq!(report.len(), 4);
        assert_eq!(report[0].0, 1);
        assert_eq!(report[0].1.len(), 1);
        assert!(report[1].1.is_empty());
    }

    #[test]
    fn teardown_cleans_up_exactly_once() {
        let h = harness();
        let p = page(&h);

        p.play_stimulus(0);
        h.sender.clear();

        p.teardown();
        p.teardown();

        let codes: Vec<i32> = h
            .sender
            .sent_to(audio_peer())
            .iter()
            .filter(|m| m.addr == "/action")
            .filter_map(|m| m.int_arg())
            .collect();
        assert_eq!(
            codes,
            vec![ACTION_MUTE_UNSOLO_ALL, ACTION_LOOP_OFF, ACTION_UNSELECT_ALL],
            "cleanup sequence goes out once per page"
        );
        assert_eq!(p.players()[0].state(), PlaybackState::Stopped);
    }
}
