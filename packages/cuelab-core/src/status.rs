//! Fire-and-forget status channel to the monitoring peer.
//!
//! A lab setup can point a third OSC peer (an experimenter's machine, a
//! logging box) at the session; the session pushes small notifications
//! there and never expects a reply. Without a configured peer every
//! notification is a silent no-op; that is the headless/preview mode.

use std::sync::Arc;

use crate::osc::{OscMessage, OscSender, PeerAddr};
use crate::protocol_constants::{
    STATUS_CONNECTION_LOST_ADDR, STATUS_FINISHED_ADDR, STATUS_HELP_ADDR, STATUS_PAGE_ADDR,
};

/// Outbound notifications to the monitoring peer.
#[derive(Clone)]
pub struct StatusChannel {
    sender: Arc<dyn OscSender>,
    peer: Option<PeerAddr>,
}

impl StatusChannel {
    /// Creates the channel; `peer` absent means suppressed notifications.
    #[must_use]
    pub fn new(sender: Arc<dyn OscSender>, peer: Option<PeerAddr>) -> Self {
        Self { sender, peer }
    }

    /// True when a monitoring peer is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.peer.is_some()
    }

    fn notify(&self, msg: OscMessage) {
        if let Some(peer) = self.peer {
            self.sender.send(peer, &msg);
        }
    }

    /// The participant pressed the help affordance.
    pub fn help_request(&self) {
        self.notify(OscMessage::new(STATUS_HELP_ADDR));
    }

    /// A new page became active; `description` is the page's player list
    /// (see `TrialPage::describe`).
    pub fn page(&self, description: &str) {
        self.notify(OscMessage::new(STATUS_PAGE_ADDR).arg(description));
    }

    /// A configured peer stopped answering reachability probes.
    pub fn connection_lost(&self) {
        self.notify(OscMessage::new(STATUS_CONNECTION_LOST_ADDR));
    }

    /// The questionnaire finished.
    pub fn questionnaire_finished(&self) {
        self.notify(OscMessage::new(STATUS_FINISHED_ADDR));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::RecordingSender;
    use std::net::IpAddr;

    fn status_peer() -> PeerAddr {
        PeerAddr::new(IpAddr::from([127, 0, 0, 1]), 9100)
    }

    #[test]
    fn notifications_reach_the_configured_peer() {
        let sender = RecordingSender::arc();
        let status = StatusChannel::new(sender.clone(), Some(status_peer()));

        status.help_request();
        status.page("0\tmarker:1 track:1,2");
        status.questionnaire_finished();

        let sent = sender.sent_to(status_peer());
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].addr, "/help_request");
        assert_eq!(sent[1].to_string(), "/page \"0\tmarker:1 track:1,2\"");
        assert_eq!(sent[2].addr, "/questionnaire_finished");
    }

    #[test]
    fn unconfigured_channel_is_silent() {
        let sender = RecordingSender::arc();
        let status = StatusChannel::new(sender.clone(), None);

        assert!(!status.is_configured());
        status.help_request();
        status.connection_lost();

        assert!(sender.sent.lock().is_empty());
    }
}
