//! Events pushed from the client core to the view layer.

use tokio::sync::broadcast;
use tracing::trace;

use matcha_shared::models::DateProposal;
use matcha_shared::notification::Notification;
use matcha_shared::protocol::{MessagePayload, TypingPayload};
use matcha_shared::types::ChannelState;

use crate::state::SessionStatus;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    SessionChanged(SessionStatus),
    /// The own profile snapshot was replaced; guards should re-evaluate.
    ProfileChanged,
    /// The core decided the view should move to this path.
    Navigate(String),
    ChannelStateChanged(ChannelState),
    NotificationReceived(Notification),
    MessageReceived(MessagePayload),
    Typing(TypingPayload),
    DateProposalReceived(DateProposal),
}

/// Fan-out of [`ClientEvent`]s. Cheap to clone.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: ClientEvent) {
        if self.tx.send(event).is_err() {
            trace!("No event listeners");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
