//! Real-time push protocol.
//!
//! Every frame is a JSON text message `{"event": "<name>", "data": {...}}`.
//! Frames naming an event this client does not know decode to `None`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;
use crate::models::DateProposal;
use crate::notification::Notification;
use crate::types::{MessageId, UserId};

pub const EVENT_CONNECTED: &str = "connected";
pub const EVENT_NOTIFICATION: &str = "notification";
pub const EVENT_NEW_MESSAGE: &str = "new_message";
pub const EVENT_MESSAGE_SENT: &str = "message_sent";
pub const EVENT_USER_TYPING: &str = "user_typing";
pub const EVENT_NEW_DATE_PROPOSAL: &str = "new_date_proposal";
pub const EVENT_ERROR: &str = "error";

/// Chat message as pushed by `new_message` / `message_sent`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessagePayload {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    #[serde(default, with = "crate::timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypingPayload {
    pub user_id: UserId,
    #[serde(default = "default_typing")]
    pub is_typing: bool,
}

fn default_typing() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
struct ConnectedPayload {
    user_id: UserId,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: String,
}

/// Server-to-client events understood by this client.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// Handshake acknowledged.
    Connected { user_id: UserId },
    Notification(Notification),
    NewMessage(MessagePayload),
    MessageSent(MessagePayload),
    Typing(TypingPayload),
    NewDateProposal(DateProposal),
    /// The server refused something this connection sent.
    Error { message: String },
}

#[derive(Debug, Serialize, Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

impl PushEvent {
    /// Decode one text frame. `Ok(None)` for events this client ignores.
    pub fn decode(text: &str) -> Result<Option<Self>, ProtocolError> {
        let frame: RawFrame = serde_json::from_str(text)?;
        let event = frame.event.as_str();
        let data = frame.data;

        fn payload<T: serde::de::DeserializeOwned>(
            event: &str,
            data: Value,
        ) -> Result<T, ProtocolError> {
            serde_json::from_value(data).map_err(|source| ProtocolError::Payload {
                event: event.to_string(),
                source,
            })
        }

        let decoded = match event {
            EVENT_CONNECTED => {
                let p: ConnectedPayload = payload(event, data)?;
                Self::Connected { user_id: p.user_id }
            }
            EVENT_NOTIFICATION => Self::Notification(payload(event, data)?),
            EVENT_NEW_MESSAGE => Self::NewMessage(payload(event, data)?),
            EVENT_MESSAGE_SENT => Self::MessageSent(payload(event, data)?),
            EVENT_USER_TYPING => Self::Typing(payload(event, data)?),
            EVENT_NEW_DATE_PROPOSAL => Self::NewDateProposal(payload(event, data)?),
            EVENT_ERROR => {
                let p: ErrorPayload = payload(event, data)?;
                Self::Error { message: p.message }
            }
            _ => return Ok(None),
        };
        Ok(Some(decoded))
    }

    /// Event name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => EVENT_CONNECTED,
            Self::Notification(_) => EVENT_NOTIFICATION,
            Self::NewMessage(_) => EVENT_NEW_MESSAGE,
            Self::MessageSent(_) => EVENT_MESSAGE_SENT,
            Self::Typing(_) => EVENT_USER_TYPING,
            Self::NewDateProposal(_) => EVENT_NEW_DATE_PROPOSAL,
            Self::Error { .. } => EVENT_ERROR,
        }
    }
}

/// Build a raw frame. Used by tests and tooling that speak to the client.
pub fn encode_frame(event: &str, data: Value) -> String {
    serde_json::to_string(&RawFrame {
        event: event.to_string(),
        data,
    })
    .unwrap_or_default()
}
