//! Real-time socket connector.
//!
//! A [`Connector`] opens one authenticated connection and hands back a
//! stream of decoded [`PushEvent`]s. Reconnection policy is not its
//! concern; the channel supervisor in `matcha-client` decides when to
//! call `connect` again. Every call yields a fresh [`Connection`] with its
//! own id, so a handle is never reused across tokens.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use matcha_shared::protocol::PushEvent;

use crate::error::ChannelError;

/// Decoded events from one live connection. The stream ends when the
/// connection closes; a terminal `Err` carries the reason.
pub type EventStream = BoxStream<'static, Result<PushEvent, ChannelError>>;

pub struct Connection {
    pub id: Uuid,
    pub events: EventStream,
}

impl Connection {
    pub fn new(events: EventStream) -> Self {
        Self {
            id: Uuid::new_v4(),
            events,
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("id", &self.id).finish()
    }
}

#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a connection authenticated with `token`.
    async fn connect(&self, token: &str) -> Result<Connection, ChannelError>;
}

/// WebSocket connector. The token travels as the `token` query parameter
/// of the upgrade request.
pub struct WsConnector {
    url: Url,
}

impl WsConnector {
    pub fn new(socket_url: &str) -> Result<Self, ChannelError> {
        let url = Url::parse(socket_url).map_err(|e| ChannelError::InvalidUrl(e.to_string()))?;
        match url.scheme() {
            "ws" | "wss" => Ok(Self { url }),
            other => Err(ChannelError::InvalidUrl(format!(
                "unsupported scheme {other}"
            ))),
        }
    }

    fn handshake_url(&self, token: &str) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair("token", token);
        url
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, token: &str) -> Result<Connection, ChannelError> {
        let url = self.handshake_url(token);
        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(map_handshake_error)?;

        let connection = Connection::new(stream.filter_map(decode_message).boxed());
        info!(connection = %connection.id, host = ?self.url.host_str(), "Socket connected");
        Ok(connection)
    }
}

fn map_handshake_error(e: tungstenite::Error) -> ChannelError {
    match e {
        tungstenite::Error::Http(resp) => ChannelError::Handshake(resp.status().as_u16()),
        other => ChannelError::Connect(other.to_string()),
    }
}

async fn decode_message(
    msg: Result<Message, tungstenite::Error>,
) -> Option<Result<PushEvent, ChannelError>> {
    match msg {
        Ok(Message::Text(text)) => decode_text(&text),
        Ok(Message::Close(frame)) => {
            let reason = frame
                .map(|f| f.reason.to_string())
                .unwrap_or_else(|| "closed by server".to_string());
            Some(Err(ChannelError::Closed(reason)))
        }
        Ok(Message::Binary(_)) => {
            warn!("Ignoring binary socket frame");
            None
        }
        Ok(_) => None,
        Err(e) => Some(Err(ChannelError::Protocol(e.to_string()))),
    }
}

fn decode_text(text: &str) -> Option<Result<PushEvent, ChannelError>> {
    match PushEvent::decode(text) {
        Ok(Some(event)) => Some(Ok(event)),
        Ok(None) => {
            debug!("Ignoring unknown socket event");
            None
        }
        Err(e) => {
            warn!(error = %e, "Skipping malformed socket frame");
            None
        }
    }
}
