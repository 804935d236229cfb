use thiserror::Error;

/// Errors returned by [`HttpTransport`](crate::HttpTransport) and the typed
/// [`ApiClient`](crate::ApiClient).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("Network error: {0}")]
    Network(String),

    /// The client-side timeout elapsed.
    #[error("Request timed out")]
    Timeout,

    /// HTTP 401: the bearer token is missing, expired or revoked.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Any other non-success status. `message` is the backend's `error`
    /// field when the body carries one.
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Failures where no response was received.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else if e.is_builder() {
            Self::InvalidRequest(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Errors raised by the real-time socket.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Invalid socket URL: {0}")]
    InvalidUrl(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    /// The server answered the upgrade with a non-101 status, typically
    /// because the token was refused.
    #[error("Handshake rejected with HTTP {0}")]
    Handshake(u16),

    #[error("Connection closed: {0}")]
    Closed(String),

    #[error("Socket protocol error: {0}")]
    Protocol(String),
}
