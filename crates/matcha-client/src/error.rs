use thiserror::Error;

use matcha_net::{ApiError, ChannelError};
use matcha_shared::ValidationError;
use matcha_store::StoreError;

/// Errors surfaced to the view layer by user-initiated operations.
///
/// Background synchronization never produces these; it degrades to a safe
/// state and logs instead.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Real-time channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Not logged in")]
    NotAuthenticated,

    /// The session changed identity while the request was in flight.
    #[error("Session changed while the request was in flight")]
    Superseded,
}

impl ClientError {
    /// The backend's message for a rejected action, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api(ApiError::Server { message, .. }) => Some(message),
            Self::Api(ApiError::Unauthorized(message)) => Some(message),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
