use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Server-assigned user id.
    UserId
);
numeric_id!(ImageId);
numeric_id!(TagId);
numeric_id!(
    /// Server-assigned notification id. Ids grow monotonically, so they
    /// double as the ordering tie-breaker.
    NotificationId
);
numeric_id!(MessageId);
numeric_id!(ProposalId);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }
}

impl FromStr for Gender {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Male" => Ok(Self::Male),
            "Female" => Ok(Self::Female),
            other => Err(ValidationError::InvalidGender(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SexualPreference {
    Straight,
    Gay,
    Bisexual,
}

impl SexualPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Straight => "Straight",
            Self::Gay => "Gay",
            Self::Bisexual => "Bisexual",
        }
    }
}

impl FromStr for SexualPreference {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Straight" => Ok(Self::Straight),
            "Gay" => Ok(Self::Gay),
            "Bisexual" => Ok(Self::Bisexual),
            other => Err(ValidationError::InvalidSexualPreference(other.to_string())),
        }
    }
}

/// Lifecycle of the real-time push channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChannelState {
    /// No live connection: idle without a session, waiting out the
    /// backoff between attempts, or given up.
    Disconnected,
    /// A connection attempt is in flight (1-based).
    Connecting { attempt: u32 },
    /// The socket is open and events are flowing.
    Connected,
}

impl ChannelState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}
