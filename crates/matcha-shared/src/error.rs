use thiserror::Error;

/// Client-side validation failures, raised before a request leaves the
/// process. The backend applies the same rules; these only save a round
/// trip and give the view layer a typed reason.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid gender: {0} (expected Male or Female)")]
    InvalidGender(String),

    #[error("Invalid sexual preference: {0} (expected Straight, Gay or Bisexual)")]
    InvalidSexualPreference(String),

    #[error("Invalid date format: {0} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("Age {0} is outside the accepted range")]
    AgeOutOfRange(u32),

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Coordinates out of range: ({latitude}, {longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} too long: {len} characters (max {max})")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Profile already holds the maximum of {0} images")]
    TooManyImages(usize),

    #[error("Date must be in the future")]
    DateInPast,

    #[error("Nothing to update")]
    NoChanges,
}

/// Errors raised while decoding a real-time frame.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid payload for event {event}: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}
