/// Application name
pub const APP_NAME: &str = "Matcha";

/// Persisted storage key holding the opaque bearer token
pub const STORAGE_KEY_TOKEN: &str = "token";

/// Persisted storage key holding the JSON-serialized minimal identity
pub const STORAGE_KEY_USER: &str = "user";

/// Maximum number of images a profile may hold
pub const MAX_PROFILE_IMAGES: usize = 5;

/// Maximum length of a single interest tag, `#` included
pub const MAX_TAG_LENGTH: usize = 50;

/// Maximum chat message length in characters
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Maximum page size accepted by the message history endpoint
pub const MAX_MESSAGE_PAGE: u32 = 100;

/// Maximum page size accepted by the browsing endpoint
pub const MAX_BROWSE_PAGE: u32 = 50;

/// Date proposal field bounds
pub const MAX_DATE_LOCATION_LENGTH: usize = 255;
pub const MAX_DATE_ACTIVITY_LENGTH: usize = 100;

/// Accepted age range derived from the date of birth
pub const MIN_AGE: u32 = 18;
pub const MAX_AGE: u32 = 120;

/// Real-time reconnection defaults (linear backoff: attempt * step)
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_RECONNECT_STEP_MS: u64 = 1_000;

/// Backup poll interval for notifications, in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Client-side HTTP timeout, in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// Development backend endpoints
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_SOCKET_URL: &str = "ws://localhost:5000/ws";
