//! # matcha-shared
//!
//! Domain types shared by every layer of the Matcha client: the session
//! identity, the profile snapshot and its derived completeness, the
//! notification record, the real-time push protocol and the DTOs returned
//! by the chat, dates and browsing endpoints.

pub mod constants;
pub mod error;
pub mod identity;
pub mod models;
pub mod notification;
pub mod profile;
pub mod protocol;
pub mod timestamp;
pub mod types;

pub use error::{ProtocolError, ValidationError};
pub use identity::{Credentials, LoginResponse, UserIdentity};
pub use notification::{Notification, NotificationKind, SourceUser};
pub use profile::{Location, ProfileCompleteness, ProfileImage, ProfileSnapshot, Tag};
pub use protocol::{MessagePayload, PushEvent};
pub use types::*;
