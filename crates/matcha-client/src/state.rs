use std::sync::Arc;

use serde::Serialize;

use matcha_shared::identity::UserIdentity;
use matcha_shared::profile::{ProfileCompleteness, ProfileSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Boot has not finished validating the persisted token.
    #[default]
    Loading,
    Anonymous,
    /// The token was confirmed by a successful profile fetch.
    Authenticated,
}

/// Mutable session state. Held behind a lock in `SessionStore`; never
/// across an await point.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub status: SessionStatus,
    pub token: Option<String>,
    pub identity: Option<UserIdentity>,
    pub profile: Option<Arc<ProfileSnapshot>>,
    /// Bumped whenever the token or identity changes, so responses to
    /// requests issued under an older session can be recognized.
    pub epoch: u64,
}

impl SessionState {
    pub fn reset(&mut self, status: SessionStatus) {
        self.status = status;
        self.token = None;
        self.identity = None;
        self.profile = None;
        self.epoch += 1;
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            status: self.status,
            identity: self.identity.clone(),
            profile: self.profile.clone(),
        }
    }
}

/// Read-only copy of the session for the view layer and the route guards.
#[derive(Debug, Clone, Default)]
pub struct SessionView {
    pub status: SessionStatus,
    pub identity: Option<UserIdentity>,
    pub profile: Option<Arc<ProfileSnapshot>>,
}

impl SessionView {
    pub fn is_loading(&self) -> bool {
        self.status == SessionStatus::Loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    /// Derived from the current snapshot on every call.
    pub fn completeness(&self) -> Option<ProfileCompleteness> {
        self.profile.as_deref().map(ProfileCompleteness::of)
    }
}
