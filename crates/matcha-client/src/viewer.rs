//! Other users' profile pages.
//!
//! Opening a profile records a visit server-side. When the route parameter
//! changes while a fetch is still in flight, the late response is
//! discarded instead of overwriting the newer page.

use std::sync::{Arc, Mutex};

use tracing::debug;

use matcha_net::ApiClient;
use matcha_shared::models::UserProfileView;
use matcha_shared::types::UserId;

use crate::error::Result;
use crate::session::SessionStore;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewOutcome {
    Loaded(Box<UserProfileView>),
    /// The viewer moved to another profile before this one arrived.
    Discarded,
}

pub struct ProfileViewer {
    session: Arc<SessionStore>,
    api: ApiClient,
    current: Mutex<Option<UserId>>,
}

impl ProfileViewer {
    pub fn new(session: Arc<SessionStore>, api: ApiClient) -> Self {
        Self {
            session,
            api,
            current: Mutex::new(None),
        }
    }

    fn set_current(&self, user: Option<UserId>) {
        *self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = user;
    }

    pub fn current(&self) -> Option<UserId> {
        *self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The view moved away (to another profile or off profile pages).
    pub fn navigate(&self, target: Option<UserId>) {
        self.set_current(target);
    }

    pub async fn open(&self, user: UserId) -> Result<ViewOutcome> {
        self.set_current(Some(user));
        let token = self.session.require_token()?;
        let profile = self.api.user_profile(&token, user).await?;

        if self.current() != Some(user) {
            debug!(user = %user, "Discarding profile for a page no longer shown");
            return Ok(ViewOutcome::Discarded);
        }
        Ok(ViewOutcome::Loaded(Box::new(profile)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::QueryCache;
    use crate::error::ClientError;
    use crate::events::EventBus;
    use crate::notifications::NotificationFeed;
    use crate::testing::{profile_json, FakeTransport, COMPLETE};
    use matcha_net::Method;
    use matcha_store::{MemoryStore, SessionStorage};
    use serde_json::json;

    async fn viewer() -> (Arc<FakeTransport>, Arc<ProfileViewer>) {
        let transport = FakeTransport::new();
        let api = ApiClient::new(transport.clone());
        let storage = SessionStorage::new(Arc::new(MemoryStore::new()));
        let session = Arc::new(SessionStore::new(
            api.clone(),
            storage.clone(),
            Arc::new(NotificationFeed::new()),
            QueryCache::new(),
            EventBus::new(),
            "/login",
        ));
        transport.ok(Method::Get, "profile/me", profile_json(1, COMPLETE));
        storage.save_token("tok").unwrap();
        session.boot().await;
        (transport, Arc::new(ProfileViewer::new(session, api)))
    }

    fn other(id: i64) -> serde_json::Value {
        json!({
            "id": id, "username": format!("user{id}"), "first_name": "Bo",
            "liked_by_me": false, "liked_by_them": true, "connected": false
        })
    }

    #[tokio::test]
    async fn test_open_loads_profile() {
        let (transport, viewer) = viewer().await;
        transport.ok(Method::Get, "users/2", other(2));
        match viewer.open(UserId(2)).await.unwrap() {
            ViewOutcome::Loaded(profile) => assert_eq!(profile.username, "user2"),
            ViewOutcome::Discarded => panic!("should load"),
        }
    }

    #[tokio::test]
    async fn test_late_response_is_discarded() {
        let (transport, viewer) = viewer().await;
        transport.ok(Method::Get, "users/2", other(2));
        let gate = transport.gate("users/2");

        let pending = {
            let viewer = viewer.clone();
            tokio::spawn(async move { viewer.open(UserId(2)).await })
        };
        while transport.count(Method::Get, "users/2") == 0 {
            tokio::task::yield_now().await;
        }
        viewer.navigate(Some(UserId(3)));
        gate.notify_one();

        assert_eq!(pending.await.unwrap().unwrap(), ViewOutcome::Discarded);
        assert_eq!(viewer.current(), Some(UserId(3)));
    }

    #[tokio::test]
    async fn test_open_requires_session() {
        let transport = FakeTransport::new();
        let api = ApiClient::new(transport.clone());
        let session = Arc::new(SessionStore::new(
            api.clone(),
            SessionStorage::new(Arc::new(MemoryStore::new())),
            Arc::new(NotificationFeed::new()),
            QueryCache::new(),
            EventBus::new(),
            "/login",
        ));
        let viewer = ProfileViewer::new(session, api);
        assert!(matches!(
            viewer.open(UserId(2)).await,
            Err(ClientError::NotAuthenticated)
        ));
        assert!(transport.requests().is_empty());
    }
}
