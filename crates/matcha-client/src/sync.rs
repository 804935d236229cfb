//! Background synchronization tasks.
//!
//! - The backup poll refetches notifications on a fixed interval and
//!   whenever they are invalidated, so the feed converges even while the
//!   real-time channel is down.
//! - The storage listener follows token changes made by other instances
//!   sharing the same store.
//!
//! Neither task surfaces errors; failures are logged and retried on the
//! next trigger.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use matcha_net::ApiClient;
use matcha_store::SessionStorage;

use crate::cache::{QueryCache, QueryKey};
use crate::notifications::NotificationFeed;
use crate::session::SessionStore;

/// Fetch the notification list once and merge it into the feed.
///
/// Returns `false` when nothing was merged: no authenticated session, a
/// failed request, or a session change while the request was in flight.
pub async fn poll_notifications(
    session: &SessionStore,
    api: &ApiClient,
    feed: &NotificationFeed,
    cache: &QueryCache,
) -> bool {
    let Some(token) = session.authenticated_token() else {
        return false;
    };
    let epoch = session.epoch();
    let generation = cache.generation(QueryKey::Notifications);

    match api.notifications(&token).await {
        Ok(list) if session.epoch() == epoch => {
            feed.reconcile(list);
            cache.mark_fetched(QueryKey::Notifications, generation);
            cache.mark_fetched(QueryKey::UnreadCount, cache.generation(QueryKey::UnreadCount));
            true
        }
        Ok(_) => {
            debug!("Discarding notifications fetched for a previous session");
            false
        }
        Err(e) if e.is_unauthorized() => {
            warn!(error = %e, "Notification poll rejected; re-validating session");
            session.refresh_profile().await;
            false
        }
        Err(e) => {
            warn!(error = %e, "Notification poll failed");
            false
        }
    }
}

pub fn spawn_backup_poll(
    session: Arc<SessionStore>,
    api: ApiClient,
    feed: Arc<NotificationFeed>,
    cache: QueryCache,
    interval: Duration,
) -> JoinHandle<()> {
    let mut invalidations = cache.subscribe();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                key = invalidations.recv() => match key {
                    Ok(QueryKey::Notifications | QueryKey::UnreadCount) => {
                        if !cache.needs_refetch(QueryKey::Notifications) {
                            continue;
                        }
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Invalidation listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
            poll_notifications(&session, &api, &feed, &cache).await;
        }
        debug!("Backup poll stopped");
    })
}

/// Follow token changes written by other instances. Subscribes before
/// returning, so no change made after this call is missed.
pub fn spawn_storage_listener(session: Arc<SessionStore>, storage: SessionStorage) -> JoinHandle<()> {
    let mut changes = storage.subscribe();
    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(event) if storage.is_foreign_token_change(&event) => {
                    session.reconcile_with_storage().await;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Storage listener lagged; re-reading token");
                    session.reconcile_with_storage().await;
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("Storage listener stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::state::SessionStatus;
    use crate::testing::{notification_json, profile_json, FakeTransport, COMPLETE};
    use matcha_net::Method;
    use matcha_store::{KeyValueStore, MemoryStore};
    use serde_json::json;

    struct Fixture {
        transport: Arc<FakeTransport>,
        storage: SessionStorage,
        api: ApiClient,
        feed: Arc<NotificationFeed>,
        cache: QueryCache,
        session: Arc<SessionStore>,
    }

    fn fixture_on(store: Arc<dyn KeyValueStore>) -> Fixture {
        let transport = FakeTransport::new();
        let api = ApiClient::new(transport.clone());
        let storage = SessionStorage::new(store);
        let feed = Arc::new(NotificationFeed::new());
        let cache = QueryCache::new();
        let session = Arc::new(SessionStore::new(
            api.clone(),
            storage.clone(),
            feed.clone(),
            cache.clone(),
            EventBus::new(),
            "/login",
        ));
        transport.ok(Method::Get, "profile/me", profile_json(1, COMPLETE));
        Fixture {
            transport,
            storage,
            api,
            feed,
            cache,
            session,
        }
    }

    async fn authenticated() -> Fixture {
        let f = fixture_on(Arc::new(MemoryStore::new()));
        f.storage.save_token("tok").unwrap();
        f.session.boot().await;
        f
    }

    #[tokio::test]
    async fn test_poll_requires_authentication() {
        let f = fixture_on(Arc::new(MemoryStore::new()));
        assert!(!poll_notifications(&f.session, &f.api, &f.feed, &f.cache).await);
        assert_eq!(f.transport.count(Method::Get, "notifications"), 0);
    }

    #[tokio::test]
    async fn test_poll_merges_into_feed() {
        let f = authenticated().await;
        f.transport.ok(
            Method::Get,
            "notifications",
            json!({"notifications": [notification_json(2, false), notification_json(1, true)]}),
        );
        assert!(poll_notifications(&f.session, &f.api, &f.feed, &f.cache).await);
        assert_eq!(f.feed.len(), 2);
        assert_eq!(f.feed.unread_count(), 1);
        assert!(!f.cache.needs_refetch(QueryKey::Notifications));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backup_poll_runs_on_interval() {
        let f = authenticated().await;
        f.transport.ok(
            Method::Get,
            "notifications",
            json!({"notifications": [notification_json(1, false)]}),
        );
        let task = spawn_backup_poll(
            f.session.clone(),
            f.api.clone(),
            f.feed.clone(),
            f.cache.clone(),
            Duration::from_secs(30),
        );

        // First tick fires immediately.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(f.transport.count(Method::Get, "notifications"), 1);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(f.transport.count(Method::Get, "notifications"), 3);
        assert_eq!(f.feed.unread_count(), 1);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidation_triggers_refetch() {
        let f = authenticated().await;
        f.transport.ok(
            Method::Get,
            "notifications",
            json!({"notifications": []}),
        );
        let task = spawn_backup_poll(
            f.session.clone(),
            f.api.clone(),
            f.feed.clone(),
            f.cache.clone(),
            Duration::from_secs(3600),
        );
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(f.transport.count(Method::Get, "notifications"), 1);

        f.cache.invalidate(QueryKey::Notifications);
        f.cache.invalidate(QueryKey::Conversations);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(f.transport.count(Method::Get, "notifications"), 2);
        task.abort();
    }

    #[tokio::test]
    async fn test_poll_discards_result_after_logout() {
        let f = authenticated().await;
        f.transport.ok(
            Method::Get,
            "notifications",
            json!({"notifications": [notification_json(1, false)]}),
        );
        let gate = f.transport.gate("notifications");

        let (session, api, feed, cache) =
            (f.session.clone(), f.api.clone(), f.feed.clone(), f.cache.clone());
        let poll =
            tokio::spawn(async move { poll_notifications(&session, &api, &feed, &cache).await });
        while f.transport.count(Method::Get, "notifications") == 0 {
            tokio::task::yield_now().await;
        }
        f.session.logout().await;
        gate.notify_one();

        assert!(!poll.await.unwrap());
        assert!(f.feed.is_empty());
    }

    #[tokio::test]
    async fn test_listener_follows_other_instance_logout() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let a = fixture_on(store.clone());
        let b = fixture_on(store);
        a.storage.save_token("tok").unwrap();
        a.session.boot().await;
        b.session.boot().await;

        let listener = spawn_storage_listener(b.session.clone(), b.storage.clone());
        a.session.logout().await;

        for _ in 0..100 {
            if b.session.status() == SessionStatus::Anonymous {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(b.session.status(), SessionStatus::Anonymous);
        listener.abort();
    }

    #[tokio::test]
    async fn test_listener_ignores_own_writes() {
        let f = authenticated().await;
        let listener = spawn_storage_listener(f.session.clone(), f.storage.clone());
        f.storage.save_token("tok").unwrap();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(f.transport.count(Method::Get, "profile/me"), 1);
        listener.abort();
    }
}
