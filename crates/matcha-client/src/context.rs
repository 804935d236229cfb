//! Explicitly constructed client context.
//!
//! Owns every long-lived component and the background tasks. Create one
//! per "tab"; instances sharing a key-value store follow each other's
//! logins and logouts.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use matcha_net::{ApiClient, Connector, HttpTransport, ReqwestTransport, WsConnector};
use matcha_shared::identity::Credentials;
use matcha_shared::profile::ProfileSnapshot;
use matcha_shared::types::ChannelState;
use matcha_store::{Database, KeyValueStore, MemoryStore, SessionStorage, SqliteStore};

use crate::cache::QueryCache;
use crate::config::{ClientConfig, StorageLocation};
use crate::error::Result;
use crate::events::{ClientEvent, EventBus};
use crate::guard::{GuardDecision, RouteGuard};
use crate::notifications::NotificationFeed;
use crate::realtime::{PushHandler, RealtimeChannel, ReconnectPolicy};
use crate::session::{BootOutcome, SessionStore};
use crate::sync;
use crate::viewer::ProfileViewer;

pub struct ClientContext {
    config: ClientConfig,
    api: ApiClient,
    storage: SessionStorage,
    connector: Arc<dyn Connector>,
    session: Arc<SessionStore>,
    feed: Arc<NotificationFeed>,
    cache: QueryCache,
    events: EventBus,
    guard: RouteGuard,
    viewer: ProfileViewer,
    channel: Mutex<Option<RealtimeChannel>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ClientContext {
    /// Build the production stack from `config`: reqwest transport,
    /// WebSocket connector and the configured storage.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.api_base_url.clone(), config.http_timeout)?;
        let connector = WsConnector::new(&config.socket_url)?;
        let store: Arc<dyn KeyValueStore> = match &config.storage {
            StorageLocation::Default => Arc::new(SqliteStore::new(Database::open_default()?)),
            StorageLocation::Path(path) => Arc::new(SqliteStore::new(Database::open_at(path)?)),
            StorageLocation::Memory => Arc::new(MemoryStore::new()),
        };
        Ok(Self::with_parts(
            config,
            Arc::new(transport),
            Arc::new(connector),
            store,
        ))
    }

    /// Build from explicit parts. Several contexts may share `store`.
    pub fn with_parts(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        connector: Arc<dyn Connector>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let api = ApiClient::new(transport);
        let storage = SessionStorage::new(store);
        let feed = Arc::new(NotificationFeed::new());
        let cache = QueryCache::new();
        let events = EventBus::new();
        let session = Arc::new(SessionStore::new(
            api.clone(),
            storage.clone(),
            feed.clone(),
            cache.clone(),
            events.clone(),
            config.routes.login.clone(),
        ));
        let guard = RouteGuard::new(config.routes.clone());
        let viewer = ProfileViewer::new(session.clone(), api.clone());

        Self {
            config,
            api,
            storage,
            connector,
            session,
            feed,
            cache,
            events,
            guard,
            viewer,
            channel: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Start background tasks and hydrate the session from storage.
    /// Must be called inside a tokio runtime.
    pub async fn boot(&self) -> BootOutcome {
        self.start_background();
        let outcome = self.session.boot().await;
        info!(?outcome, "Client booted");
        outcome
    }

    fn start_background(&self) {
        let mut channel = self
            .channel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if channel.is_some() {
            return;
        }

        *channel = Some(RealtimeChannel::spawn(
            self.connector.clone(),
            self.session.watch_token(),
            PushHandler::new(self.feed.clone(), self.cache.clone(), self.events.clone()),
            ReconnectPolicy::from_config(&self.config),
            self.events.clone(),
        ));

        let mut tasks = self
            .tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        tasks.push(sync::spawn_storage_listener(
            self.session.clone(),
            self.storage.clone(),
        ));
        tasks.push(sync::spawn_backup_poll(
            self.session.clone(),
            self.api.clone(),
            self.feed.clone(),
            self.cache.clone(),
            self.config.poll_interval,
        ));
    }

    /// Stop background tasks and close the real-time connection. The
    /// persisted session is left alone.
    pub fn dispose(&self) {
        if let Some(channel) = self
            .channel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
        {
            channel.shutdown();
        }
        for task in self
            .tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
        {
            task.abort();
        }
    }

    // -- session ------------------------------------------------------------

    pub async fn login(&self, credentials: &Credentials) -> Result<Arc<ProfileSnapshot>> {
        self.session.login(credentials).await
    }

    pub async fn logout(&self) {
        self.session.logout().await;
    }

    /// Guard decision for `path` against the current session.
    pub fn guard_route(&self, path: &str) -> GuardDecision {
        self.guard.evaluate(&self.session.view(), path)
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map_or(ChannelState::Disconnected, RealtimeChannel::state)
    }

    /// Retry the real-time channel now, e.g. after it gave up.
    pub fn reconnect(&self) {
        if let Some(channel) = self
            .channel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
        {
            channel.reconnect();
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn notifications(&self) -> &Arc<NotificationFeed> {
        &self.feed
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    pub fn viewer(&self) -> &ProfileViewer {
        &self.viewer
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }
}

impl Drop for ClientContext {
    fn drop(&mut self) {
        self.dispose();
    }
}
