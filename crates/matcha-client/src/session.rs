//! Session store: the single owner of "who is logged in".
//!
//! Holds the bearer token, the persisted identity and the latest profile
//! snapshot, and is the only component that writes the `token`/`user`
//! storage keys. The token is handed to the real-time channel only while
//! the session is authenticated, i.e. after a profile fetch has confirmed
//! it.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use matcha_net::ApiClient;
use matcha_shared::identity::{Credentials, UserIdentity};
use matcha_shared::profile::{ProfileCompleteness, ProfileSnapshot};
use matcha_store::SessionStorage;

use crate::cache::{QueryCache, QueryKey};
use crate::error::{ClientError, Result};
use crate::events::{ClientEvent, EventBus};
use crate::notifications::NotificationFeed;
use crate::state::{SessionState, SessionStatus, SessionView};

/// Result of hydrating from storage. Boot never fails; it degrades to
/// anonymous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootOutcome {
    /// No persisted token.
    Anonymous,
    Authenticated,
    /// A persisted token failed validation and was discarded.
    Invalidated,
    /// A login or logout overtook the validation request.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// No token held.
    Skipped,
    Refreshed,
    /// The fetch failed; the previous snapshot is kept.
    Stale,
    /// The server rejected the token; the session was cleared.
    Invalidated,
    /// The session changed while the fetch was in flight.
    Discarded,
}

pub struct SessionStore {
    api: ApiClient,
    storage: SessionStorage,
    state: RwLock<SessionState>,
    channel_token: watch::Sender<Option<String>>,
    feed: Arc<NotificationFeed>,
    cache: QueryCache,
    events: EventBus,
    login_route: String,
}

impl SessionStore {
    pub fn new(
        api: ApiClient,
        storage: SessionStorage,
        feed: Arc<NotificationFeed>,
        cache: QueryCache,
        events: EventBus,
        login_route: impl Into<String>,
    ) -> Self {
        let (channel_token, _) = watch::channel(None);
        Self {
            api,
            storage,
            state: RwLock::new(SessionState::default()),
            channel_token,
            feed,
            cache,
            events,
            login_route: login_route.into(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // -- queries ------------------------------------------------------------

    pub fn view(&self) -> SessionView {
        self.read().view()
    }

    pub fn status(&self) -> SessionStatus {
        self.read().status
    }

    pub fn is_authenticated(&self) -> bool {
        self.status() == SessionStatus::Authenticated
    }

    /// The held token, validated or not.
    pub fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    /// The token, only while the session is authenticated.
    pub fn authenticated_token(&self) -> Option<String> {
        let state = self.read();
        match state.status {
            SessionStatus::Authenticated => state.token.clone(),
            _ => None,
        }
    }

    pub fn require_token(&self) -> Result<String> {
        self.token().ok_or(ClientError::NotAuthenticated)
    }

    pub fn identity(&self) -> Option<UserIdentity> {
        self.read().identity.clone()
    }

    pub fn profile(&self) -> Option<Arc<ProfileSnapshot>> {
        self.read().profile.clone()
    }

    /// Derived from the current snapshot on every call; `None` until a
    /// snapshot has been loaded.
    pub fn profile_completeness(&self) -> Option<ProfileCompleteness> {
        self.read().profile.as_deref().map(ProfileCompleteness::of)
    }

    /// Token feed for the real-time channel. `Some` exactly while the
    /// session is authenticated.
    pub fn watch_token(&self) -> watch::Receiver<Option<String>> {
        self.channel_token.subscribe()
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.read().epoch
    }

    // -- lifecycle ----------------------------------------------------------

    /// Hydrate from storage and validate the persisted token against the
    /// server. Any validation failure discards the persisted session.
    pub async fn boot(&self) -> BootOutcome {
        let token = self.storage.token().unwrap_or_else(|e| {
            warn!(error = %e, "Could not read persisted token");
            None
        });

        let Some(token) = token else {
            self.write().reset(SessionStatus::Anonymous);
            self.publish_token(None);
            self.events
                .emit(ClientEvent::SessionChanged(SessionStatus::Anonymous));
            debug!("No persisted session");
            return BootOutcome::Anonymous;
        };

        let identity = self.storage.user().unwrap_or_else(|e| {
            warn!(error = %e, "Could not read persisted user");
            None
        });

        let epoch = {
            let mut state = self.write();
            state.status = SessionStatus::Loading;
            state.token = Some(token.clone());
            state.identity = identity;
            state.profile = None;
            state.epoch += 1;
            state.epoch
        };
        if self.channel_token.borrow().as_deref() != Some(token.as_str()) {
            self.publish_token(None);
        }
        self.events
            .emit(ClientEvent::SessionChanged(SessionStatus::Loading));

        match self.api.fetch_profile(&token).await {
            Ok(profile) => match self.apply_profile(epoch, profile) {
                Some(profile) => {
                    info!(user = %profile.username, "Session restored");
                    BootOutcome::Authenticated
                }
                None => BootOutcome::Superseded,
            },
            Err(_) if self.epoch() != epoch => BootOutcome::Superseded,
            Err(e) => {
                warn!(error = %e, "Persisted token failed validation; continuing anonymously");
                self.end_session(true);
                BootOutcome::Invalidated
            }
        }
    }

    /// Exchange credentials for a token, persist it, then load the profile.
    ///
    /// The token is persisted before the profile fetch. If that fetch fails
    /// the error is returned and the token stays held but unconfirmed; a
    /// later [`SessionStore::refresh_profile`] can still complete the login.
    pub async fn login(&self, credentials: &Credentials) -> Result<Arc<ProfileSnapshot>> {
        let response = self.api.login(credentials).await?;
        self.storage.save_token(&response.token)?;
        self.storage.save_user(&response.user)?;

        let (epoch, was) = {
            let mut state = self.write();
            let was = state.status;
            state.status = SessionStatus::Anonymous;
            state.token = Some(response.token.clone());
            state.identity = Some(response.user.clone());
            state.profile = None;
            state.epoch += 1;
            (state.epoch, was)
        };
        self.publish_token(None);
        self.feed.clear();
        self.cache.invalidate_all();
        if was != SessionStatus::Anonymous {
            self.events
                .emit(ClientEvent::SessionChanged(SessionStatus::Anonymous));
        }

        match self.api.fetch_profile(&response.token).await {
            Ok(profile) => {
                let profile = self
                    .apply_profile(epoch, profile)
                    .ok_or(ClientError::Superseded)?;
                info!(user = %response.user.username, "Logged in");
                Ok(profile)
            }
            Err(e) => {
                warn!(error = %e, "Logged in but the profile fetch failed; token kept");
                Err(e.into())
            }
        }
    }

    /// End the session. Local state is cleared even if the server cannot
    /// be reached.
    pub async fn logout(&self) {
        let token = self.token();
        self.end_session(true);
        self.events
            .emit(ClientEvent::Navigate(self.login_route.clone()));

        if let Some(token) = token {
            match self.api.logout(&token).await {
                Ok(()) => debug!("Server-side logout acknowledged"),
                Err(e) => warn!(error = %e, "Server-side logout failed; local session already cleared"),
            }
        }
        info!("Logged out");
    }

    /// Re-fetch the own profile with the held token.
    ///
    /// A 401 clears the session. Other failures keep the previous snapshot.
    /// A success also confirms the token, so an unconfirmed login becomes
    /// authenticated here.
    pub async fn refresh_profile(&self) -> RefreshOutcome {
        let (token, epoch) = {
            let state = self.read();
            match &state.token {
                Some(token) => (token.clone(), state.epoch),
                None => return RefreshOutcome::Skipped,
            }
        };
        let generation = self.cache.generation(QueryKey::Profile);

        match self.api.fetch_profile(&token).await {
            Ok(profile) => match self.apply_profile(epoch, profile) {
                Some(_) => {
                    self.cache.mark_fetched(QueryKey::Profile, generation);
                    RefreshOutcome::Refreshed
                }
                None => {
                    debug!("Discarding profile fetched for a previous session");
                    RefreshOutcome::Discarded
                }
            },
            Err(_) if self.epoch() != epoch => RefreshOutcome::Discarded,
            Err(e) if e.is_unauthorized() => {
                warn!(error = %e, "Token rejected; ending session");
                self.end_session(true);
                RefreshOutcome::Invalidated
            }
            Err(e) => {
                warn!(error = %e, "Profile refresh failed; keeping previous snapshot");
                RefreshOutcome::Stale
            }
        }
    }

    /// Replace the identity in memory and in storage.
    pub fn set_user(&self, identity: Option<UserIdentity>) -> Result<()> {
        let persisted = match &identity {
            Some(user) => self.storage.save_user(user),
            None => self.storage.clear_user(),
        };
        self.write().identity = identity;
        persisted.map_err(Into::into)
    }

    /// Re-read the persisted token after another instance changed it.
    pub async fn reconcile_with_storage(&self) {
        let persisted = match self.storage.token() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Could not read persisted token");
                return;
            }
        };
        if persisted == self.token() {
            return;
        }

        match persisted {
            None => {
                info!("Session ended by another instance");
                self.end_session(false);
                self.events
                    .emit(ClientEvent::Navigate(self.login_route.clone()));
            }
            Some(_) => {
                info!("Session replaced by another instance; re-validating");
                self.boot().await;
            }
        }
    }

    // -- internals ----------------------------------------------------------

    /// Install a fetched snapshot unless the session moved on since
    /// `epoch`. Marks the session authenticated.
    fn apply_profile(&self, epoch: u64, profile: ProfileSnapshot) -> Option<Arc<ProfileSnapshot>> {
        let profile = Arc::new(profile);
        let (token, became_authenticated, adopted) = {
            let mut state = self.write();
            if state.epoch != epoch {
                return None;
            }
            let adopted = match state.identity {
                Some(_) => None,
                None => {
                    let identity = profile.identity();
                    state.identity = Some(identity.clone());
                    Some(identity)
                }
            };
            state.profile = Some(profile.clone());
            let became_authenticated = state.status != SessionStatus::Authenticated;
            state.status = SessionStatus::Authenticated;
            (state.token.clone(), became_authenticated, adopted)
        };

        if let Some(identity) = adopted {
            if let Err(e) = self.storage.save_user(&identity) {
                warn!(error = %e, "Could not persist user identity");
            }
        }
        if became_authenticated {
            self.publish_token(token);
            self.events
                .emit(ClientEvent::SessionChanged(SessionStatus::Authenticated));
        }
        self.events.emit(ClientEvent::ProfileChanged);
        Some(profile)
    }

    fn end_session(&self, clear_storage: bool) {
        self.write().reset(SessionStatus::Anonymous);
        if clear_storage {
            if let Err(e) = self.storage.clear() {
                warn!(error = %e, "Could not clear persisted session");
            }
        }
        self.publish_token(None);
        self.feed.clear();
        self.cache.invalidate_all();
        self.events
            .emit(ClientEvent::SessionChanged(SessionStatus::Anonymous));
    }

    fn publish_token(&self, token: Option<String>) {
        self.channel_token.send_if_modified(move |current| {
            if *current == token {
                false
            } else {
                *current = token;
                true
            }
        });
    }
}
