//! Typed access to the persisted `token` and `user` keys.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

use matcha_shared::constants::{STORAGE_KEY_TOKEN, STORAGE_KEY_USER};
use matcha_shared::identity::UserIdentity;

use crate::error::Result;
use crate::kv::{KeyValueStore, StorageEvent};

/// Handle on the shared store owned by one client instance.
///
/// Cloning keeps the instance id; two independent instances (two "tabs")
/// must each call [`SessionStorage::new`].
#[derive(Clone)]
pub struct SessionStorage {
    store: Arc<dyn KeyValueStore>,
    origin: Uuid,
}

impl SessionStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            origin: Uuid::new_v4(),
        }
    }

    /// Id this instance stamps on its writes.
    pub fn origin(&self) -> Uuid {
        self.origin
    }

    pub fn token(&self) -> Result<Option<String>> {
        Ok(self
            .store
            .get(STORAGE_KEY_TOKEN)?
            .filter(|t| !t.trim().is_empty()))
    }

    pub fn save_token(&self, token: &str) -> Result<()> {
        self.store.set(self.origin, STORAGE_KEY_TOKEN, token)
    }

    /// The persisted identity. A corrupt record reads as absent.
    pub fn user(&self) -> Result<Option<UserIdentity>> {
        let Some(raw) = self.store.get(STORAGE_KEY_USER)? else {
            return Ok(None);
        };
        match UserIdentity::from_json(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!(error = %e, "Ignoring corrupt persisted user record");
                Ok(None)
            }
        }
    }

    pub fn save_user(&self, user: &UserIdentity) -> Result<()> {
        let json = user.to_json()?;
        self.store.set(self.origin, STORAGE_KEY_USER, &json)
    }

    pub fn clear_user(&self) -> Result<()> {
        self.store.remove(self.origin, &[STORAGE_KEY_USER])
    }

    /// Remove token and user together.
    pub fn clear(&self) -> Result<()> {
        self.store
            .remove(self.origin, &[STORAGE_KEY_TOKEN, STORAGE_KEY_USER])
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.store.subscribe()
    }

    /// True when `event` touches the token and was written by another
    /// instance.
    pub fn is_foreign_token_change(&self, event: &StorageEvent) -> bool {
        event.origin != self.origin && event.key == STORAGE_KEY_TOKEN
    }
}
