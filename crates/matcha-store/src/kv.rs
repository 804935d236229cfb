//! Shared key-value storage with a change signal.
//!
//! Several client instances may share one store. Writers tag each change
//! with their instance id so listeners can tell their own writes from
//! everybody else's.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;

/// Capacity of the change broadcast. Slow listeners that lag behind just
/// re-read the store, so dropping old events is harmless.
const EVENT_CAPACITY: usize = 64;

/// One key changed (written or removed) by the instance `origin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub origin: Uuid,
}

pub trait KeyValueStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, origin: Uuid, key: &str, value: &str) -> Result<()>;

    /// Remove all `keys` atomically. One event is published per key.
    fn remove(&self, origin: Uuid, keys: &[&str]) -> Result<()>;

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent>;
}

fn publish(events: &broadcast::Sender<StorageEvent>, origin: Uuid, keys: &[&str]) {
    for key in keys {
        // No receivers is fine.
        let _ = events.send(StorageEvent {
            key: (*key).to_string(),
            origin,
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// SQLite-backed store.
pub struct SqliteStore {
    db: Mutex<Database>,
    events: broadcast::Sender<StorageEvent>,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            db: Mutex::new(db),
            events,
        }
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        lock(&self.db).kv_get(key)
    }

    fn set(&self, origin: Uuid, key: &str, value: &str) -> Result<()> {
        lock(&self.db).kv_set(key, value)?;
        publish(&self.events, origin, &[key]);
        Ok(())
    }

    fn remove(&self, origin: Uuid, keys: &[&str]) -> Result<()> {
        lock(&self.db).kv_remove_many(keys)?;
        publish(&self.events, origin, keys);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}

/// Volatile store with the same semantics, for tests and `:memory:`.
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            values: Mutex::new(HashMap::new()),
            events,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.values).get(key).cloned())
    }

    fn set(&self, origin: Uuid, key: &str, value: &str) -> Result<()> {
        lock(&self.values).insert(key.to_string(), value.to_string());
        publish(&self.events, origin, &[key]);
        Ok(())
    }

    fn remove(&self, origin: Uuid, keys: &[&str]) -> Result<()> {
        {
            let mut values = lock(&self.values);
            for key in keys {
                values.remove(*key);
            }
        }
        publish(&self.events, origin, keys);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}
