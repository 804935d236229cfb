//! Invalidation bookkeeping for server reads.
//!
//! The cache does not hold response bodies. It tracks a generation per
//! query key: writers (mutations, pushed events, session changes) bump the
//! generation, readers record which generation they last fetched, and a
//! read is due whenever the two differ. Several invalidations between two
//! fetches therefore collapse into one refetch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use tracing::trace;

const INVALIDATION_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Profile,
    Notifications,
    UnreadCount,
    Conversations,
    Messages,
    DateProposals,
    Suggestions,
}

impl QueryKey {
    pub const ALL: [QueryKey; 7] = [
        QueryKey::Profile,
        QueryKey::Notifications,
        QueryKey::UnreadCount,
        QueryKey::Conversations,
        QueryKey::Messages,
        QueryKey::DateProposals,
        QueryKey::Suggestions,
    ];
}

#[derive(Debug, Default, Clone, Copy)]
struct Entry {
    generation: u64,
    fetched: Option<u64>,
}

struct Inner {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    tx: broadcast::Sender<QueryKey>,
}

#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl QueryCache {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(INVALIDATION_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                tx,
            }),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn invalidate(&self, key: QueryKey) {
        self.entries().entry(key).or_default().generation += 1;
        trace!(?key, "Query invalidated");
        let _ = self.inner.tx.send(key);
    }

    pub fn invalidate_many(&self, keys: &[QueryKey]) {
        for key in keys {
            self.invalidate(*key);
        }
    }

    pub fn invalidate_all(&self) {
        self.invalidate_many(&QueryKey::ALL);
    }

    pub fn generation(&self, key: QueryKey) -> u64 {
        self.entries().get(&key).map_or(0, |e| e.generation)
    }

    /// Record that a fetch started at `generation` has landed.
    pub fn mark_fetched(&self, key: QueryKey, generation: u64) {
        let mut entries = self.entries();
        let entry = entries.entry(key).or_default();
        if entry.fetched.map_or(true, |f| f < generation) {
            entry.fetched = Some(generation);
        }
    }

    /// True if the key was never fetched or was invalidated since.
    pub fn needs_refetch(&self, key: QueryKey) -> bool {
        let entries = self.entries();
        match entries.get(&key) {
            Some(entry) => entry.fetched != Some(entry.generation),
            None => true,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueryKey> {
        self.inner.tx.subscribe()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidations_coalesce() {
        let cache = QueryCache::new();
        assert!(cache.needs_refetch(QueryKey::Notifications));

        let generation = cache.generation(QueryKey::Notifications);
        cache.mark_fetched(QueryKey::Notifications, generation);
        assert!(!cache.needs_refetch(QueryKey::Notifications));

        cache.invalidate(QueryKey::Notifications);
        cache.invalidate(QueryKey::Notifications);
        cache.invalidate(QueryKey::Notifications);
        assert!(cache.needs_refetch(QueryKey::Notifications));

        let generation = cache.generation(QueryKey::Notifications);
        assert_eq!(generation, 3);
        cache.mark_fetched(QueryKey::Notifications, generation);
        assert!(!cache.needs_refetch(QueryKey::Notifications));
    }

    #[test]
    fn test_fetch_started_before_invalidation_stays_stale() {
        let cache = QueryCache::new();
        let started = cache.generation(QueryKey::Messages);
        cache.invalidate(QueryKey::Messages);
        cache.mark_fetched(QueryKey::Messages, started);
        assert!(cache.needs_refetch(QueryKey::Messages));
    }

    #[test]
    fn test_late_fetch_does_not_regress() {
        let cache = QueryCache::new();
        cache.invalidate(QueryKey::Profile);
        cache.mark_fetched(QueryKey::Profile, 1);
        cache.mark_fetched(QueryKey::Profile, 0);
        assert!(!cache.needs_refetch(QueryKey::Profile));
    }

    #[test]
    fn test_subscribers_see_keys() {
        let cache = QueryCache::new();
        let mut rx = cache.subscribe();
        cache.invalidate_many(&[QueryKey::Conversations, QueryKey::Messages]);
        assert_eq!(rx.try_recv().unwrap(), QueryKey::Conversations);
        assert_eq!(rx.try_recv().unwrap(), QueryKey::Messages);
    }

    #[test]
    fn test_invalidate_all_touches_every_key() {
        let cache = QueryCache::new();
        cache.invalidate_all();
        for key in QueryKey::ALL {
            assert_eq!(cache.generation(key), 1);
        }
    }
}
