//! Local notification list.
//!
//! Entries come from two sources: pushed events on the real-time channel
//! and the periodic fetch of `notifications`. Both go through this feed,
//! which keeps at most one entry per id, newest first. The unread count is
//! derived from the entries, so it can never drift from them or go
//! negative.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use matcha_shared::notification::Notification;
use matcha_shared::types::NotificationId;

#[derive(Debug, Default)]
pub struct NotificationFeed {
    entries: Mutex<Vec<Notification>>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Newest first.
    pub fn snapshot(&self) -> Vec<Notification> {
        self.entries().clone()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn unread_count(&self) -> usize {
        self.entries().iter().filter(|n| !n.is_read).count()
    }

    /// Insert a pushed notification. Returns `true` if the id was not yet
    /// known. A known id is left as is, except that a read flag is never
    /// cleared.
    pub fn upsert(&self, notification: Notification) -> bool {
        let mut entries = self.entries();
        let inserted = insert(&mut entries, notification);
        sort(&mut entries);
        inserted
    }

    /// Replace the list with a fresh server fetch.
    ///
    /// Read flags set locally survive even if the server still reports the
    /// entry unread. Pushed entries missing from the fetch are kept only
    /// if they are newer than anything the server returned, i.e. they
    /// arrived after the fetch was served.
    pub fn reconcile(&self, fetched: Vec<Notification>) {
        let mut entries = self.entries();

        let read_locally: HashSet<NotificationId> = entries
            .iter()
            .filter(|n| n.is_read)
            .map(|n| n.id)
            .collect();
        let newest_fetched = fetched.iter().map(|n| n.id).max();

        let mut merged = Vec::with_capacity(fetched.len());
        for mut n in fetched {
            if read_locally.contains(&n.id) {
                n.is_read = true;
            }
            insert(&mut merged, n);
        }

        let mut kept = 0;
        for n in entries.drain(..) {
            if newest_fetched.map_or(true, |max| n.id > max) && insert(&mut merged, n) {
                kept += 1;
            }
        }

        sort(&mut merged);
        *entries = merged;
        debug!(
            total = entries.len(),
            kept_pushed = kept,
            "Reconciled notification feed"
        );
    }

    /// Returns `true` if the entry existed and was unread.
    pub fn mark_read(&self, id: NotificationId) -> bool {
        let mut entries = self.entries();
        match entries.iter_mut().find(|n| n.id == id) {
            Some(n) if !n.is_read => {
                n.is_read = true;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&self) {
        self.entries().clear();
    }
}

fn insert(entries: &mut Vec<Notification>, notification: Notification) -> bool {
    match entries.iter_mut().find(|n| n.id == notification.id) {
        Some(existing) => {
            existing.is_read |= notification.is_read;
            false
        }
        None => {
            entries.push(notification);
            true
        }
    }
}

fn sort(entries: &mut [Notification]) {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}
