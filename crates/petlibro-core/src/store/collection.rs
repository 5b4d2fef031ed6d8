// ── Generic reactive collection ──
//
// Concurrent keyed storage with push-based change notification via
// `watch` channels. Keys are device serials.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

/// A reactive collection for a single entity type.
///
/// Every mutation bumps a version counter and rebuilds the snapshot that
/// subscribers receive. Snapshots are ordered by key so consumers see a
/// stable listing.
pub(crate) struct EntityCollection<T: Send + Sync + 'static> {
    by_key: DashMap<String, Arc<T>>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,

    /// Full snapshot, rebuilt on mutation.
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<T: Send + Sync + 'static> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            by_key: DashMap::new(),
            version,
            snapshot,
        }
    }

    /// Insert or replace an entity. Returns `true` if the key was new.
    pub(crate) fn upsert(&self, key: String, entity: Arc<T>) -> bool {
        let is_new = self.by_key.insert(key, entity).is_none();
        self.changed();
        is_new
    }

    /// Read-modify-write under the key's lock.
    ///
    /// `update` sees the current value and returns the replacement, or
    /// `None` to leave the entry untouched. Writers to the same key are
    /// serialized; the returned value is what was stored.
    pub(crate) fn upsert_with<F>(&self, key: String, update: F) -> Option<Arc<T>>
    where
        F: FnOnce(Option<&Arc<T>>) -> Option<T>,
    {
        let stored = match self.by_key.entry(key) {
            Entry::Occupied(mut occupied) => {
                let next = Arc::new(update(Some(occupied.get()))?);
                occupied.insert(Arc::clone(&next));
                next
            }
            Entry::Vacant(vacant) => {
                let next = Arc::new(update(None)?);
                vacant.insert(Arc::clone(&next));
                next
            }
        };
        // The shard lock is released at the end of the match above;
        // rebuilding the snapshot iterates every shard.
        self.changed();
        Some(stored)
    }

    /// Remove an entity by key. Returns the removed entity if it existed.
    pub(crate) fn remove(&self, key: &str) -> Option<Arc<T>> {
        let removed = self.by_key.remove(key).map(|(_, v)| v);
        if removed.is_some() {
            self.changed();
        }
        removed
    }

    /// Keep only entries whose key passes `keep`. Returns removed keys.
    pub(crate) fn retain(&self, mut keep: impl FnMut(&str) -> bool) -> Vec<String> {
        let doomed: Vec<String> = self
            .by_key
            .iter()
            .filter(|r| !keep(r.key()))
            .map(|r| r.key().clone())
            .collect();
        for key in &doomed {
            self.by_key.remove(key);
        }
        if !doomed.is_empty() {
            self.changed();
        }
        doomed
    }

    pub(crate) fn get(&self, key: &str) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn changed(&self) {
        self.rebuild_snapshot();
        self.version.send_modify(|v| *v += 1);
    }

    fn rebuild_snapshot(&self) {
        let mut entries: Vec<(String, Arc<T>)> = self
            .by_key
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect();
        entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
        let values = entries.into_iter().map(|(_, v)| v).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn upsert_reports_new_keys() {
        let col: EntityCollection<String> = EntityCollection::new();
        assert!(col.upsert("key1".into(), Arc::new("hello".into())));
        assert!(!col.upsert("key1".into(), Arc::new("world".into())));
        assert_eq!(*col.get("key1").unwrap(), "world");
        assert_eq!(col.version(), 2);
    }

    #[test]
    fn upsert_with_can_decline() {
        let col: EntityCollection<u32> = EntityCollection::new();
        col.upsert("a".into(), Arc::new(5));

        let kept = col.upsert_with("a".into(), |cur| cur.filter(|v| ***v > 10).map(|v| **v + 1));
        assert!(kept.is_none());
        assert_eq!(*col.get("a").unwrap(), 5);
        assert_eq!(col.version(), 1);

        let stored = col.upsert_with("a".into(), |cur| cur.map(|v| **v + 1));
        assert_eq!(stored.as_deref(), Some(&6));
        assert_eq!(col.version(), 2);
    }

    #[test]
    fn snapshot_is_sorted_by_key() {
        let col: EntityCollection<&'static str> = EntityCollection::new();
        col.upsert("c".into(), Arc::new("third"));
        col.upsert("a".into(), Arc::new("first"));
        col.upsert("b".into(), Arc::new("second"));

        let snap: Vec<&str> = col.snapshot().iter().map(|v| **v).collect();
        assert_eq!(snap, vec!["first", "second", "third"]);
    }

    #[test]
    fn retain_drops_unknown_keys() {
        let col: EntityCollection<u8> = EntityCollection::new();
        col.upsert("a".into(), Arc::new(1));
        col.upsert("b".into(), Arc::new(2));

        let removed = col.retain(|key| key == "a");
        assert_eq!(removed, vec!["b".to_owned()]);
        assert_eq!(col.len(), 1);
        assert!(col.remove("a").is_some());
        assert!(col.is_empty());
        assert!(col.snapshot().is_empty());
    }

    #[tokio::test]
    async fn subscribers_see_mutations() {
        let col: EntityCollection<u8> = EntityCollection::new();
        let mut rx = col.subscribe();
        col.upsert("a".into(), Arc::new(1));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);
    }
}
