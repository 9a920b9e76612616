//! Process-wide registry of live `/ws/payment` connections.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use paygate_core::CorrelationKey;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use super::connection::ConnectionHandle;

/// Registry-assigned connection id. Allocated in increasing order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn_{}", self.0)
    }
}

struct Record {
    key: CorrelationKey,
    handle: Arc<ConnectionHandle>,
}

/// Live connections keyed by id, each tagged with a correlation key.
///
/// All access goes through one mutex that is never held across an await.
/// Scans work on a snapshot, so a caller iterating matches never observes
/// concurrent register/unregister calls.
pub struct ConnectionRegistry {
    records: Mutex<BTreeMap<ConnectionId, Record>>,
    next_id: AtomicU64,
    emptied: Notify,
}

impl ConnectionRegistry {
    /// Create an empty registry. Ids start at 1.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            emptied: Notify::new(),
        }
    }

    /// Add a record. Never fails.
    pub fn register(&self, handle: Arc<ConnectionHandle>, key: CorrelationKey) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(conn_id = %id, key = %key, "registering connection");
        let _ = self.records.lock().insert(id, Record { key, handle });
        id
    }

    /// Like [`register`](Self::register), but removal happens when the
    /// returned guard drops.
    pub fn register_guarded(
        self: &Arc<Self>,
        handle: Arc<ConnectionHandle>,
        key: CorrelationKey,
    ) -> Registration {
        let id = self.register(handle, key);
        Registration {
            registry: Arc::clone(self),
            id,
        }
    }

    /// Remove a record. Returns `false` if it was already gone.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let (removed, now_empty) = {
            let mut records = self.records.lock();
            let removed = records.remove(&id).is_some();
            (removed, records.is_empty())
        };
        if removed {
            debug!(conn_id = %id, "unregistered connection");
            if now_empty {
                self.emptied.notify_waiters();
            }
        }
        removed
    }

    /// Handles of every current record whose key matches `key`, in
    /// registration order.
    pub fn for_each_matching(
        &self,
        key: &CorrelationKey,
    ) -> impl Iterator<Item = (ConnectionId, Arc<ConnectionHandle>)> + use<> {
        let snapshot: Vec<_> = self
            .records
            .lock()
            .iter()
            .filter(|(_, record)| record.key.matches(key))
            .map(|(id, record)| (*id, Arc::clone(&record.handle)))
            .collect();
        snapshot.into_iter()
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Resolves once the last record has been removed.
    pub async fn drained(&self) {
        loop {
            let emptied = self.emptied.notified();
            if self.is_empty() {
                return;
            }
            emptied.await;
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps a connection registered for as long as it lives.
pub struct Registration {
    registry: Arc<ConnectionRegistry>,
    id: ConnectionId,
}

impl Registration {
    /// Id of the guarded record.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let _ = self.registry.unregister(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn handle() -> (Arc<ConnectionHandle>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(8);
        (Arc::new(ConnectionHandle::new(tx)), rx)
    }

    fn ids(registry: &ConnectionRegistry, key: &str) -> Vec<ConnectionId> {
        registry
            .for_each_matching(&key.into())
            .map(|(id, _)| id)
            .collect()
    }

    #[test]
    fn ids_are_distinct_and_increasing() {
        let reg = ConnectionRegistry::new();
        let (h, _rx) = handle();
        let a = reg.register(Arc::clone(&h), "k".into());
        let b = reg.register(h, "k".into());
        assert!(a < b);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn matching_filters_by_key_in_insertion_order() {
        let reg = ConnectionRegistry::new();
        let (h1, _r1) = handle();
        let (h2, _r2) = handle();
        let (h3, _r3) = handle();
        let a = reg.register(h1, "tx1".into());
        let _b = reg.register(h2, "tx2".into());
        let c = reg.register(h3, "tx1".into());

        assert_eq!(ids(&reg, "tx1"), vec![a, c]);
        assert_eq!(ids(&reg, "tx3"), Vec::<ConnectionId>::new());
    }

    #[test]
    fn empty_key_is_matched_exactly() {
        let reg = ConnectionRegistry::new();
        let (h1, _r1) = handle();
        let (h2, _r2) = handle();
        let anon = reg.register(h1, CorrelationKey::empty());
        let keyed = reg.register(h2, "tx1".into());

        assert_eq!(ids(&reg, ""), vec![anon]);
        assert_eq!(ids(&reg, "tx1"), vec![keyed]);
    }

    #[test]
    fn unregister_is_idempotent() {
        let reg = ConnectionRegistry::new();
        let (h1, _r1) = handle();
        let (h2, _r2) = handle();
        let a = reg.register(h1, "tx1".into());
        let b = reg.register(h2, "tx1".into());

        assert!(reg.unregister(a));
        assert!(!reg.unregister(a));
        assert_eq!(ids(&reg, "tx1"), vec![b]);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn snapshot_is_unaffected_by_later_mutation() {
        let reg = ConnectionRegistry::new();
        let (h1, _r1) = handle();
        let (h2, _r2) = handle();
        let a = reg.register(h1, "tx1".into());
        let b = reg.register(h2, "tx1".into());

        let mut iter = reg.for_each_matching(&"tx1".into());
        assert!(reg.unregister(b));
        assert_eq!(iter.next().map(|(id, _)| id), Some(a));
        assert_eq!(iter.next().map(|(id, _)| id), Some(b));
        assert!(iter.next().is_none());

        // A fresh scan sees the removal.
        assert_eq!(ids(&reg, "tx1"), vec![a]);
    }

    #[test]
    fn guard_unregisters_on_drop() {
        let reg = Arc::new(ConnectionRegistry::new());
        let (h, _rx) = handle();
        let guard = reg.register_guarded(h, "tx1".into());
        let id = guard.id();
        assert_eq!(ids(&reg, "tx1"), vec![id]);

        drop(guard);
        assert!(reg.is_empty());
        assert!(ids(&reg, "tx1").is_empty());
        assert!(!reg.unregister(id));
    }

    #[tokio::test]
    async fn drained_resolves_when_last_record_leaves() {
        let reg = Arc::new(ConnectionRegistry::new());
        let (h1, _r1) = handle();
        let (h2, _r2) = handle();
        let a = reg.register(h1, "tx1".into());
        let b = reg.register(h2, "tx2".into());

        let waiter = tokio::spawn({
            let reg = Arc::clone(&reg);
            async move { reg.drained().await }
        });
        assert!(reg.unregister(a));
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        assert!(reg.unregister(b));
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn drained_is_immediate_when_empty() {
        ConnectionRegistry::new().drained().await;
    }

    #[test]
    fn concurrent_register_and_scan() {
        let reg = Arc::new(ConnectionRegistry::new());
        let workers: Vec<_> = (0..8)
            .map(|i| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let (h, _rx) = handle();
                        let id = reg.register(h, format!("k{i}").into());
                        let _ = reg.for_each_matching(&format!("k{i}").into()).count();
                        assert!(reg.unregister(id));
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        assert!(reg.is_empty());
    }

    #[test]
    fn display_id() {
        let reg = ConnectionRegistry::new();
        let (h, _rx) = handle();
        assert_eq!(reg.register(h, "k".into()).to_string(), "conn_1");
    }
}
