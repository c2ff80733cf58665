use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::{
    ChangeCallback, Collection, CollectionStore, RawTask, StoreError, StoreResult, StoredRecord,
    SubscriptionHandle, records_from_map, records_to_map,
};

#[derive(Default)]
struct State {
    collections: HashMap<Collection, Map<String, Value>>,
    subscribers: HashMap<Collection, Vec<(u64, ChangeCallback)>>,
}

struct Inner {
    state: Mutex<State>,
    online: AtomicBool,
    next_subscriber: AtomicU64,
}

/// Shared in-process store that pushes every change to its subscribers.
///
/// Clones share the same backend, so each clone behaves like another client
/// connected to the same database. Subscribers are notified after every
/// successful save, including the saving client's own writes.
#[derive(Clone)]
pub struct RealtimeStore {
    inner: Arc<Inner>,
}

impl Default for RealtimeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RealtimeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeStore")
            .field("online", &self.is_online())
            .finish_non_exhaustive()
    }
}

impl RealtimeStore {
    /// Empty, online store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                online: AtomicBool::new(true),
                next_subscriber: AtomicU64::new(1),
            }),
        }
    }

    /// Simulate connectivity; while offline every operation fails.
    pub fn set_online(&self, online: bool) {
        self.inner.online.store(online, Ordering::SeqCst);
        info!(online, "realtime store connectivity changed");
    }

    /// Whether the store currently accepts operations.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    /// Number of live subscriptions on a collection.
    #[must_use]
    pub fn subscriber_count(&self, collection: Collection) -> usize {
        self.lock()
            .map(|state| state.subscribers.get(&collection).map_or(0, Vec::len))
            .unwrap_or_default()
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.is_online() {
            Ok(())
        } else {
            Err(StoreError::Unavailable { store: self.name() })
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.inner.state.lock().map_err(|_| StoreError::LockError)
    }
}

fn unsubscribe(inner: &Weak<Inner>, collection: Collection, id: u64) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    if let Ok(mut state) = inner.state.lock()
        && let Some(list) = state.subscribers.get_mut(&collection)
    {
        list.retain(|(subscriber, _)| *subscriber != id);
        debug!(%collection, subscriber = id, "unsubscribed");
    }
}

impl CollectionStore for RealtimeStore {
    fn name(&self) -> &'static str {
        "realtime"
    }

    fn load(&self, collection: Collection) -> StoreResult<Vec<RawTask>> {
        self.ensure_online()?;
        let state = self.lock()?;
        let records: Vec<RawTask> = state
            .collections
            .get(&collection)
            .map(records_from_map)
            .unwrap_or_default();
        debug!(%collection, count = records.len(), "loaded realtime collection");
        Ok(records)
    }

    fn save(&self, collection: Collection, records: &[StoredRecord]) -> StoreResult<()> {
        self.ensure_online()?;
        let map = records_to_map(records);
        let snapshot = records_from_map(&map);
        let callbacks: Vec<ChangeCallback> = {
            let mut state = self.lock()?;
            state.collections.insert(collection, map);
            state
                .subscribers
                .get(&collection)
                .map(|list| list.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default()
        };
        info!(%collection, count = records.len(), subscribers = callbacks.len(), "saved realtime collection");
        for callback in callbacks {
            callback(collection, &snapshot);
        }
        Ok(())
    }

    fn subscribe(
        &self,
        collection: Collection,
        callback: ChangeCallback,
    ) -> StoreResult<SubscriptionHandle> {
        if let Err(err) = self.ensure_online() {
            warn!(%collection, "cannot subscribe while offline");
            return Err(err);
        }
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.lock()?
            .subscribers
            .entry(collection)
            .or_default()
            .push((id, callback));
        debug!(%collection, subscriber = id, "subscribed");
        let weak = Arc::downgrade(&self.inner);
        Ok(SubscriptionHandle::new(move || {
            unsubscribe(&weak, collection, id);
        }))
    }
}
