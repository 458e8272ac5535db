use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use serde_json::Value;
use tracing::trace;

/// Callback type for change notifications: `(dot_path, payload)`.
pub type WatchCallback = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Unique id of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

#[derive(Clone)]
struct WatcherEntry {
    id: SubscriptionId,
    callback: WatchCallback,
}

type WatcherTable = BTreeMap<String, Vec<WatcherEntry>>;

/// Pub/sub registry keyed by exact dot-path.
///
/// - `on(dot_path, cb)` registers a callback and returns a [`Subscription`].
/// - `emit(dot_path, payload)` calls every callback registered for exactly
///   that dot-path, synchronously, in registration order.
///
/// There is no wildcard or ancestor matching: a change at `a.b.c` does not
/// reach watchers of `a.b`. Whoever emits decides which dot-paths to notify.
///
/// Callbacks run after the registry lock is released, so they may subscribe,
/// unsubscribe or read the form. Calling back into a write on the same path
/// from inside its own callback recurses; avoiding that is up to the caller.
pub struct Watchers {
    table: Arc<RwLock<WatcherTable>>,
    next_id: AtomicU64,
}

impl Watchers {
    pub fn new() -> Self {
        Self {
            table: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `callback` under `dot_path`.
    pub fn on<F>(&self, dot_path: &str, callback: F) -> Subscription
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = WatcherEntry {
            id,
            callback: Arc::new(callback),
        };
        self.table
            .write()
            .unwrap()
            .entry(dot_path.to_string())
            .or_default()
            .push(entry);

        Subscription {
            id,
            dot_path: dot_path.to_string(),
            table: Arc::downgrade(&self.table),
            active: AtomicBool::new(true),
        }
    }

    /// Notify every watcher of exactly `dot_path`. Returns how many ran.
    pub fn emit(&self, dot_path: &str, payload: &Value) -> usize {
        let entries = match self.table.read().unwrap().get(dot_path) {
            Some(entries) => entries.clone(),
            None => return 0,
        };
        trace!(dot_path, watchers = entries.len(), "emit");
        for entry in &entries {
            (entry.callback)(dot_path, payload);
        }
        entries.len()
    }

    pub fn watcher_count(&self, dot_path: &str) -> usize {
        self.table
            .read()
            .unwrap()
            .get(dot_path)
            .map_or(0, Vec::len)
    }

    pub fn has_watchers(&self, dot_path: &str) -> bool {
        self.watcher_count(dot_path) > 0
    }

    /// Every dot-path with at least one watcher, in order.
    pub fn dot_paths(&self) -> Vec<String> {
        self.table.read().unwrap().keys().cloned().collect()
    }
}

impl Default for Watchers {
    fn default() -> Self {
        Self::new()
    }
}

fn remove_entry(table: &RwLock<WatcherTable>, dot_path: &str, id: SubscriptionId) -> bool {
    let Ok(mut table) = table.write() else {
        return false;
    };
    let Some(entries) = table.get_mut(dot_path) else {
        return false;
    };
    let before = entries.len();
    entries.retain(|entry| entry.id != id);
    let removed = entries.len() < before;
    if entries.is_empty() {
        table.remove(dot_path);
    }
    removed
}

/// Handle for one registration.
///
/// `unsubscribe` removes exactly this registration and may be called any
/// number of times. Dropping the handle unsubscribes too, so a watcher
/// lives as long as its owner holds the handle; use [`detach`](Self::detach)
/// to keep it for the lifetime of the registry instead.
#[must_use = "dropping a Subscription unsubscribes it"]
pub struct Subscription {
    id: SubscriptionId,
    dot_path: String,
    table: Weak<RwLock<WatcherTable>>,
    active: AtomicBool,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn dot_path(&self) -> &str {
        &self.dot_path
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) && self.table.strong_count() > 0
    }

    /// Remove this registration. Returns `true` only on the call that
    /// actually removed it.
    pub fn unsubscribe(&self) -> bool {
        if !self.active.swap(false, Ordering::AcqRel) {
            return false;
        }
        match self.table.upgrade() {
            Some(table) => remove_entry(&table, &self.dot_path, self.id),
            None => false,
        }
    }

    /// Give up the handle without unsubscribing.
    pub fn detach(self) {
        self.active.store(false, Ordering::Release);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("dot_path", &self.dot_path)
            .field("active", &self.active.load(Ordering::Relaxed))
            .finish()
    }
}
