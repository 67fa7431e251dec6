//! In-memory TTL cache with independent namespaces over one store.
//!
//! Expiry is lazy: a stale entry behaves as a miss on read and is removed
//! then. There is no per-key locking; two requests racing on a cold key may
//! both fetch and both write, last write wins. That is accepted, since every
//! computed value for a key is equivalent.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Search,
    Scraped,
    Image,
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Explicitly constructed and injected; never a process-wide global, so tests
/// get an isolated instance per run.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: Mutex<HashMap<(Namespace, String), Entry<V>>>,
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn get(&self, namespace: Namespace, key: &str) -> Option<V> {
        self.get_at(namespace, key, Instant::now())
    }

    pub fn set(&self, namespace: Namespace, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.lock().insert((namespace, key.into()), entry);
    }

    fn get_at(&self, namespace: Namespace, key: &str, now: Instant) -> Option<V> {
        let mut entries = self.lock();
        let slot = (namespace, key.to_string());
        match entries.get(&slot) {
            Some(entry) if now < entry.expires_at => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(&slot);
                None
            }
            None => None,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(Namespace, String), Entry<V>>> {
        // A poisoned lock only means another request panicked mid-write;
        // the map itself is still usable.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
