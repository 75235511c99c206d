//! In-process storage backend

use super::{namespaced_key, DataContainer, Storage};
use crate::clock::{Clock, SystemClock};
use crate::Result;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Inner {
    cache: HashMap<String, DataContainer>,
    queues: HashMap<String, VecDeque<DataContainer>>,
}

/// Storage kept in memory behind a single lock
///
/// Reads refresh the entry's `last_accessed_at`; `created_at` is fixed when
/// the value is stored.
pub struct MemoryStorage {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
}

impl MemoryStorage {
    /// Create an empty storage stamped by the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty storage stamped by `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            clock,
        }
    }

    /// Number of entries waiting in the namespace queue
    pub fn queue_len(&self, namespace: &str) -> usize {
        self.inner
            .lock()
            .queues
            .get(namespace)
            .map(VecDeque::len)
            .unwrap_or(0)
    }

    /// Number of cache entries across all namespaces
    pub fn cache_len(&self) -> usize {
        self.inner.lock().cache.len()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl Storage for MemoryStorage {
    fn put(&self, namespace: &str, key: &str, data: Vec<u8>) -> Result<()> {
        let container = DataContainer::new(data, self.clock.now());
        self.inner
            .lock()
            .cache
            .insert(namespaced_key(namespace, key), container);
        Ok(())
    }

    fn get(&self, namespace: &str, key: &str) -> Result<Option<DataContainer>> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        Ok(inner
            .cache
            .get_mut(&namespaced_key(namespace, key))
            .map(|entry| {
                *entry = entry.touched(now);
                entry.clone()
            }))
    }

    fn enqueue(&self, namespace: &str, data: Vec<u8>) -> Result<()> {
        let container = DataContainer::new(data, self.clock.now());
        self.inner
            .lock()
            .queues
            .entry(namespace.to_string())
            .or_default()
            .push_back(container);
        Ok(())
    }

    fn dequeue(&self, namespace: &str) -> Result<Option<DataContainer>> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        Ok(inner
            .queues
            .get_mut(namespace)
            .and_then(VecDeque::pop_front)
            .map(|container| container.touched(now)))
    }
}
