//! Storage contract
//!
//! A storage backend holds two things per gateway namespace:
//!
//! - a cache of serialized inbound responses, keyed by request hash
//! - a FIFO queue of serialized outbound requests awaiting resend
//!
//! Every stored value comes back wrapped in a [`DataContainer`] that records
//! when it was stored and when it was last read.

use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocks;

pub use memory::MemoryStorage;
#[cfg(feature = "rocksdb")]
pub use rocks::{RocksStorage, RocksStorageConfig};

/// Timestamped wrapper around stored bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataContainer {
    #[serde(with = "serde_bytes")]
    data: Vec<u8>,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
}

impl DataContainer {
    /// Wrap freshly stored bytes
    pub fn new(data: Vec<u8>, created_at: DateTime<Utc>) -> Self {
        Self {
            data,
            created_at,
            last_accessed_at: created_at,
        }
    }

    /// Stored bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the container, keeping the bytes
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// When the value was stored; never changes
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the value was last read from storage
    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        self.last_accessed_at
    }

    /// Copy of this container marked as read at `at`
    pub(crate) fn touched(&self, at: DateTime<Utc>) -> Self {
        Self {
            data: self.data.clone(),
            created_at: self.created_at,
            last_accessed_at: at,
        }
    }
}

/// Namespaced cache and queue store
///
/// Implementations must make `dequeue` an atomic pop: two callers racing on
/// the same namespace never receive the same entry.
pub trait Storage: Send + Sync {
    /// Store `data` under `(namespace, key)`, replacing any previous value
    fn put(&self, namespace: &str, key: &str, data: Vec<u8>) -> Result<()>;

    /// Fetch the value stored under `(namespace, key)`
    fn get(&self, namespace: &str, key: &str) -> Result<Option<DataContainer>>;

    /// Append `data` to the tail of the namespace queue
    fn enqueue(&self, namespace: &str, data: Vec<u8>) -> Result<()>;

    /// Pop the head of the namespace queue
    fn dequeue(&self, namespace: &str) -> Result<Option<DataContainer>>;
}

impl<S: Storage + ?Sized> Storage for std::sync::Arc<S> {
    fn put(&self, namespace: &str, key: &str, data: Vec<u8>) -> Result<()> {
        (**self).put(namespace, key, data)
    }

    fn get(&self, namespace: &str, key: &str) -> Result<Option<DataContainer>> {
        (**self).get(namespace, key)
    }

    fn enqueue(&self, namespace: &str, data: Vec<u8>) -> Result<()> {
        (**self).enqueue(namespace, data)
    }

    fn dequeue(&self, namespace: &str) -> Result<Option<DataContainer>> {
        (**self).dequeue(namespace)
    }
}

/// Compose the backend key for a namespaced cache entry
///
/// The namespace is length-prefixed, so no `(namespace, key)` pair can
/// produce the key of another pair even when either part contains `|`.
pub fn namespaced_key(namespace: &str, key: &str) -> String {
    format!("{}|{}", namespace_prefix(namespace), key)
}

/// Unambiguous prefix shared by every key of `namespace`
pub(crate) fn namespace_prefix(namespace: &str) -> String {
    format!("{}:{}", namespace.len(), namespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_touch_keeps_creation_time() {
        let created = Utc::now();
        let container = DataContainer::new(b"payload".to_vec(), created);
        assert_eq!(container.last_accessed_at(), created);

        let later = created + Duration::seconds(30);
        let touched = container.touched(later);
        assert_eq!(touched.created_at(), created);
        assert_eq!(touched.last_accessed_at(), later);
        assert_eq!(touched.data(), b"payload");
    }

    #[test]
    fn test_namespaced_key() {
        assert_eq!(namespaced_key("geo", "abc"), "3:geo|abc");
    }

    #[test]
    fn test_namespaced_key_separator_in_parts() {
        assert_ne!(namespaced_key("a", "b|c"), namespaced_key("a|b", "c"));
        assert_ne!(namespaced_key("a:1", "x"), namespaced_key("a", "1:x"));
    }
}
