//! Persistent storage backend on RocksDB
//!
//! # Column Families
//!
//! - `cache` - Inbound cache entries (key: len:namespace | hash)
//! - `queue` - Outbound queue entries (key: len:namespace | sequence, big-endian)
//! - `meta` - Queue head/tail counters (key: len:namespace | head / tail)

use super::{namespace_prefix, namespaced_key, DataContainer, Storage};
use crate::clock::{Clock, SystemClock};
use crate::{Error, Result};
use parking_lot::Mutex;
use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, Options, WriteBatch, DB};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

const CF_CACHE: &str = "cache";
const CF_QUEUE: &str = "queue";
const CF_META: &str = "meta";

/// RocksDB storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksStorageConfig {
    /// Data directory
    pub data_dir: PathBuf,

    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,
}

impl Default for RocksStorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/gateway"),
            write_buffer_size_mb: 64,
        }
    }
}

/// Storage persisted in RocksDB
///
/// Queue pointers are updated under a process-local lock, so dequeue is an
/// atomic pop for every handle sharing this instance. Separate processes must
/// not open the same directory (RocksDB refuses a second writer anyway).
pub struct RocksStorage {
    db: Arc<DB>,
    queue_lock: Mutex<()>,
    clock: Arc<dyn Clock>,
}

impl RocksStorage {
    /// Open or create the database
    pub fn open(config: &RocksStorageConfig) -> Result<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    /// Open or create the database, stamping containers with `clock`
    pub fn open_with_clock(config: &RocksStorageConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let path = &config.data_dir;
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(config.write_buffer_size_mb * 1024 * 1024);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_CACHE, Options::default()),
            ColumnFamilyDescriptor::new(CF_QUEUE, Options::default()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;
        tracing::info!(path = ?path, "Opened gateway storage");

        Ok(Self {
            db: Arc::new(db),
            queue_lock: Mutex::new(()),
            clock,
        })
    }

    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    fn encode(container: &DataContainer) -> Result<Vec<u8>> {
        bincode::serialize(container).map_err(|e| Error::Storage(e.to_string()))
    }

    fn decode(raw: &[u8]) -> Result<DataContainer> {
        bincode::deserialize(raw).map_err(|e| Error::Storage(e.to_string()))
    }

    fn queue_key(namespace: &str, seq: u64) -> Vec<u8> {
        let mut key = format!("{}|", namespace_prefix(namespace)).into_bytes();
        key.extend_from_slice(&seq.to_be_bytes());
        key
    }

    fn read_counter(&self, key: &str) -> Result<u64> {
        let cf = self.cf(CF_META)?;
        match self.db.get_cf(&cf, key)? {
            Some(raw) => {
                let bytes: [u8; 8] = raw
                    .as_slice()
                    .try_into()
                    .map_err(|_| Error::Storage(format!("Corrupt queue counter {}", key)))?;
                Ok(u64::from_be_bytes(bytes))
            }
            None => Ok(0),
        }
    }
}

impl Storage for RocksStorage {
    fn put(&self, namespace: &str, key: &str, data: Vec<u8>) -> Result<()> {
        let cf = self.cf(CF_CACHE)?;
        let container = DataContainer::new(data, self.clock.now());
        self.db
            .put_cf(&cf, namespaced_key(namespace, key), Self::encode(&container)?)?;
        Ok(())
    }

    fn get(&self, namespace: &str, key: &str) -> Result<Option<DataContainer>> {
        let cf = self.cf(CF_CACHE)?;
        let key = namespaced_key(namespace, key);
        let Some(raw) = self.db.get_cf(&cf, &key)? else {
            return Ok(None);
        };

        // Access time is reported, not persisted, so reads never race puts
        Ok(Some(Self::decode(&raw)?.touched(self.clock.now())))
    }

    fn enqueue(&self, namespace: &str, data: Vec<u8>) -> Result<()> {
        let container = DataContainer::new(data, self.clock.now());
        let encoded = Self::encode(&container)?;

        let _guard = self.queue_lock.lock();
        let tail_key = namespaced_key(namespace, "tail");
        let tail = self.read_counter(&tail_key)?;

        let cf_queue = self.cf(CF_QUEUE)?;
        let cf_meta = self.cf(CF_META)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_queue, Self::queue_key(namespace, tail), encoded);
        batch.put_cf(&cf_meta, tail_key, (tail + 1).to_be_bytes());
        self.db.write(batch)?;

        tracing::debug!(namespace, seq = tail, "Entry enqueued");
        Ok(())
    }

    fn dequeue(&self, namespace: &str) -> Result<Option<DataContainer>> {
        let _guard = self.queue_lock.lock();
        let head_key = namespaced_key(namespace, "head");
        let head = self.read_counter(&head_key)?;
        let tail = self.read_counter(&namespaced_key(namespace, "tail"))?;
        if head >= tail {
            return Ok(None);
        }

        let cf_queue = self.cf(CF_QUEUE)?;
        let cf_meta = self.cf(CF_META)?;
        let item_key = Self::queue_key(namespace, head);
        let raw = self.db.get_cf(&cf_queue, &item_key)?.ok_or_else(|| {
            Error::Storage(format!("Queue entry {} missing for {}", head, namespace))
        })?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_queue, &item_key);
        batch.put_cf(&cf_meta, head_key, (head + 1).to_be_bytes());
        self.db.write(batch)?;

        Ok(Some(Self::decode(&raw)?.touched(self.clock.now())))
    }
}
