//! Write-buffering branch over a parent store

use crate::error::StorageResult;
use crate::traits::{BatchOp, KvPairs, KvStore, WriteBatch};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Pending writes; `None` marks a deletion
type Overlay = BTreeMap<(String, Vec<u8>), Option<Vec<u8>>>;

/// Layered store with fallback to the parent.
///
/// Reads see the branch's own writes first. Nothing reaches the parent until
/// [`CacheStore::commit`], which flushes every pending write as one batch.
/// Dropping the branch discards it.
pub struct CacheStore {
    parent: Arc<dyn KvStore>,
    overlay: Mutex<Overlay>,
}

impl CacheStore {
    /// Open a branch over `parent`
    pub fn new(parent: Arc<dyn KvStore>) -> Self {
        Self {
            parent,
            overlay: Mutex::new(Overlay::new()),
        }
    }

    /// Flush pending writes to the parent atomically
    pub fn commit(&self) -> StorageResult<()> {
        let mut overlay = self.overlay.lock();
        if overlay.is_empty() {
            return Ok(());
        }
        let mut batch = WriteBatch::new();
        for ((cf_name, key), value) in overlay.iter() {
            match value {
                Some(v) => batch.put(cf_name, key, v),
                None => batch.delete(cf_name, key),
            }
        }
        let writes = batch.len();
        self.parent.write_batch(batch)?;
        overlay.clear();
        tracing::trace!(writes, "cache branch committed");
        Ok(())
    }

    /// Drop every pending write
    pub fn discard(&self) {
        self.overlay.lock().clear();
    }

    /// Number of pending writes
    pub fn pending(&self) -> usize {
        self.overlay.lock().len()
    }

    /// Check if any write is pending
    pub fn is_dirty(&self) -> bool {
        !self.overlay.lock().is_empty()
    }
}

impl KvStore for CacheStore {
    fn get(&self, cf_name: &str, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        if let Some(cached) = self.overlay.lock().get(&(cf_name.to_string(), key.to_vec())) {
            return Ok(cached.clone());
        }
        self.parent.get(cf_name, key)
    }

    fn scan_prefix(&self, cf_name: &str, prefix: &[u8]) -> StorageResult<KvPairs> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.scan_prefix(cf_name, prefix)?.into_iter().collect();

        let overlay = self.overlay.lock();
        let start = (cf_name.to_string(), prefix.to_vec());
        for ((cf, key), value) in overlay.range(start..) {
            if cf != cf_name || !key.starts_with(prefix) {
                break;
            }
            match value {
                Some(v) => {
                    merged.insert(key.clone(), v.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        let mut overlay = self.overlay.lock();
        for op in batch.into_operations() {
            match op {
                BatchOp::Put { cf_name, key, value } => {
                    overlay.insert((cf_name, key), Some(value));
                }
                BatchOp::Delete { cf_name, key } => {
                    overlay.insert((cf_name, key), None);
                }
            }
        }
        Ok(())
    }
}
