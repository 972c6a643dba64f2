//! Key-value store abstraction

use crate::error::StorageResult;

/// Key/value pairs returned by prefix scans, in ascending key order
pub type KvPairs = Vec<(Vec<u8>, Vec<u8>)>;

/// Batch operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchOp {
    /// Insert or overwrite
    Put {
        /// Column family
        cf_name: String,
        /// Key
        key: Vec<u8>,
        /// Value
        value: Vec<u8>,
    },
    /// Remove
    Delete {
        /// Column family
        cf_name: String,
        /// Key
        key: Vec<u8>,
    },
}

/// Ordered list of writes applied atomically
#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    operations: Vec<BatchOp>,
}

impl WriteBatch {
    /// Create a new write batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a put operation
    pub fn put(&mut self, cf_name: &str, key: &[u8], value: &[u8]) {
        self.operations.push(BatchOp::Put {
            cf_name: cf_name.to_string(),
            key: key.to_vec(),
            value: value.to_vec(),
        });
    }

    /// Add a delete operation
    pub fn delete(&mut self, cf_name: &str, key: &[u8]) {
        self.operations.push(BatchOp::Delete {
            cf_name: cf_name.to_string(),
            key: key.to_vec(),
        });
    }

    /// Get number of operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Check if batch is empty
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Operations in insertion order
    pub fn into_operations(self) -> Vec<BatchOp> {
        self.operations
    }
}

/// Column-family key-value store.
///
/// Methods take `&self`; backends synchronise internally so a store can be
/// shared behind an `Arc` between the block executor and admin queries.
pub trait KvStore: Send + Sync {
    /// Get a value
    fn get(&self, cf_name: &str, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// All pairs whose key starts with `prefix`, ascending
    fn scan_prefix(&self, cf_name: &str, prefix: &[u8]) -> StorageResult<KvPairs>;

    /// Apply a batch atomically
    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()>;

    /// Put a single value
    fn put(&self, cf_name: &str, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let mut batch = WriteBatch::new();
        batch.put(cf_name, key, value);
        self.write_batch(batch)
    }

    /// Delete a single value
    fn delete(&self, cf_name: &str, key: &[u8]) -> StorageResult<()> {
        let mut batch = WriteBatch::new();
        batch.delete(cf_name, key);
        self.write_batch(batch)
    }

    /// Check if a key is present
    fn contains(&self, cf_name: &str, key: &[u8]) -> StorageResult<bool> {
        Ok(self.get(cf_name, key)?.is_some())
    }
}
