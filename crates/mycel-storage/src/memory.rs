//! In-memory backend

use crate::db::ALL_CFS;
use crate::error::{StorageError, StorageResult};
use crate::traits::{BatchOp, KvPairs, KvStore, WriteBatch};
use parking_lot::RwLock;
use std::collections::BTreeMap;

type Table = BTreeMap<Vec<u8>, Vec<u8>>;

/// `KvStore` over ordered maps, one per column family
pub struct MemoryDb {
    tables: RwLock<BTreeMap<String, Table>>,
}

impl MemoryDb {
    /// Empty store with the standard column families
    pub fn new() -> Self {
        let tables = ALL_CFS
            .iter()
            .map(|name| (name.to_string(), Table::new()))
            .collect();
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Number of keys in a column family
    pub fn len(&self, cf_name: &str) -> usize {
        self.tables.read().get(cf_name).map(|t| t.len()).unwrap_or(0)
    }
}

impl Default for MemoryDb {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for MemoryDb {
    fn get(&self, cf_name: &str, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let tables = self.tables.read();
        let table = tables
            .get(cf_name)
            .ok_or_else(|| StorageError::InvalidColumnFamily(cf_name.to_string()))?;
        Ok(table.get(key).cloned())
    }

    fn scan_prefix(&self, cf_name: &str, prefix: &[u8]) -> StorageResult<KvPairs> {
        let tables = self.tables.read();
        let table = tables
            .get(cf_name)
            .ok_or_else(|| StorageError::InvalidColumnFamily(cf_name.to_string()))?;
        Ok(table
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        let ops = batch.into_operations();
        let mut tables = self.tables.write();

        // Validate first so a bad column family leaves nothing half-applied.
        for op in &ops {
            let cf_name = match op {
                BatchOp::Put { cf_name, .. } | BatchOp::Delete { cf_name, .. } => cf_name,
            };
            if !tables.contains_key(cf_name) {
                return Err(StorageError::InvalidColumnFamily(cf_name.clone()));
            }
        }

        for op in ops {
            match op {
                BatchOp::Put { cf_name, key, value } => {
                    if let Some(table) = tables.get_mut(&cf_name) {
                        table.insert(key, value);
                    }
                }
                BatchOp::Delete { cf_name, key } => {
                    if let Some(table) = tables.get_mut(&cf_name) {
                        table.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }
}
