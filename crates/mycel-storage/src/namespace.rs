//! Per-module key namespaces.
//!
//! Module state lives in the `modules` column family under
//! `module_id || 0x00 || key`. The set of known namespaces is recorded in
//! `meta` so an added-but-empty module is still observable. The structural
//! operations here ([`create`], [`delete`], [`rename`]) are what an upgrade's
//! store delta is made of.

use crate::db::cf;
use crate::error::{StorageError, StorageResult};
use crate::traits::{KvStore, WriteBatch};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Separator between module id and key
pub const SEPARATOR: u8 = 0x00;

const REGISTRY_PREFIX: &[u8] = b"ns/";

fn validate_id(module: &str) -> StorageResult<()> {
    if module.is_empty() || module.as_bytes().contains(&SEPARATOR) {
        return Err(StorageError::InvalidNamespace(module.to_string()));
    }
    Ok(())
}

/// Key prefix of a module's namespace
pub fn prefix(module: &str) -> Vec<u8> {
    let mut p = Vec::with_capacity(module.len() + 1);
    p.extend_from_slice(module.as_bytes());
    p.push(SEPARATOR);
    p
}

fn full_key(module: &str, key: &[u8]) -> Vec<u8> {
    let mut k = prefix(module);
    k.extend_from_slice(key);
    k
}

fn registry_key(module: &str) -> Vec<u8> {
    let mut k = REGISTRY_PREFIX.to_vec();
    k.extend_from_slice(module.as_bytes());
    k
}

/// Register an empty namespace. Existing state is left untouched.
pub fn create(store: &dyn KvStore, module: &str) -> StorageResult<()> {
    validate_id(module)?;
    store.put(cf::META, &registry_key(module), &[])
}

/// Namespace is registered or holds any key
pub fn exists(store: &dyn KvStore, module: &str) -> StorageResult<bool> {
    validate_id(module)?;
    if store.contains(cf::META, &registry_key(module))? {
        return Ok(true);
    }
    Ok(!store.scan_prefix(cf::MODULES, &prefix(module))?.is_empty())
}

/// Registered namespaces, ascending
pub fn list(store: &dyn KvStore) -> StorageResult<Vec<String>> {
    store
        .scan_prefix(cf::META, REGISTRY_PREFIX)?
        .into_iter()
        .map(|(k, _)| {
            String::from_utf8(k[REGISTRY_PREFIX.len()..].to_vec())
                .map_err(|e| StorageError::Deserialization(e.to_string()))
        })
        .collect()
}

/// Remove every key of a namespace and its registration. Returns keys removed.
pub fn delete(store: &dyn KvStore, module: &str) -> StorageResult<usize> {
    validate_id(module)?;
    let pairs = store.scan_prefix(cf::MODULES, &prefix(module))?;
    let mut batch = WriteBatch::new();
    for (key, _) in &pairs {
        batch.delete(cf::MODULES, key);
    }
    batch.delete(cf::META, &registry_key(module));
    store.write_batch(batch)?;
    tracing::debug!(module, keys = pairs.len(), "namespace deleted");
    Ok(pairs.len())
}

/// Move every key of `from` under `to`, leaving nothing behind.
///
/// Fails if `to` already holds state. Returns keys moved.
pub fn rename(store: &dyn KvStore, from: &str, to: &str) -> StorageResult<usize> {
    validate_id(from)?;
    validate_id(to)?;
    if exists(store, to)? {
        return Err(StorageError::NamespaceExists(to.to_string()));
    }

    let old_prefix = prefix(from);
    let pairs = store.scan_prefix(cf::MODULES, &old_prefix)?;
    let mut batch = WriteBatch::new();
    for (key, value) in &pairs {
        batch.delete(cf::MODULES, key);
        batch.put(cf::MODULES, &full_key(to, &key[old_prefix.len()..]), value);
    }
    batch.delete(cf::META, &registry_key(from));
    batch.put(cf::META, &registry_key(to), &[]);
    store.write_batch(batch)?;
    tracing::debug!(from, to, keys = pairs.len(), "namespace renamed");
    Ok(pairs.len())
}

/// A module's view of the store: keys are relative to its namespace
#[derive(Clone, Copy)]
pub struct ModuleStore<'a> {
    store: &'a dyn KvStore,
    module: &'a str,
}

impl<'a> ModuleStore<'a> {
    /// View `module`'s namespace in `store`
    pub fn new(store: &'a dyn KvStore, module: &'a str) -> Self {
        Self { store, module }
    }

    /// Module id
    pub fn module(&self) -> &str {
        self.module
    }

    /// Raw get
    pub fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.store.get(cf::MODULES, &full_key(self.module, key))
    }

    /// Raw set; registers the namespace on first write
    pub fn set(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        validate_id(self.module)?;
        let mut batch = WriteBatch::new();
        batch.put(cf::MODULES, &full_key(self.module, key), value);
        batch.put(cf::META, &registry_key(self.module), &[]);
        self.store.write_batch(batch)
    }

    /// Remove a key
    pub fn remove(&self, key: &[u8]) -> StorageResult<()> {
        self.store.delete(cf::MODULES, &full_key(self.module, key))
    }

    /// Check if a key is present
    pub fn has(&self, key: &[u8]) -> StorageResult<bool> {
        self.store.contains(cf::MODULES, &full_key(self.module, key))
    }

    /// Pairs under a relative key prefix, keys relative to the namespace
    pub fn scan(&self, key_prefix: &[u8]) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let strip = self.module.len() + 1;
        Ok(self
            .store
            .scan_prefix(cf::MODULES, &full_key(self.module, key_prefix))?
            .into_iter()
            .map(|(k, v)| (k[strip..].to_vec(), v))
            .collect())
    }

    /// Get a JSON-encoded value
    pub fn get_json<T: DeserializeOwned>(&self, key: &[u8]) -> StorageResult<Option<T>> {
        match self.get(key)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StorageError::Deserialization(e.to_string())),
            None => Ok(None),
        }
    }

    /// Set a JSON-encoded value
    pub fn set_json<T: Serialize>(&self, key: &[u8], value: &T) -> StorageResult<()> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.set(key, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDb;

    #[test]
    fn test_module_store_is_isolated() {
        let db = MemoryDb::new();
        let bank = ModuleStore::new(&db, "bank");
        let bankx = ModuleStore::new(&db, "bankx");
        bank.set(b"k", b"1").unwrap();
        bankx.set(b"k", b"2").unwrap();

        assert_eq!(bank.scan(b"").unwrap(), vec![(b"k".to_vec(), b"1".to_vec())]);
        assert_eq!(list(&db).unwrap(), vec!["bank".to_string(), "bankx".to_string()]);
    }

    #[test]
    fn test_delete_removes_every_key() {
        let db = MemoryDb::new();
        let group = ModuleStore::new(&db, "group");
        for i in 0..5u8 {
            group.set(&[i], &[i]).unwrap();
        }
        ModuleStore::new(&db, "auth").set(b"a", b"x").unwrap();

        assert_eq!(delete(&db, "group").unwrap(), 5);
        assert!(!exists(&db, "group").unwrap());
        assert!(exists(&db, "auth").unwrap());
        assert!(db.scan_prefix(cf::MODULES, &prefix("group")).unwrap().is_empty());
    }

    #[test]
    fn test_rename_preserves_pairs_and_leaves_no_residue() {
        let db = MemoryDb::new();
        let old = ModuleStore::new(&db, "wasmx");
        old.set(b"a", b"1").unwrap();
        old.set(b"b\x00c", b"2").unwrap();

        assert_eq!(rename(&db, "wasmx", "wasm").unwrap(), 2);
        let new = ModuleStore::new(&db, "wasm");
        assert_eq!(
            new.scan(b"").unwrap(),
            vec![(b"a".to_vec(), b"1".to_vec()), (b"b\x00c".to_vec(), b"2".to_vec())]
        );
        assert!(!exists(&db, "wasmx").unwrap());
    }

    #[test]
    fn test_rename_onto_existing_fails() {
        let db = MemoryDb::new();
        ModuleStore::new(&db, "a").set(b"k", b"v").unwrap();
        create(&db, "b").unwrap();
        assert!(matches!(
            rename(&db, "a", "b"),
            Err(StorageError::NamespaceExists(_))
        ));
    }

    #[test]
    fn test_create_is_observable_while_empty() {
        let db = MemoryDb::new();
        create(&db, "tokenfactory").unwrap();
        assert!(exists(&db, "tokenfactory").unwrap());
        assert!(ModuleStore::new(&db, "tokenfactory").scan(b"").unwrap().is_empty());
        assert!(create(&db, "").is_err());
    }

    #[test]
    fn test_json_values() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Params {
            fee: u64,
        }
        let db = MemoryDb::new();
        let store = ModuleStore::new(&db, "tokenfactory");
        store.set_json(b"params", &Params { fee: 7 }).unwrap();
        assert_eq!(store.get_json::<Params>(b"params").unwrap(), Some(Params { fee: 7 }));
        assert_eq!(store.get_json::<Params>(b"missing").unwrap(), None);
    }
}
