//! Persisted upgrade state: pending plan, version map, applied and skipped logs

use crate::error::{UpgradeError, UpgradeResult};
use crate::plan::{Plan, VersionMap};
use mycel_primitives::BlockHeight;
use mycel_storage::{cf, KvStore, StorageError};
use serde::de::DeserializeOwned;
use serde::Serialize;

const PLAN_KEY: &[u8] = b"plan";
const VERSION_MAP_KEY: &[u8] = b"version_map";
const DONE_PREFIX: &[u8] = b"done/";
const SKIP_PREFIX: &[u8] = b"skip/";

fn done_key(name: &str) -> Vec<u8> {
    let mut key = DONE_PREFIX.to_vec();
    key.extend_from_slice(name.as_bytes());
    key
}

fn skip_key(height: BlockHeight) -> Vec<u8> {
    let mut key = SKIP_PREFIX.to_vec();
    key.extend_from_slice(&height.to_be_bytes());
    key
}

/// View of the `upgrade` column family
#[derive(Clone, Copy)]
pub struct UpgradeStore<'a> {
    store: &'a dyn KvStore,
}

impl<'a> UpgradeStore<'a> {
    /// Wrap a store
    pub fn new(store: &'a dyn KvStore) -> Self {
        Self { store }
    }

    fn get<T: DeserializeOwned>(&self, key: &[u8]) -> UpgradeResult<Option<T>> {
        match self.store.get(cf::UPGRADE, key)? {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes)
                    .map_err(|e| StorageError::Deserialization(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    fn put<T: Serialize>(&self, key: &[u8], value: &T) -> UpgradeResult<()> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store.put(cf::UPGRADE, key, &bytes)?;
        Ok(())
    }

    /// Pending plan, if any
    pub fn plan(&self) -> UpgradeResult<Option<Plan>> {
        self.get(PLAN_KEY)
    }

    /// Replace the pending plan
    pub fn set_plan(&self, plan: &Plan) -> UpgradeResult<()> {
        self.put(PLAN_KEY, plan)
    }

    /// Remove the pending plan
    pub fn clear_plan(&self) -> UpgradeResult<()> {
        self.store.delete(cf::UPGRADE, PLAN_KEY)?;
        Ok(())
    }

    /// Persisted version map; empty before genesis
    pub fn version_map(&self) -> UpgradeResult<VersionMap> {
        Ok(self.get(VERSION_MAP_KEY)?.unwrap_or_default())
    }

    /// Persist the version map
    pub fn set_version_map(&self, vm: &VersionMap) -> UpgradeResult<()> {
        self.put(VERSION_MAP_KEY, vm)
    }

    /// Record that `name` was applied at `height`
    pub fn mark_done(&self, name: &str, height: BlockHeight) -> UpgradeResult<()> {
        self.put(&done_key(name), &height)
    }

    /// Height at which `name` was applied
    pub fn done_height(&self, name: &str) -> UpgradeResult<Option<BlockHeight>> {
        self.get(&done_key(name))
    }

    /// Every applied upgrade with its height, ordered by height
    pub fn applied(&self) -> UpgradeResult<Vec<(String, BlockHeight)>> {
        let mut out = Vec::new();
        for (key, value) in self.store.scan_prefix(cf::UPGRADE, DONE_PREFIX)? {
            let name = String::from_utf8(key[DONE_PREFIX.len()..].to_vec())
                .map_err(|e| StorageError::Deserialization(e.to_string()))?;
            let height: BlockHeight = serde_json::from_slice(&value)
                .map_err(|e| StorageError::Deserialization(e.to_string()))?;
            out.push((name, height));
        }
        out.sort_by_key(|(_, h)| *h);
        Ok(out)
    }

    /// Record that the plan `name` due at `height` was skipped
    pub fn record_skip(&self, height: BlockHeight, name: &str) -> UpgradeResult<()> {
        self.put(&skip_key(height), &name)
    }

    /// Every skipped plan, ordered by height
    pub fn skipped(&self) -> UpgradeResult<Vec<(BlockHeight, String)>> {
        let mut out = Vec::new();
        for (key, value) in self.store.scan_prefix(cf::UPGRADE, SKIP_PREFIX)? {
            let raw: [u8; 8] = key[SKIP_PREFIX.len()..].try_into().map_err(|_| {
                StorageError::Deserialization("malformed skip record key".to_string())
            })?;
            let name: String = serde_json::from_slice(&value)
                .map_err(|e| StorageError::Deserialization(e.to_string()))?;
            out.push((BlockHeight::from_be_bytes(raw), name));
        }
        Ok(out)
    }

    /// Schedule `plan`, replacing any pending plan.
    ///
    /// The plan must be valid, lie strictly after `current_height`, and name
    /// an upgrade that has not been applied.
    pub fn schedule_upgrade(&self, plan: &Plan, current_height: BlockHeight) -> UpgradeResult<()> {
        plan.validate()?;
        if plan.height <= current_height {
            return Err(UpgradeError::PlanInPast {
                height: plan.height,
                current: current_height,
            });
        }
        if self.done_height(&plan.name)?.is_some() {
            return Err(UpgradeError::AlreadyDone(plan.name.clone()));
        }
        if let Some(previous) = self.plan()? {
            tracing::info!(old = %previous.name, new = %plan.name, "replacing pending upgrade plan");
        }
        self.set_plan(plan)?;
        tracing::info!(name = %plan.name, height = plan.height, "upgrade scheduled");
        Ok(())
    }

    /// Drop the pending plan, returning it
    pub fn cancel_upgrade(&self) -> UpgradeResult<Option<Plan>> {
        let plan = self.plan()?;
        if let Some(plan) = &plan {
            self.clear_plan()?;
            tracing::info!(name = %plan.name, "upgrade cancelled");
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mycel_storage::MemoryDb;

    #[test]
    fn test_schedule_and_cancel() {
        let db = MemoryDb::new();
        let store = UpgradeStore::new(&db);

        store.schedule_upgrade(&Plan::new("v1.9.0", 20), 10).unwrap();
        store.schedule_upgrade(&Plan::new("v2.0.0", 30), 10).unwrap();
        assert_eq!(store.plan().unwrap().unwrap().name, "v2.0.0");

        assert_eq!(store.cancel_upgrade().unwrap().unwrap().name, "v2.0.0");
        assert!(store.plan().unwrap().is_none());
        assert!(store.cancel_upgrade().unwrap().is_none());
    }

    #[test]
    fn test_schedule_rejections() {
        let db = MemoryDb::new();
        let store = UpgradeStore::new(&db);

        assert!(matches!(
            store.schedule_upgrade(&Plan::new("v2.0.0", 10), 10),
            Err(UpgradeError::PlanInPast { .. })
        ));
        assert!(matches!(
            store.schedule_upgrade(&Plan::new(" ", 20), 10),
            Err(UpgradeError::InvalidPlan(_))
        ));

        store.mark_done("v1.9.0", 5).unwrap();
        assert!(matches!(
            store.schedule_upgrade(&Plan::new("v1.9.0", 20), 10),
            Err(UpgradeError::AlreadyDone(_))
        ));
    }

    #[test]
    fn test_logs() {
        let db = MemoryDb::new();
        let store = UpgradeStore::new(&db);

        store.mark_done("v2.0.0", 300).unwrap();
        store.mark_done("v1.5.0", 100).unwrap();
        assert_eq!(
            store.applied().unwrap(),
            vec![("v1.5.0".to_string(), 100), ("v2.0.0".to_string(), 300)]
        );
        assert_eq!(store.done_height("v1.5.0").unwrap(), Some(100));

        store.record_skip(256, "v1.6.0").unwrap();
        store.record_skip(7, "v1.5.1").unwrap();
        assert_eq!(
            store.skipped().unwrap(),
            vec![(7, "v1.5.1".to_string()), (256, "v1.6.0".to_string())]
        );
    }

    #[test]
    fn test_version_map_roundtrip() {
        let db = MemoryDb::new();
        let store = UpgradeStore::new(&db);
        assert!(store.version_map().unwrap().is_empty());

        let vm: VersionMap = [("bank".to_string(), 2), ("auth".to_string(), 5)].into();
        store.set_version_map(&vm).unwrap();
        assert_eq!(store.version_map().unwrap(), vm);
    }
}
