//! Upgrade descriptors and the registry built once at node construction

use crate::error::{UpgradeError, UpgradeResult};
use crate::module::ModuleManager;
use crate::plan::{Plan, StoreUpgrades, VersionMap};
use mycel_storage::KvStore;

/// Everything a migration handler may touch.
///
/// Built by the scheduler for one upgrade; `store` is the branch the
/// upgrade commits atomically.
pub struct MigrationContext<'a, K> {
    /// Branched state
    pub store: &'a dyn KvStore,
    /// Application keepers
    pub keepers: &'a K,
    /// Module manager of this binary
    pub modules: &'a ModuleManager,
    /// Plan being executed
    pub plan: &'a Plan,
}

impl<K> MigrationContext<'_, K> {
    /// Run every module's in-place migrations against this upgrade's store
    pub fn run_migrations(&self, from_vm: &VersionMap) -> UpgradeResult<VersionMap> {
        self.modules.run_migrations(self.store, from_vm)
    }
}

/// Migration handler: prior version map in, new version map out
pub type MigrationHandler<K> = fn(&MigrationContext<'_, K>, VersionMap) -> UpgradeResult<VersionMap>;

/// A named upgrade: its handler and the structural delta applied before it
pub struct UpgradeDescriptor<K> {
    /// Name plans refer to
    pub name: String,
    /// Namespaces added, renamed or deleted at the upgrade height
    pub store_upgrades: StoreUpgrades,
    /// Migration logic
    pub handler: MigrationHandler<K>,
}

impl<K> UpgradeDescriptor<K> {
    /// Descriptor with no structural delta
    pub fn new(name: impl Into<String>, handler: MigrationHandler<K>) -> Self {
        Self {
            name: name.into(),
            store_upgrades: StoreUpgrades::default(),
            handler,
        }
    }

    /// Attach a structural delta
    pub fn with_store_upgrades(mut self, store_upgrades: StoreUpgrades) -> Self {
        self.store_upgrades = store_upgrades;
        self
    }
}

impl<K> Clone for UpgradeDescriptor<K> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            store_upgrades: self.store_upgrades.clone(),
            handler: self.handler,
        }
    }
}

impl<K> std::fmt::Debug for UpgradeDescriptor<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpgradeDescriptor")
            .field("name", &self.name)
            .field("store_upgrades", &self.store_upgrades)
            .finish()
    }
}

/// Handler that only runs module migrations
pub fn noop_handler<K>(ctx: &MigrationContext<'_, K>, from_vm: VersionMap) -> UpgradeResult<VersionMap> {
    tracing::info!(name = %ctx.plan.name, "running no-op upgrade");
    ctx.run_migrations(&from_vm)
}

/// Upgrade descriptors by name, in registration order
pub struct UpgradeRegistry<K> {
    descriptors: Vec<UpgradeDescriptor<K>>,
}

impl<K> Default for UpgradeRegistry<K> {
    fn default() -> Self {
        Self {
            descriptors: Vec::new(),
        }
    }
}

impl<K> UpgradeRegistry<K> {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `descriptors`, or a single no-op upgrade named
    /// `build_version` when there are none
    pub fn build(
        descriptors: impl IntoIterator<Item = UpgradeDescriptor<K>>,
        build_version: &str,
    ) -> UpgradeResult<Self> {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor)?;
        }
        if registry.is_empty() {
            registry.register(UpgradeDescriptor::new(build_version, noop_handler::<K>))?;
        }
        Ok(registry)
    }

    /// Add a descriptor; names are unique
    pub fn register(&mut self, descriptor: UpgradeDescriptor<K>) -> UpgradeResult<()> {
        if self.contains(&descriptor.name) {
            return Err(UpgradeError::DuplicateUpgradeName(descriptor.name));
        }
        tracing::debug!(name = %descriptor.name, "registered upgrade handler");
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Descriptor registered under `name`
    pub fn get(&self, name: &str) -> Option<&UpgradeDescriptor<K>> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Handler registered under `name`
    pub fn handler_for(&self, name: &str) -> UpgradeResult<MigrationHandler<K>> {
        self.get(name)
            .map(|d| d.handler)
            .ok_or_else(|| UpgradeError::NotFound(name.to_string()))
    }

    /// A descriptor is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names, in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|d| d.name.as_str())
    }

    /// Number of descriptors
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// No descriptors
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
