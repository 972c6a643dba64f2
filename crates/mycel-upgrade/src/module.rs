//! Module manager: consensus versions and in-place migrations

use crate::error::{UpgradeError, UpgradeResult};
use crate::plan::VersionMap;
use mycel_storage::{KvStore, ModuleStore};
use std::collections::BTreeMap;

/// In-place migration of one module's state from one version to the next
pub type ModuleMigration = fn(&ModuleStore<'_>) -> UpgradeResult<()>;

/// Default state for a module that joins the chain at an upgrade
pub type ModuleInit = fn(&ModuleStore<'_>) -> UpgradeResult<()>;

/// A module as the manager sees it
#[derive(Clone)]
pub struct ModuleDescriptor {
    name: String,
    consensus_version: u64,
    init: Option<ModuleInit>,
    migrations: BTreeMap<u64, ModuleMigration>,
}

impl ModuleDescriptor {
    /// Module at `consensus_version` with no migrations
    pub fn new(name: impl Into<String>, consensus_version: u64) -> Self {
        Self {
            name: name.into(),
            consensus_version,
            init: None,
            migrations: BTreeMap::new(),
        }
    }

    /// Default-state initialiser run when the module is absent from the version map
    pub fn with_init(mut self, init: ModuleInit) -> Self {
        self.init = Some(init);
        self
    }

    /// Migration from `from` to `from + 1`
    pub fn with_migration(mut self, from: u64, migration: ModuleMigration) -> Self {
        self.migrations.insert(from, migration);
        self
    }

    /// Module id
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version this binary runs
    pub fn consensus_version(&self) -> u64 {
        self.consensus_version
    }
}

impl std::fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("consensus_version", &self.consensus_version)
            .field("migrations", &self.migrations.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Ordered set of modules known to this binary
#[derive(Clone, Debug, Default)]
pub struct ModuleManager {
    modules: Vec<ModuleDescriptor>,
}

impl ModuleManager {
    /// Empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module; migrations run in registration order
    pub fn register(&mut self, module: ModuleDescriptor) {
        if let Some(existing) = self.modules.iter_mut().find(|m| m.name == module.name) {
            *existing = module;
        } else {
            self.modules.push(module);
        }
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, module: ModuleDescriptor) -> Self {
        self.register(module);
        self
    }

    /// Module is registered
    pub fn contains(&self, name: &str) -> bool {
        self.modules.iter().any(|m| m.name == name)
    }

    /// Registered module ids, in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.name.as_str())
    }

    /// Consensus versions of every registered module
    pub fn version_map(&self) -> VersionMap {
        self.modules
            .iter()
            .map(|m| (m.name.clone(), m.consensus_version))
            .collect()
    }

    /// Bring every registered module from its version in `from_vm` to its
    /// consensus version.
    ///
    /// Modules missing from `from_vm` are initialised with their default state.
    /// Entries for modules this binary does not know are carried unchanged; an
    /// upgrade that retires a module must remove it from the map itself.
    pub fn run_migrations(&self, store: &dyn KvStore, from_vm: &VersionMap) -> UpgradeResult<VersionMap> {
        let mut updated = VersionMap::new();

        for module in &self.modules {
            let module_store = ModuleStore::new(store, &module.name);
            match from_vm.get(&module.name).copied() {
                None => {
                    if let Some(init) = module.init {
                        init(&module_store)?;
                    }
                    tracing::info!(
                        module = %module.name,
                        version = module.consensus_version,
                        "adding a new module"
                    );
                }
                Some(from) if from > module.consensus_version => {
                    return Err(UpgradeError::Migration {
                        module: module.name.clone(),
                        from,
                        reason: format!(
                            "stored version is ahead of binary version {}",
                            module.consensus_version
                        ),
                    });
                }
                Some(from) => {
                    for version in from..module.consensus_version {
                        let migration = module.migrations.get(&version).ok_or_else(|| {
                            UpgradeError::Migration {
                                module: module.name.clone(),
                                from: version,
                                reason: "no migration registered".to_string(),
                            }
                        })?;
                        migration(&module_store)?;
                        tracing::info!(
                            module = %module.name,
                            from = version,
                            to = version + 1,
                            "migrated module"
                        );
                    }
                }
            }
            updated.insert(module.name.clone(), module.consensus_version);
        }

        for (name, version) in from_vm.iter().filter(|(m, _)| !self.contains(m)) {
            tracing::debug!(module = %name, version, "carrying unmanaged module");
            updated.insert(name.clone(), *version);
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mycel_storage::MemoryDb;

    fn double_counter(store: &ModuleStore<'_>) -> UpgradeResult<()> {
        let n: u64 = store.get_json(b"counter")?.unwrap_or(0);
        store.set_json(b"counter", &(n * 2))?;
        Ok(())
    }

    fn seed_params(store: &ModuleStore<'_>) -> UpgradeResult<()> {
        store.set_json(b"params", &7u64)?;
        Ok(())
    }

    fn manager() -> ModuleManager {
        ModuleManager::new()
            .with(
                ModuleDescriptor::new("bank", 3)
                    .with_migration(1, double_counter)
                    .with_migration(2, double_counter),
            )
            .with(ModuleDescriptor::new("tokenfactory", 1).with_init(seed_params))
    }

    #[test]
    fn test_runs_each_step_and_initialises_new_modules() {
        let db = MemoryDb::new();
        ModuleStore::new(&db, "bank").set_json(b"counter", &5u64).unwrap();

        let from: VersionMap = [("bank".to_string(), 1), ("group".to_string(), 1)].into();
        let vm = manager().run_migrations(&db, &from).unwrap();

        let mut expected = manager().version_map();
        expected.insert("group".to_string(), 1);
        assert_eq!(vm, expected);
        let counter: u64 = ModuleStore::new(&db, "bank").get_json(b"counter").unwrap().unwrap();
        assert_eq!(counter, 20);
        let params: u64 = ModuleStore::new(&db, "tokenfactory").get_json(b"params").unwrap().unwrap();
        assert_eq!(params, 7);
    }

    #[test]
    fn test_missing_migration_fails() {
        let db = MemoryDb::new();
        let mm = ModuleManager::new().with(ModuleDescriptor::new("bank", 2));
        let from: VersionMap = [("bank".to_string(), 1)].into();
        let err = mm.run_migrations(&db, &from).unwrap_err();
        assert!(matches!(err, UpgradeError::Migration { from: 1, .. }));
    }

    #[test]
    fn test_downgrade_refused() {
        let db = MemoryDb::new();
        let from: VersionMap = [("bank".to_string(), 9)].into();
        assert!(manager().run_migrations(&db, &from).is_err());
    }
}
