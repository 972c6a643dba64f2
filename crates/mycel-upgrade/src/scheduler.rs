//! Height-gated upgrade application

use crate::error::{UpgradeError, UpgradeResult};
use crate::info::write_upgrade_info;
use crate::module::ModuleManager;
use crate::plan::{Plan, StoreUpgrades, VersionMap};
use crate::registry::{MigrationContext, UpgradeRegistry};
use crate::store::UpgradeStore;
use mycel_primitives::BlockHeight;
use mycel_storage::{CacheStore, KvStore};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where the scheduler is with respect to the pending plan
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    /// No plan pending
    Idle,
    /// A plan was read from storage and is not yet due
    PlanLoaded(Plan),
    /// Plan height reached; structural delta not applied yet
    DueForDelta(Plan),
    /// Structural delta applied; migration handler about to run
    DeltaApplied(Plan),
    /// Handler ran, version map persisted, plan cleared
    Complete(Plan),
}

/// What `begin_block` did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// No plan pending
    NoPlan,
    /// A plan is pending for a later height
    NotDue(Plan),
    /// The plan's height is in the skip set; it was cleared without running
    Skipped(Plan),
    /// The plan ran
    Applied {
        /// The executed plan
        plan: Plan,
        /// Version map after the upgrade
        version_map: VersionMap,
    },
}

/// Applies the pending plan exactly once, at its height.
///
/// Whether a block runs an upgrade depends only on the height and the persisted
/// plan, plus the operator's skip heights.
pub struct UpgradeScheduler<K> {
    registry: UpgradeRegistry<K>,
    modules: ModuleManager,
    skip_heights: BTreeSet<BlockHeight>,
    data_dir: Option<PathBuf>,
    state: SchedulerState,
}

impl<K> UpgradeScheduler<K> {
    /// Scheduler over a registry and this binary's modules
    pub fn new(registry: UpgradeRegistry<K>, modules: ModuleManager) -> Self {
        Self {
            registry,
            modules,
            skip_heights: BTreeSet::new(),
            data_dir: None,
            state: SchedulerState::Idle,
        }
    }

    /// Heights at which a due plan is cleared instead of applied
    pub fn with_skip_heights(mut self, heights: impl IntoIterator<Item = BlockHeight>) -> Self {
        self.skip_heights.extend(heights);
        self
    }

    /// Directory receiving `upgrade-info.json` when the node halts for an upgrade
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Current state
    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    /// Registered upgrades
    pub fn registry(&self) -> &UpgradeRegistry<K> {
        &self.registry
    }

    /// Module manager
    pub fn modules(&self) -> &ModuleManager {
        &self.modules
    }

    /// Skip set
    pub fn skip_heights(&self) -> &BTreeSet<BlockHeight> {
        &self.skip_heights
    }

    /// `height` is in the skip set
    pub fn is_skip_height(&self, height: BlockHeight) -> bool {
        self.skip_heights.contains(&height)
    }

    /// Data directory, if configured
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Read the pending plan at startup
    pub fn load(&mut self, store: &dyn KvStore) -> UpgradeResult<Option<Plan>> {
        let plan = UpgradeStore::new(store).plan()?;
        self.state = match &plan {
            Some(plan) => {
                tracing::info!(name = %plan.name, height = plan.height, "loaded pending upgrade plan");
                SchedulerState::PlanLoaded(plan.clone())
            }
            None => SchedulerState::Idle,
        };
        Ok(plan)
    }

    /// Evaluate the pending plan for `height`. Runs before any transaction of
    /// the block.
    ///
    /// Every error returned here is fatal: the node must halt.
    pub fn begin_block(
        &mut self,
        store: &Arc<dyn KvStore>,
        keepers: &K,
        height: BlockHeight,
    ) -> UpgradeResult<UpgradeOutcome> {
        let Some(plan) = UpgradeStore::new(store.as_ref()).plan()? else {
            self.state = SchedulerState::Idle;
            return Ok(UpgradeOutcome::NoPlan);
        };

        if !plan.should_execute(height) {
            if self.registry.contains(&plan.name) {
                let err = UpgradeError::PrematureUpgrade {
                    name: plan.name.clone(),
                    height: plan.height,
                };
                tracing::error!("{}", err);
                return Err(err);
            }
            self.state = SchedulerState::PlanLoaded(plan.clone());
            return Ok(UpgradeOutcome::NotDue(plan));
        }

        self.state = SchedulerState::DueForDelta(plan.clone());

        if self.is_skip_height(plan.height) {
            return self.skip(store, plan);
        }

        let Some(descriptor) = self.registry.get(&plan.name).cloned() else {
            if let Some(dir) = &self.data_dir {
                write_upgrade_info(dir, &plan)?;
            }
            let err = UpgradeError::UpgradeNeeded {
                name: plan.name.clone(),
                height: plan.height,
            };
            tracing::error!(info = %plan.info, "{}", err);
            return Err(err);
        };

        tracing::info!(name = %plan.name, height, "applying upgrade");
        let branch = CacheStore::new(store.clone());
        let upgrade_store = UpgradeStore::new(&branch);
        let before = upgrade_store.version_map()?;

        descriptor.store_upgrades.apply(&branch)?;
        self.state = SchedulerState::DeltaApplied(plan.clone());

        let ctx = MigrationContext {
            store: &branch,
            keepers,
            modules: &self.modules,
            plan: &plan,
        };
        let after = (descriptor.handler)(&ctx, before.clone()).map_err(|e| {
            tracing::error!(name = %plan.name, error = %e, "upgrade handler failed");
            UpgradeError::HandlerFailed {
                name: plan.name.clone(),
                reason: e.to_string(),
            }
        })?;
        check_version_map(&before, &after, &descriptor.store_upgrades)?;

        upgrade_store.set_version_map(&after)?;
        upgrade_store.clear_plan()?;
        upgrade_store.mark_done(&plan.name, height)?;
        branch.commit()?;

        tracing::info!(name = %plan.name, height, modules = after.len(), "upgrade complete");
        self.state = SchedulerState::Complete(plan.clone());
        Ok(UpgradeOutcome::Applied {
            plan,
            version_map: after,
        })
    }

    fn skip(&mut self, store: &Arc<dyn KvStore>, plan: Plan) -> UpgradeResult<UpgradeOutcome> {
        let branch = CacheStore::new(store.clone());
        let upgrade_store = UpgradeStore::new(&branch);
        upgrade_store.clear_plan()?;
        upgrade_store.record_skip(plan.height, &plan.name)?;
        branch.commit()?;

        tracing::warn!(name = %plan.name, height = plan.height, "skipping upgrade");
        self.state = SchedulerState::Idle;
        Ok(UpgradeOutcome::Skipped(plan))
    }
}

/// Versions of surviving modules never decrease, and every module that
/// exists after the structural delta has a version.
fn check_version_map(
    before: &VersionMap,
    after: &VersionMap,
    delta: &StoreUpgrades,
) -> UpgradeResult<()> {
    for (module, old) in before {
        if let Some(new) = after.get(module) {
            if new < old {
                return Err(UpgradeError::InvalidVersionMap(format!(
                    "module {} went from version {} to {}",
                    module, old, new
                )));
            }
        }
    }
    for module in delta.surviving(before.keys()) {
        if !after.contains_key(&module) {
            return Err(UpgradeError::InvalidVersionMap(format!(
                "module {} has no version after upgrade",
                module
            )));
        }
    }
    Ok(())
}
