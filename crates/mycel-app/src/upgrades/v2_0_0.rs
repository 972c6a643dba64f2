//! v2.0.0: retires the group and circuit modules

use crate::keepers::AppKeepers;
use crate::modules::{CIRCUIT, GROUP};
use mycel_upgrade::{MigrationContext, StoreUpgrades, UpgradeDescriptor, UpgradeResult, VersionMap};

/// Upgrade name
pub const UPGRADE_NAME: &str = "v2.0.0";

/// Modules removed from state and from the version map
pub const RETIRED: [&str; 2] = [GROUP, CIRCUIT];

/// Descriptor
pub fn upgrade() -> UpgradeDescriptor<AppKeepers> {
    UpgradeDescriptor::new(UPGRADE_NAME, create_upgrade_handler)
        .with_store_upgrades(StoreUpgrades::deleting(RETIRED))
}

fn create_upgrade_handler(
    ctx: &MigrationContext<'_, AppKeepers>,
    mut from_vm: VersionMap,
) -> UpgradeResult<VersionMap> {
    tracing::info!(name = UPGRADE_NAME, "starting upgrade");
    for module in RETIRED {
        if from_vm.remove(module).is_some() {
            tracing::info!(module, "removing module from version map");
        }
    }
    let vm = ctx.run_migrations(&from_vm)?;
    tracing::info!(name = UPGRADE_NAME, "upgrade complete");
    Ok(vm)
}
