//! v1.5.0 through v1.9.0: binary swaps that only bump module versions

use crate::keepers::AppKeepers;
use mycel_upgrade::{MigrationContext, UpgradeDescriptor, UpgradeResult, VersionMap};

const NAMES: [&str; 5] = ["v1.5.0", "v1.6.0", "v1.7.0", "v1.8.0", "v1.9.0"];

pub(super) fn upgrades() -> impl Iterator<Item = UpgradeDescriptor<AppKeepers>> {
    NAMES
        .into_iter()
        .map(|name| UpgradeDescriptor::new(name, migrate_only))
}

fn migrate_only(ctx: &MigrationContext<'_, AppKeepers>, from_vm: VersionMap) -> UpgradeResult<VersionMap> {
    tracing::info!(name = %ctx.plan.name, "starting upgrade");
    let vm = ctx.run_migrations(&from_vm)?;
    tracing::info!(name = %ctx.plan.name, "upgrade complete");
    Ok(vm)
}
