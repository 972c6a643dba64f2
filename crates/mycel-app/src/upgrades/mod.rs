//! Upgrade catalogue: every named upgrade this binary can apply

mod passthrough;
pub mod v1_4_0;
pub mod v2_0_0;

use crate::keepers::AppKeepers;
use mycel_upgrade::{UpgradeDescriptor, UpgradeRegistry, UpgradeResult};

/// Descriptors compiled into this binary, oldest first
pub fn catalogue() -> Vec<UpgradeDescriptor<AppKeepers>> {
    let mut upgrades = vec![v1_4_0::upgrade()];
    upgrades.extend(passthrough::upgrades());
    upgrades.push(v2_0_0::upgrade());
    upgrades
}

/// Registry for this binary. An empty catalogue gets a no-op upgrade named
/// after `build_version`.
pub fn registry(build_version: &str) -> UpgradeResult<UpgradeRegistry<AppKeepers>> {
    UpgradeRegistry::build(catalogue(), build_version)
}
