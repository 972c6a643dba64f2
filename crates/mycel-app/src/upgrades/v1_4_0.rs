//! v1.4.0: adds the token factory

use crate::keepers::{AppKeepers, TokenFactoryParams};
use crate::modules::TOKENFACTORY;
use mycel_primitives::Coins;
use mycel_upgrade::{
    MigrationContext, StoreUpgrades, UpgradeDescriptor, UpgradeError, UpgradeResult, VersionMap,
};

/// Upgrade name
pub const UPGRADE_NAME: &str = "v1.4.0";

/// Fee charged for a new factory denom
pub const DENOM_CREATION_FEE: u128 = 100_000_000;

/// Gas consumed by a new factory denom
pub const DENOM_CREATION_GAS: u64 = 100_000;

/// Descriptor
pub fn upgrade() -> UpgradeDescriptor<AppKeepers> {
    UpgradeDescriptor::new(UPGRADE_NAME, create_upgrade_handler)
        .with_store_upgrades(StoreUpgrades::adding([TOKENFACTORY]))
}

fn create_upgrade_handler(
    ctx: &MigrationContext<'_, AppKeepers>,
    from_vm: VersionMap,
) -> UpgradeResult<VersionMap> {
    tracing::info!("starting v1.4.0 upgrade");
    let vm = ctx.run_migrations(&from_vm)?;

    let params = TokenFactoryParams {
        denom_creation_fee: Coins::one("uoki", DENOM_CREATION_FEE),
        denom_creation_gas_consume: DENOM_CREATION_GAS,
    };
    ctx.keepers
        .tokenfactory
        .set_params(ctx.store, &params)
        .map_err(|e| UpgradeError::HandlerFailed {
            name: UPGRADE_NAME.to_string(),
            reason: format!("initializing tokenfactory parameters: {}", e),
        })?;

    tracing::info!("upgrade v1.4.0 complete");
    Ok(vm)
}
