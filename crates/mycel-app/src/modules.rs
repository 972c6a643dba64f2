//! Modules compiled into this binary and their consensus versions

use crate::keepers::{auth, bank, feemarket, ibc, tokenfactory};
use mycel_upgrade::{ModuleDescriptor, ModuleManager};

/// Accounts and auth params
pub const AUTH: &str = "auth";
/// Balances
pub const BANK: &str = "bank";
/// Fee allowances
pub const FEEGRANT: &str = "feegrant";
/// Dynamic base gas price
pub const FEEMARKET: &str = "feemarket";
/// Packet receipts and commitments
pub const IBC: &str = "ibc";
/// Contract runtime state, including the per-block tx counter
pub const WASM: &str = "wasm";
/// Permissionless denominations
pub const TOKENFACTORY: &str = "tokenfactory";
/// Message-type switch. Retired by v2.0.0.
pub const CIRCUIT: &str = "circuit";
/// Group accounts. Retired by v2.0.0.
pub const GROUP: &str = "group";

/// Every module this binary runs, in migration order
pub fn module_manager() -> ModuleManager {
    ModuleManager::new()
        .with(
            ModuleDescriptor::new(AUTH, 5)
                .with_init(auth::init_genesis)
                .with_migration(4, auth::migrate_v4_to_v5),
        )
        .with(ModuleDescriptor::new(BANK, 4).with_migration(3, bank::migrate_v3_to_v4))
        .with(ModuleDescriptor::new(FEEGRANT, 2))
        .with(ModuleDescriptor::new(FEEMARKET, 1).with_init(feemarket::init_genesis))
        .with(ModuleDescriptor::new(IBC, 6).with_init(ibc::init_genesis))
        .with(ModuleDescriptor::new(WASM, 4))
        .with(ModuleDescriptor::new(TOKENFACTORY, 1).with_init(tokenfactory::init_genesis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retired_modules_are_not_managed() {
        let mm = module_manager();
        assert!(mm.contains(TOKENFACTORY));
        assert!(!mm.contains(CIRCUIT));
        assert!(!mm.contains(GROUP));
        assert_eq!(mm.version_map().get(AUTH), Some(&5));
    }
}
