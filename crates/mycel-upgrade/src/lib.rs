//! # mycel-upgrade
//!
//! Coordinated, height-gated chain upgrades.
//!
//! This crate provides:
//! - [`Plan`] - a persisted "run upgrade X at height H" record
//! - [`UpgradeRegistry`] - named migration handlers with structural store deltas
//! - [`ModuleManager`] - module consensus versions and in-place migrations
//! - [`UpgradeScheduler`] - applies the pending plan exactly once at its height
//! - [`UpgradeStore`] - pending plan, version map and applied/skipped logs
//!
//! ## Block flow
//!
//! ```text
//! begin_block(H) ─► plan? ──no──► NoPlan
//!                     │
//!                     ├─ H < plan.height ─► NotDue (or PrematureUpgrade if this binary has the handler)
//!                     ├─ skip height ─────► clear plan, record skip
//!                     ├─ no handler ──────► write upgrade-info.json, UpgradeNeeded
//!                     └─ delta ─► handler ─► version map check ─► commit ─► Applied
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod info;
mod module;
mod plan;
mod registry;
mod scheduler;
mod store;

pub use error::{UpgradeError, UpgradeResult};
pub use info::{read_upgrade_info, upgrade_info_path, write_upgrade_info, UPGRADE_INFO_FILE};
pub use module::{ModuleDescriptor, ModuleInit, ModuleManager, ModuleMigration};
pub use plan::{Plan, StoreRename, StoreUpgrades, VersionMap};
pub use registry::{
    noop_handler, MigrationContext, MigrationHandler, UpgradeDescriptor, UpgradeRegistry,
};
pub use scheduler::{SchedulerState, UpgradeOutcome, UpgradeScheduler};
pub use store::UpgradeStore;
