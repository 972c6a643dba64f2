//! Upgrade error types

use mycel_primitives::BlockHeight;
use mycel_storage::StorageError;
use thiserror::Error;

/// Upgrade errors
#[derive(Debug, Error)]
pub enum UpgradeError {
    /// Two descriptors share a name
    #[error("upgrade {0} is already registered")]
    DuplicateUpgradeName(String),

    /// No descriptor registered under this name
    #[error("no upgrade handler registered for {0}")]
    NotFound(String),

    /// Plan is malformed
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// Plan targets a height that is not in the future
    #[error("upgrade cannot be scheduled in the past: height {height}, current {current}")]
    PlanInPast {
        /// Plan height
        height: BlockHeight,
        /// Current height
        current: BlockHeight,
    },

    /// Upgrade with this name was already applied
    #[error("upgrade with name {0} has already been completed")]
    AlreadyDone(String),

    /// Plan is due but this binary has no handler for it
    #[error("UPGRADE \"{name}\" NEEDED at height: {height}")]
    UpgradeNeeded {
        /// Plan name
        name: String,
        /// Plan height
        height: BlockHeight,
    },

    /// This binary carries the handler for a plan that is not due yet
    #[error("BINARY UPDATED BEFORE TRIGGER! UPGRADE \"{name}\" - in binary but not executed on chain (due at {height})")]
    PrematureUpgrade {
        /// Plan name
        name: String,
        /// Plan height
        height: BlockHeight,
    },

    /// Migration handler returned an error
    #[error("upgrade {name} failed: {reason}")]
    HandlerFailed {
        /// Plan name
        name: String,
        /// Handler error
        reason: String,
    },

    /// A module's in-place migration failed or is missing
    #[error("migrating module {module} from version {from}: {reason}")]
    Migration {
        /// Module id
        module: String,
        /// Version being migrated from
        from: u64,
        /// Failure
        reason: String,
    },

    /// Version map returned by a handler is unacceptable
    #[error("invalid version map: {0}")]
    InvalidVersionMap(String),

    /// Upgrade-info file unreadable or malformed
    #[error("failed to read upgrade info: {0}")]
    PlanRead(String),

    /// Upgrade-info file could not be written
    #[error("failed to write upgrade info: {0}")]
    InfoWrite(String),

    /// Storage error
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl UpgradeError {
    /// The node must halt rather than continue processing blocks
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            UpgradeError::DuplicateUpgradeName(_)
                | UpgradeError::InvalidPlan(_)
                | UpgradeError::PlanInPast { .. }
                | UpgradeError::AlreadyDone(_)
        )
    }
}

/// Result type for upgrade operations
pub type UpgradeResult<T> = Result<T, UpgradeError>;
