//! Application error types

use mycel_ante::{AnteError, ConfigError, Rejection};
use mycel_primitives::{BlockHeight, Gas};
use mycel_storage::StorageError;
use mycel_types::CodecError;
use mycel_upgrade::UpgradeError;
use thiserror::Error;

/// Application errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Transaction bytes could not be decoded
    #[error("tx decode error: {0}")]
    Decode(#[from] CodecError),

    /// Admission pipeline refused the transaction
    #[error("tx rejected: {0}")]
    Rejected(#[from] Rejection),

    /// Keeper failure during message execution
    #[error("{0}")]
    Keeper(#[from] AnteError),

    /// Admission pipeline could not be built
    #[error("ante handler: {0}")]
    Config(#[from] ConfigError),

    /// Upgrade scheduling or application failed
    #[error("upgrade: {0}")]
    Upgrade(#[from] UpgradeError),

    /// Storage error
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// No handler for the message type
    #[error("unrecognized message type: {0}")]
    Unroutable(&'static str),

    /// Messages consumed more gas than the tx asked for
    #[error("out of gas: gasWanted: {wanted}, gasUsed: {used}")]
    OutOfGas {
        /// Tx gas limit
        wanted: Gas,
        /// Gas consumed
        used: Gas,
    },

    /// Token-factory denom already exists
    #[error("denom {0} already exists")]
    DenomExists(String),

    /// Genesis state rejected
    #[error("invalid genesis: {0}")]
    Genesis(String),

    /// Chain was initialised before
    #[error("chain already initialized at height {0}")]
    AlreadyInitialized(BlockHeight),

    /// Block lifecycle call out of order
    #[error("invalid block lifecycle: {0}")]
    Lifecycle(String),
}

impl AppError {
    /// The node must stop: continuing would fork or corrupt state
    pub fn is_fatal(&self) -> bool {
        match self {
            AppError::Upgrade(e) => e.is_fatal(),
            AppError::Storage(_) => true,
            _ => false,
        }
    }

    /// ABCI-style result code for a failed transaction
    pub fn code(&self) -> u32 {
        match self {
            AppError::Rejected(r) => r.code(),
            AppError::Keeper(e) => e.code(),
            AppError::Decode(_) => 2,
            AppError::Unroutable(_) => 6,
            AppError::OutOfGas { .. } => 11,
            AppError::DenomExists(_) => 18,
            _ => 1,
        }
    }

    /// Namespace the code belongs to
    pub fn codespace(&self) -> &'static str {
        match self {
            AppError::Rejected(r) => r.error.codespace(),
            AppError::Keeper(e) => e.codespace(),
            _ => "sdk",
        }
    }
}

/// Result type for application operations
pub type AppResult<T> = Result<T, AppError>;
