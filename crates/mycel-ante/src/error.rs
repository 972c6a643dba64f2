//! Admission error types

use crate::step::AnteStep;
use mycel_primitives::{Address, Gas};
use mycel_storage::StorageError;
use mycel_types::TxError;
use std::fmt;
use thiserror::Error;

/// Why a transaction was refused admission
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnteError {
    /// Keeper or store failure
    #[error("internal error: {0}")]
    Internal(String),

    /// Transaction bytes could not be decoded
    #[error("tx parse error: {0}")]
    TxDecode(String),

    /// Signature, signer set or capability check failed
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Payer cannot cover the fee
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Address malformed or not matching its key
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Public key missing or malformed
    #[error("invalid pubkey: {0}")]
    InvalidPubKey(String),

    /// Signer account does not exist
    #[error("account {0} does not exist")]
    UnknownAddress(Address),

    /// Malformed coins
    #[error("invalid coins: {0}")]
    InvalidCoins(String),

    /// Gas meter exhausted
    #[error("out of gas in location: {descriptor}; gasWanted: {limit}, gasUsed: {used}")]
    OutOfGas {
        /// What was being charged
        descriptor: String,
        /// Meter limit
        limit: Gas,
        /// Gas consumed including the failed charge
        used: Gas,
    },

    /// Memo longer than allowed
    #[error("maximum number of characters is {max} but received {got} characters")]
    MemoTooLarge {
        /// Limit
        max: u64,
        /// Actual
        got: u64,
    },

    /// Offered fee below the required fee
    #[error("insufficient fee; got: {got} required: {required}")]
    InsufficientFee {
        /// Required fee
        required: String,
        /// Offered fee
        got: String,
    },

    /// More public keys than the signature limit
    #[error("signatures: {got}, limit: {max}")]
    TooManySignatures {
        /// Limit
        max: u64,
        /// Actual
        got: u64,
    },

    /// No signatures supplied
    #[error("no signatures supplied")]
    NoSignatures,

    /// Request malformed
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Block height past the tx's timeout height
    #[error("block height {height} is greater than timeout height {timeout}")]
    TxTimeoutHeight {
        /// Tx timeout height
        timeout: u64,
        /// Current height
        height: u64,
    },

    /// Signer sequence does not match the account
    #[error("account sequence mismatch, expected {expected}, got {got}")]
    WrongSequence {
        /// Account sequence
        expected: u64,
        /// Sequence in the signer info
        got: u64,
    },

    /// Gas limit rejected
    #[error("invalid gas limit: {0}")]
    InvalidGasLimit(String),

    /// Block time past the tx's timeout timestamp
    #[error("block time {block_time} is after timeout timestamp {timeout}")]
    TxTimeout {
        /// Tx timeout timestamp
        timeout: u64,
        /// Current block time
        block_time: u64,
    },

    /// Every relay message in the tx was already processed
    #[error("packet messages are redundant")]
    RedundantRelay,
}

impl AnteError {
    /// Stable numeric reason code reported to the submitter
    pub fn code(&self) -> u32 {
        match self {
            AnteError::Internal(_) => 1,
            AnteError::TxDecode(_) => 2,
            AnteError::Unauthorized(_) => 4,
            AnteError::InsufficientFunds(_) => 5,
            AnteError::InvalidAddress(_) => 7,
            AnteError::InvalidPubKey(_) => 8,
            AnteError::UnknownAddress(_) => 9,
            AnteError::InvalidCoins(_) => 10,
            AnteError::OutOfGas { .. } => 11,
            AnteError::MemoTooLarge { .. } => 12,
            AnteError::InsufficientFee { .. } => 13,
            AnteError::TooManySignatures { .. } => 14,
            AnteError::NoSignatures => 15,
            AnteError::InvalidRequest(_) => 18,
            AnteError::TxTimeoutHeight { .. } => 30,
            AnteError::WrongSequence { .. } => 32,
            AnteError::InvalidGasLimit(_) => 41,
            AnteError::TxTimeout { .. } => 42,
            AnteError::RedundantRelay => 22,
        }
    }

    /// Namespace the code belongs to
    pub fn codespace(&self) -> &'static str {
        match self {
            AnteError::RedundantRelay => "channel",
            _ => "sdk",
        }
    }
}

impl From<StorageError> for AnteError {
    fn from(err: StorageError) -> Self {
        AnteError::Internal(err.to_string())
    }
}

impl From<TxError> for AnteError {
    fn from(err: TxError) -> Self {
        match err {
            TxError::NoMessages | TxError::InvalidMessage { .. } => {
                AnteError::InvalidRequest(err.to_string())
            }
            TxError::NoSignatures => AnteError::NoSignatures,
            TxError::SignerCountMismatch { .. } => AnteError::Unauthorized(err.to_string()),
            TxError::InvalidGasLimit(_) => AnteError::InvalidGasLimit(err.to_string()),
            TxError::InvalidFee(_) => AnteError::InvalidCoins(err.to_string()),
        }
    }
}

/// Result type for admission steps and keepers
pub type AnteResult<T> = Result<T, AnteError>;

/// A refused transaction: the failing step, the reason, and gas consumed so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Step that failed
    pub step: AnteStep,
    /// Reason
    pub error: AnteError,
    /// Gas consumed up to and including the failing step
    pub gas_used: Gas,
}

impl Rejection {
    /// Reason code
    pub fn code(&self) -> u32 {
        self.error.code()
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.error)
    }
}

impl std::error::Error for Rejection {}

/// Pipeline could not be built
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required keeper or service was not supplied
    #[error("{0} is required for ante builder")]
    MissingDependency(&'static str),
}
