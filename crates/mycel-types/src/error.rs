//! Transaction error types

use thiserror::Error;

/// Stateless validity failures (`Tx::validate_basic`)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TxError {
    /// Transaction carries no messages
    #[error("must contain at least one message")]
    NoMessages,

    /// Transaction carries no signatures
    #[error("no signatures supplied")]
    NoSignatures,

    /// Signature count does not match the number of signers
    #[error("wrong number of signers; expected {expected}, got {got}")]
    SignerCountMismatch {
        /// Required signers
        expected: usize,
        /// Supplied signatures
        got: usize,
    },

    /// Gas limit out of range
    #[error("invalid gas supplied; {0} > {}", crate::tx::MAX_GAS_WANTED)]
    InvalidGasLimit(u64),

    /// Fee coins malformed
    #[error("invalid fee: {0}")]
    InvalidFee(String),

    /// A message failed its own checks
    #[error("invalid message {type_url}: {reason}")]
    InvalidMessage {
        /// Message type
        type_url: &'static str,
        /// Failure reason
        reason: String,
    },
}

/// Binary decoding failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input ended early
    #[error("unexpected end of input at offset {0}")]
    UnexpectedEof(usize),

    /// Unknown message tag
    #[error("unknown message tag {0}")]
    UnknownMessage(u8),

    /// Invalid option flag
    #[error("invalid option flag {0}")]
    InvalidFlag(u8),

    /// String field is not UTF-8
    #[error("invalid utf-8 string")]
    InvalidUtf8,

    /// Bytes left over after decoding
    #[error("{0} trailing bytes")]
    TrailingBytes(usize),
}
