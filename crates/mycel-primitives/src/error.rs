//! Common error types for primitives

use crate::address::AddressError;
use crate::hash::HashError;
use thiserror::Error;

/// Primitive operation error
#[derive(Debug, Error)]
pub enum PrimitiveError {
    /// Address error
    #[error("address error: {0}")]
    Address(#[from] AddressError),

    /// Hash error
    #[error("hash error: {0}")]
    Hash(#[from] HashError),

    /// Decimal parse error
    #[error("invalid decimal: {0}")]
    InvalidDecimal(String),

    /// Coin parse error
    #[error("invalid coin: {0}")]
    InvalidCoin(String),
}
