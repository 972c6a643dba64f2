//! # mycel-primitives
//!
//! Primitive types for the Mycel chain.
//!
//! This crate provides the fundamental data types shared by the admission
//! pipeline and the upgrade orchestrator: account addresses, 32-byte hashes,
//! fixed-point decimals and coin amounts.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod coin;
mod dec;
mod error;
mod hash;

pub use address::{Address, AddressError};
pub use coin::{Coin, Coins, DecCoin};
pub use dec::Dec;
pub use error::PrimitiveError;
pub use hash::{Hash, HashError, H256};

/// Block height type. Signed to match the persisted plan record.
pub type BlockHeight = i64;

/// Account sequence number
pub type Sequence = u64;

/// Gas type
pub type Gas = u64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dec_times_gas_is_exact_fee() {
        let price = Dec::from_str_exact("0.002").unwrap();
        assert_eq!(price.mul_int_ceil(500_000), Some(1000));
    }
}
