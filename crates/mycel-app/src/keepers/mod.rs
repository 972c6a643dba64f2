//! Store-backed keepers.
//!
//! Keepers hold no state of their own; every method takes the store it reads
//! and writes, so one set of keepers serves the committed store, the check
//! state and every per-transaction branch.

pub(crate) mod auth;
pub(crate) mod bank;
mod circuit;
mod feegrant;
pub(crate) mod feemarket;
pub(crate) mod ibc;
pub(crate) mod tokenfactory;
mod wasm;

pub use auth::AuthKeeper;
pub use bank::{BankKeeper, FEE_COLLECTOR};
pub use circuit::CircuitKeeper;
pub use feegrant::{BasicAllowance, FeegrantKeeper};
pub use feemarket::{AppFeeChecker, FeeMarketKeeper, FeeMarketParams, FeeMarketState};
pub use ibc::IbcKeeper;
pub use tokenfactory::{DenomAuthority, TokenFactoryKeeper, TokenFactoryParams};
pub use wasm::WasmKeeper;

use mycel_crypto::keccak256;
use mycel_primitives::Address;
use std::sync::Arc;

/// Address of a module account: the last 20 bytes of `keccak256(name)`
pub fn module_address(name: &str) -> Address {
    let hash = keccak256(name.as_bytes());
    let mut raw = [0u8; Address::LEN];
    raw.copy_from_slice(&hash.as_bytes()[32 - Address::LEN..]);
    Address::from_bytes(raw)
}

/// Every keeper the application wires together. Handed to upgrade handlers.
#[derive(Clone, Default)]
pub struct AppKeepers {
    /// Accounts
    pub auth: Arc<AuthKeeper>,
    /// Balances
    pub bank: Arc<BankKeeper>,
    /// Message-type switch
    pub circuit: Arc<CircuitKeeper>,
    /// Fee allowances
    pub feegrant: Arc<FeegrantKeeper>,
    /// Base gas price
    pub feemarket: Arc<FeeMarketKeeper>,
    /// Packet receipts
    pub ibc: Arc<IbcKeeper>,
    /// Tx counter
    pub wasm: Arc<WasmKeeper>,
    /// Factory denoms
    pub tokenfactory: Arc<TokenFactoryKeeper>,
}

impl AppKeepers {
    /// Fresh keeper set
    pub fn new() -> Self {
        Self::default()
    }
}
