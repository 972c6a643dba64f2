//! Capability interfaces the pipeline consumes.
//!
//! Each keeper is a narrow view onto one module's state. Methods receive the
//! transaction's write set explicitly so a single keeper instance serves every
//! branch; keepers hold no per-transaction state.

use crate::error::AnteResult;
use mycel_primitives::{Address, BlockHeight, Coins, DecCoin, H256};
use mycel_storage::KvStore;
use mycel_types::{Msg, Tx};
use serde::{Deserialize, Serialize};

/// Account record
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseAccount {
    /// Address
    pub address: Address,
    /// Bound public key (SEC1 bytes)
    pub public_key: Option<Vec<u8>>,
    /// Globally unique account number
    pub account_number: u64,
    /// Replay-protection sequence
    pub sequence: u64,
}

/// Auth parameters used by the pipeline
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnteParams {
    /// Longest memo accepted
    pub max_memo_characters: u64,
    /// Most public keys a tx may carry
    pub tx_sig_limit: u64,
    /// Gas per encoded tx byte
    pub tx_size_cost_per_byte: u64,
    /// Gas per secp256k1 signature
    pub sig_verify_cost_secp256k1: u64,
    /// Block gas ceiling; a tx may not ask for more
    pub block_max_gas: Option<u64>,
}

impl Default for AnteParams {
    fn default() -> Self {
        Self {
            max_memo_characters: 256,
            tx_sig_limit: 7,
            tx_size_cost_per_byte: 10,
            sig_verify_cost_secp256k1: 1000,
            block_max_gas: None,
        }
    }
}

/// Accounts and auth params
pub trait AccountKeeper: Send + Sync {
    /// Auth params
    fn params(&self, store: &dyn KvStore) -> AnteResult<AnteParams>;

    /// Look up an account
    fn get_account(&self, store: &dyn KvStore, address: &Address) -> AnteResult<Option<BaseAccount>>;

    /// Persist an account
    fn set_account(&self, store: &dyn KvStore, account: &BaseAccount) -> AnteResult<()>;
}

/// Balances
pub trait BankKeeper: Send + Sync {
    /// Move `amount` from `payer` to the fee collector.
    /// Fails with `InsufficientFunds` when the payer cannot cover it.
    fn deduct_fee(&self, store: &dyn KvStore, payer: &Address, amount: &Coins) -> AnteResult<()>;
}

/// Fee allowances
pub trait FeegrantKeeper: Send + Sync {
    /// Consume `fee` from the allowance `granter` gave `grantee`
    fn use_grant(
        &self,
        store: &dyn KvStore,
        granter: &Address,
        grantee: &Address,
        fee: &Coins,
        msgs: &[Msg],
    ) -> AnteResult<()>;
}

/// Administrative message-type switch
pub trait CircuitBreaker: Send + Sync {
    /// Message type is currently enabled
    fn is_allowed(&self, store: &dyn KvStore, type_url: &str) -> AnteResult<bool>;
}

/// Per-block transaction counter
pub trait TxCounter: Send + Sync {
    /// Index of this tx within `height`. Advances the counter unless `simulate`.
    fn next_index(&self, store: &dyn KvStore, height: BlockHeight, simulate: bool) -> AnteResult<u64>;
}

/// Cross-chain duplicate detector
pub trait RelayChecker: Send + Sync {
    /// Relay message was already processed on this chain
    fn is_redundant(&self, store: &dyn KvStore, msg: &Msg) -> AnteResult<bool>;
}

/// Produces the digest a signer signs
pub trait SignModeHandler: Send + Sync {
    /// Sign-doc digest
    fn sign_doc(&self, tx: &Tx, chain_id: &str, account_number: u64, sequence: u64) -> H256;
}

/// Direct sign mode: keccak-256 over the canonical body and auth info
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectSignMode;

impl SignModeHandler for DirectSignMode {
    fn sign_doc(&self, tx: &Tx, chain_id: &str, account_number: u64, sequence: u64) -> H256 {
        mycel_types::sign_doc_digest(tx, chain_id, account_number, sequence)
    }
}

/// Fee-market state read by the fee-market checker
pub trait FeeMarketKeeper: Send + Sync {
    /// Current base gas price
    fn base_gas_price(&self, store: &dyn KvStore) -> AnteResult<DecCoin>;

    /// Floor under the base gas price
    fn min_base_gas_price(&self, store: &dyn KvStore) -> AnteResult<DecCoin>;
}
