//! Per-transaction admission state

use crate::gas::GasMeter;
use mycel_primitives::{Address, BlockHeight, Dec};
use mycel_storage::KvStore;
use mycel_types::Tx;

/// How the transaction is being processed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExecMode {
    /// First admission into the mempool
    Check,
    /// Re-admission after a block was committed
    ReCheck,
    /// Gas estimation; nothing is persisted
    Simulate,
    /// Block execution
    Deliver,
}

impl ExecMode {
    /// Simulation mode
    pub fn is_simulate(self) -> bool {
        self == ExecMode::Simulate
    }

    /// Mempool admission (check or recheck)
    pub fn is_check(self) -> bool {
        matches!(self, ExecMode::Check | ExecMode::ReCheck)
    }
}

/// Block-level inputs that every step of one block sees identically
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Chain identifier, bound into every sign doc
    pub chain_id: String,
    /// Current height
    pub height: BlockHeight,
    /// Block time, unix seconds
    pub time: u64,
}

/// Observable side effect of admission
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// Event type
    pub kind: &'static str,
    /// Key/value attributes
    pub attributes: Vec<(&'static str, String)>,
}

impl Event {
    /// New event
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            attributes: Vec::new(),
        }
    }

    /// Add an attribute
    pub fn attr(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.attributes.push((key, value.into()));
        self
    }
}

/// Signer and the sequence it committed to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignerData {
    /// Signer address
    pub address: Address,
    /// Sequence before increment
    pub sequence: u64,
    /// Account number
    pub account_number: u64,
}

/// Mutable state threaded through the steps for one transaction.
///
/// Owned by the pipeline for the duration of a single admission and
/// discarded afterwards. All writes go to `store`, which the caller branches
/// and commits only on admission.
pub struct TxContext<'a> {
    /// Decoded transaction
    pub tx: &'a Tx,
    /// Raw encoded bytes
    pub tx_bytes: &'a [u8],
    /// Write set for this transaction
    pub store: &'a dyn KvStore,
    /// Processing mode
    pub mode: ExecMode,
    /// Block inputs
    pub block: &'a BlockInfo,
    /// Gas meter, installed by the first step
    pub gas_meter: GasMeter,
    /// Mempool priority
    pub priority: Dec,
    /// Position of the tx within its block, set by the counter step
    pub tx_index: Option<u64>,
    /// Signers verified by the pipeline, in signer order
    pub signers: Vec<SignerData>,
    /// Event sink
    pub events: Vec<Event>,
}

impl<'a> TxContext<'a> {
    /// Fresh context for one transaction
    pub fn new(
        tx: &'a Tx,
        tx_bytes: &'a [u8],
        store: &'a dyn KvStore,
        mode: ExecMode,
        block: &'a BlockInfo,
    ) -> Self {
        Self {
            tx,
            tx_bytes,
            store,
            mode,
            block,
            gas_meter: GasMeter::infinite(),
            priority: Dec::ZERO,
            tx_index: None,
            signers: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Record an event
    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Gas consumed so far
    pub fn gas_used(&self) -> u64 {
        self.gas_meter.consumed()
    }
}
