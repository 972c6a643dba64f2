//! Pipeline executor

use crate::context::{Event, SignerData, TxContext};
use crate::error::{ConfigError, Rejection};
use crate::fee::TxFeeChecker;
use crate::keepers::{
    AccountKeeper, BankKeeper, CircuitBreaker, FeegrantKeeper, RelayChecker, SignModeHandler,
    TxCounter,
};
use crate::step::AnteStep;
use crate::steps::sigverify::{Secp256k1SigGas, SigGasConsumer};
use mycel_primitives::{Dec, Gas};
use std::sync::Arc;

/// Dependencies for [`AnteHandler::new`].
///
/// Account, bank, sign-mode and fee-checker are required. A missing circuit
/// breaker allows every message type, a missing tx counter leaves
/// `tx_index` unset, and a missing relay checker treats no relay as redundant.
#[derive(Default)]
pub struct HandlerOptions {
    /// Accounts and auth params
    pub account_keeper: Option<Arc<dyn AccountKeeper>>,
    /// Balances
    pub bank_keeper: Option<Arc<dyn BankKeeper>>,
    /// Fee allowances
    pub feegrant_keeper: Option<Arc<dyn FeegrantKeeper>>,
    /// Message-type switch
    pub circuit_breaker: Option<Arc<dyn CircuitBreaker>>,
    /// Per-block counter
    pub tx_counter: Option<Arc<dyn TxCounter>>,
    /// Duplicate relay detector
    pub relay_checker: Option<Arc<dyn RelayChecker>>,
    /// Sign-doc producer
    pub sign_mode_handler: Option<Arc<dyn SignModeHandler>>,
    /// Fee strategy
    pub tx_fee_checker: Option<Arc<dyn TxFeeChecker>>,
    /// Signature gas pricing; secp256k1 default when absent
    pub sig_gas_consumer: Option<Arc<dyn SigGasConsumer>>,
    /// Gas ceiling for simulations; block max gas when absent
    pub simulation_gas_limit: Option<Gas>,
}

/// Successful admission summary
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Admitted {
    /// Gas consumed by the pipeline
    pub gas_used: Gas,
    /// Ceiling left on the meter; `None` for unbounded simulations
    pub gas_limit: Option<Gas>,
    /// Mempool priority
    pub priority: Dec,
    /// Position within the block
    pub tx_index: Option<u64>,
    /// Verified signers
    pub signers: Vec<SignerData>,
    /// Emitted events
    pub events: Vec<Event>,
}

/// The admission gate: runs [`AnteStep::ORDER`] against a [`TxContext`]
pub struct AnteHandler {
    pub(crate) account_keeper: Arc<dyn AccountKeeper>,
    pub(crate) bank_keeper: Arc<dyn BankKeeper>,
    pub(crate) feegrant_keeper: Option<Arc<dyn FeegrantKeeper>>,
    pub(crate) circuit_breaker: Option<Arc<dyn CircuitBreaker>>,
    pub(crate) tx_counter: Option<Arc<dyn TxCounter>>,
    pub(crate) relay_checker: Option<Arc<dyn RelayChecker>>,
    pub(crate) sign_mode_handler: Arc<dyn SignModeHandler>,
    pub(crate) fee_checker: Arc<dyn TxFeeChecker>,
    pub(crate) sig_gas_consumer: Arc<dyn SigGasConsumer>,
    pub(crate) simulation_gas_limit: Option<Gas>,
}

impl AnteHandler {
    /// Build the pipeline, refusing when a required dependency is missing
    pub fn new(options: HandlerOptions) -> Result<Self, ConfigError> {
        let account_keeper = options
            .account_keeper
            .ok_or(ConfigError::MissingDependency("account keeper"))?;
        let bank_keeper = options
            .bank_keeper
            .ok_or(ConfigError::MissingDependency("bank keeper"))?;
        let sign_mode_handler = options
            .sign_mode_handler
            .ok_or(ConfigError::MissingDependency("sign mode handler"))?;
        let fee_checker = options
            .tx_fee_checker
            .ok_or(ConfigError::MissingDependency("tx fee checker"))?;

        Ok(Self {
            account_keeper,
            bank_keeper,
            feegrant_keeper: options.feegrant_keeper,
            circuit_breaker: options.circuit_breaker,
            tx_counter: options.tx_counter,
            relay_checker: options.relay_checker,
            sign_mode_handler,
            fee_checker,
            sig_gas_consumer: options
                .sig_gas_consumer
                .unwrap_or_else(|| Arc::new(Secp256k1SigGas)),
            simulation_gas_limit: options.simulation_gas_limit,
        })
    }

    /// Run every step in order, stopping at the first failure
    pub fn run(&self, ctx: &mut TxContext<'_>) -> Result<Admitted, Rejection> {
        for step in AnteStep::ORDER {
            if let Err(error) = self.run_step(step, ctx) {
                let rejection = Rejection {
                    step,
                    error,
                    gas_used: ctx.gas_used(),
                };
                tracing::debug!(
                    step = %step,
                    code = rejection.code(),
                    gas_used = rejection.gas_used,
                    mode = ?ctx.mode,
                    "tx rejected: {}",
                    rejection.error
                );
                return Err(rejection);
            }
        }

        Ok(Admitted {
            gas_used: ctx.gas_used(),
            gas_limit: ctx.gas_meter.limit(),
            priority: ctx.priority,
            tx_index: ctx.tx_index,
            signers: ctx.signers.clone(),
            events: ctx.events.clone(),
        })
    }

    /// Run a single step
    pub fn run_step(&self, step: AnteStep, ctx: &mut TxContext<'_>) -> crate::AnteResult<()> {
        match step {
            AnteStep::SetUpContext => self.set_up_context(ctx),
            AnteStep::LimitSimulationGas => self.limit_simulation_gas(ctx),
            AnteStep::CountTx => self.count_tx(ctx),
            AnteStep::CircuitBreaker => self.circuit_breaker(ctx),
            AnteStep::ValidateBasic => self.validate_basic(ctx),
            AnteStep::TxTimeoutHeight => self.tx_timeout_height(ctx),
            AnteStep::ValidateMemo => self.validate_memo(ctx),
            AnteStep::ConsumeTxSizeGas => self.consume_tx_size_gas(ctx),
            AnteStep::DeductFee => self.deduct_fee(ctx),
            AnteStep::SetPubKey => self.set_pub_key(ctx),
            AnteStep::ValidateSigCount => self.validate_sig_count(ctx),
            AnteStep::SigGasConsume => self.sig_gas_consume(ctx),
            AnteStep::SigVerification => self.sig_verification(ctx),
            AnteStep::IncrementSequence => self.increment_sequence(ctx),
            AnteStep::RedundantRelay => self.redundant_relay(ctx),
        }
    }
}
