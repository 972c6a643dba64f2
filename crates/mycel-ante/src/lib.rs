//! # mycel-ante
//!
//! Ordered transaction admission pipeline for the Mycel chain.
//!
//! This crate provides:
//! - A fixed, inspectable sequence of validation steps ([`AnteStep::ORDER`])
//! - Per-transaction context with a monotonic gas meter
//! - Capability traits for the keepers the steps consult
//! - Pluggable fee strategies (fee market, node minimum gas prices)
//!
//! ## Architecture
//!
//! ```text
//! tx bytes ─► TxContext ─► SetUpContext ─► ... ─► IncrementSequence ─► RedundantRelay ─► Admitted
//!                               │                         │
//!                               └──── first failure ──────┴──► Rejection { step, error, gas_used }
//! ```
//!
//! Every write a step makes goes to the context's store, which the caller
//! branches per transaction and commits only on admission.
//!
//! ## Usage
//!
//! ```ignore
//! use mycel_ante::{AnteHandler, HandlerOptions, TxContext, ExecMode};
//!
//! let handler = AnteHandler::new(options)?;
//! let branch = CacheStore::new(store.clone());
//! let mut ctx = TxContext::new(&tx, &bytes, &branch, ExecMode::Check, &block);
//! match handler.run(&mut ctx) {
//!     Ok(_) => branch.commit()?,
//!     Err(rejection) => return Err(rejection.into()),
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod context;
mod error;
mod fee;
mod gas;
mod keepers;
mod pipeline;
mod step;
mod steps;

pub use context::{BlockInfo, Event, ExecMode, SignerData, TxContext};
pub use error::{AnteError, AnteResult, ConfigError, Rejection};
pub use fee::{tx_priority, FeeCheck, FeeMarketChecker, MinGasPriceChecker, TxFeeChecker};
pub use gas::GasMeter;
pub use keepers::{
    AccountKeeper, AnteParams, BankKeeper, BaseAccount, CircuitBreaker, DirectSignMode,
    FeeMarketKeeper, FeegrantKeeper, RelayChecker, SignModeHandler, TxCounter,
};
pub use pipeline::{Admitted, AnteHandler, HandlerOptions};
pub use step::AnteStep;
pub use steps::sigverify::{Secp256k1SigGas, SigGasConsumer};
