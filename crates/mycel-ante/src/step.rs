//! Validation steps and their network-wide order

use std::fmt;

/// One check or mutation in the admission pipeline.
///
/// Variants are declared in execution order; [`AnteStep::ORDER`] is the
/// sequence the pipeline runs and must never change within a network version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnteStep {
    /// Install the gas meter
    SetUpContext,
    /// Cap simulation gas
    LimitSimulationGas,
    /// Per-block tx counter
    CountTx,
    /// Reject administratively disabled message types
    CircuitBreaker,
    /// Stateless structural checks
    ValidateBasic,
    /// Height and timestamp window
    TxTimeoutHeight,
    /// Memo length
    ValidateMemo,
    /// Gas proportional to encoded size
    ConsumeTxSizeGas,
    /// Fee sufficiency and deduction
    DeductFee,
    /// Bind public keys to accounts
    SetPubKey,
    /// Signer-count ceiling
    ValidateSigCount,
    /// Gas for signature verification
    SigGasConsume,
    /// Sequence check and signature verification
    SigVerification,
    /// Replay protection
    IncrementSequence,
    /// Duplicate cross-chain relay rejection
    RedundantRelay,
}

impl AnteStep {
    /// Execution order
    pub const ORDER: [AnteStep; 15] = [
        AnteStep::SetUpContext,
        AnteStep::LimitSimulationGas,
        AnteStep::CountTx,
        AnteStep::CircuitBreaker,
        AnteStep::ValidateBasic,
        AnteStep::TxTimeoutHeight,
        AnteStep::ValidateMemo,
        AnteStep::ConsumeTxSizeGas,
        AnteStep::DeductFee,
        AnteStep::SetPubKey,
        AnteStep::ValidateSigCount,
        AnteStep::SigGasConsume,
        AnteStep::SigVerification,
        AnteStep::IncrementSequence,
        AnteStep::RedundantRelay,
    ];

    /// Step name
    pub fn name(self) -> &'static str {
        match self {
            AnteStep::SetUpContext => "SetUpContext",
            AnteStep::LimitSimulationGas => "LimitSimulationGas",
            AnteStep::CountTx => "CountTx",
            AnteStep::CircuitBreaker => "CircuitBreaker",
            AnteStep::ValidateBasic => "ValidateBasic",
            AnteStep::TxTimeoutHeight => "TxTimeoutHeight",
            AnteStep::ValidateMemo => "ValidateMemo",
            AnteStep::ConsumeTxSizeGas => "ConsumeTxSizeGas",
            AnteStep::DeductFee => "DeductFee",
            AnteStep::SetPubKey => "SetPubKey",
            AnteStep::ValidateSigCount => "ValidateSigCount",
            AnteStep::SigGasConsume => "SigGasConsume",
            AnteStep::SigVerification => "SigVerification",
            AnteStep::IncrementSequence => "IncrementSequence",
            AnteStep::RedundantRelay => "RedundantRelay",
        }
    }

    /// Position in [`AnteStep::ORDER`]
    pub fn position(self) -> usize {
        self as usize
    }
}

impl fmt::Display for AnteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
