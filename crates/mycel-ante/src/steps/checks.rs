//! Context setup, resource ceilings and stateless checks

use crate::context::{ExecMode, TxContext};
use crate::error::{AnteError, AnteResult};
use crate::gas::GasMeter;
use crate::pipeline::AnteHandler;
use mycel_crypto::{COMPRESSED_PUBKEY_LEN, SIGNATURE_LEN};

/// Framing overhead charged per simulated signature
const SIM_SIG_OVERHEAD: u64 = 6;

impl AnteHandler {
    pub(crate) fn set_up_context(&self, ctx: &mut TxContext<'_>) -> AnteResult<()> {
        let gas = ctx.tx.gas_limit();
        let params = self.account_keeper.params(ctx.store)?;
        if let Some(max) = params.block_max_gas {
            if gas > max {
                return Err(AnteError::InvalidGasLimit(format!(
                    "tx gas limit {} exceeds block max gas {}",
                    gas, max
                )));
            }
        }

        // Genesis and simulations run unmetered until a later step caps them.
        ctx.gas_meter = if ctx.mode.is_simulate() || ctx.block.height == 0 {
            GasMeter::infinite()
        } else {
            GasMeter::new(gas)
        };
        Ok(())
    }

    pub(crate) fn limit_simulation_gas(&self, ctx: &mut TxContext<'_>) -> AnteResult<()> {
        if !ctx.mode.is_simulate() {
            return Ok(());
        }
        let limit = match self.simulation_gas_limit {
            Some(limit) => Some(limit),
            None => self.account_keeper.params(ctx.store)?.block_max_gas,
        };
        if let Some(limit) = limit {
            ctx.gas_meter.set_limit(limit);
        }
        Ok(())
    }

    pub(crate) fn count_tx(&self, ctx: &mut TxContext<'_>) -> AnteResult<()> {
        if let Some(counter) = &self.tx_counter {
            let index = counter.next_index(ctx.store, ctx.block.height, ctx.mode.is_simulate())?;
            ctx.tx_index = Some(index);
        }
        Ok(())
    }

    pub(crate) fn circuit_breaker(&self, ctx: &mut TxContext<'_>) -> AnteResult<()> {
        let Some(breaker) = &self.circuit_breaker else {
            return Ok(());
        };
        for msg in &ctx.tx.body.messages {
            let type_url = msg.type_url();
            if !breaker.is_allowed(ctx.store, type_url)? {
                return Err(AnteError::Unauthorized(format!(
                    "tx type not allowed: {}",
                    type_url
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn validate_basic(&self, ctx: &mut TxContext<'_>) -> AnteResult<()> {
        if ctx.mode == ExecMode::ReCheck {
            return Ok(());
        }
        ctx.tx.validate_basic()?;
        Ok(())
    }

    pub(crate) fn tx_timeout_height(&self, ctx: &mut TxContext<'_>) -> AnteResult<()> {
        let body = &ctx.tx.body;
        let height = ctx.block.height.max(0) as u64;
        if body.timeout_height > 0 && height > body.timeout_height {
            return Err(AnteError::TxTimeoutHeight {
                timeout: body.timeout_height,
                height,
            });
        }
        if body.timeout_timestamp > 0 && ctx.block.time > body.timeout_timestamp {
            return Err(AnteError::TxTimeout {
                timeout: body.timeout_timestamp,
                block_time: ctx.block.time,
            });
        }
        Ok(())
    }

    pub(crate) fn validate_memo(&self, ctx: &mut TxContext<'_>) -> AnteResult<()> {
        let max = self.account_keeper.params(ctx.store)?.max_memo_characters;
        let got = ctx.tx.memo().chars().count() as u64;
        if got > max {
            return Err(AnteError::MemoTooLarge { max, got });
        }
        Ok(())
    }

    pub(crate) fn consume_tx_size_gas(&self, ctx: &mut TxContext<'_>) -> AnteResult<()> {
        let params = self.account_keeper.params(ctx.store)?;
        let size = ctx.tx_bytes.len() as u64;
        ctx.gas_meter
            .consume(params.tx_size_cost_per_byte.saturating_mul(size), "txSize")?;

        if !ctx.mode.is_simulate() {
            return Ok(());
        }

        // Simulations usually arrive unsigned; charge for the bytes a real
        // signature (and, when no key is known, public key) would add.
        let tx = ctx.tx;
        for (i, signer) in tx.signers().iter().enumerate() {
            let signed = tx.signatures.get(i).map(|s| !s.is_empty()).unwrap_or(false);
            if signed {
                continue;
            }
            let stored = self
                .account_keeper
                .get_account(ctx.store, signer)?
                .map(|account| account.public_key.is_some())
                .unwrap_or(false);
            let supplied = tx
                .auth_info
                .signer_infos
                .get(i)
                .map(|info| info.public_key.is_some())
                .unwrap_or(false);
            let mut cost = SIGNATURE_LEN as u64 + SIM_SIG_OVERHEAD;
            if !stored && !supplied {
                cost = cost.saturating_add(COMPRESSED_PUBKEY_LEN as u64);
            }
            ctx.gas_meter
                .consume(params.tx_size_cost_per_byte.saturating_mul(cost), "txSize")?;
        }
        Ok(())
    }
}
