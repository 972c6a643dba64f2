//! Fee sufficiency and deduction

use crate::context::{Event, TxContext};
use crate::error::{AnteError, AnteResult};
use crate::pipeline::AnteHandler;

impl AnteHandler {
    pub(crate) fn deduct_fee(&self, ctx: &mut TxContext<'_>) -> AnteResult<()> {
        // Simulations estimate gas only; nothing is charged.
        if ctx.mode.is_simulate() {
            return Ok(());
        }

        let tx = ctx.tx;
        if tx.gas_limit() == 0 && ctx.block.height > 0 {
            return Err(AnteError::InvalidGasLimit("must provide positive gas".to_string()));
        }

        let check = self.fee_checker.check(ctx)?;

        let payer = tx
            .fee_payer()
            .ok_or_else(|| AnteError::InvalidRequest("tx has no fee payer".to_string()))?;
        let mut deduct_from = payer;

        if let Some(granter) = tx.fee_granter() {
            let feegrant = self.feegrant_keeper.as_ref().ok_or_else(|| {
                AnteError::InvalidRequest("fee grants are not enabled".to_string())
            })?;
            if granter != payer {
                feegrant.use_grant(ctx.store, &granter, &payer, &check.fee, &tx.body.messages)?;
            }
            deduct_from = granter;
        }

        if self
            .account_keeper
            .get_account(ctx.store, &deduct_from)?
            .is_none()
        {
            return Err(AnteError::UnknownAddress(deduct_from));
        }

        if !check.fee.is_zero() {
            self.bank_keeper
                .deduct_fee(ctx.store, &deduct_from, &check.fee)?;
        }

        tracing::trace!(payer = %deduct_from, fee = %check.fee, "fee deducted");
        ctx.emit(
            Event::new("tx")
                .attr("fee", check.fee.to_string())
                .attr("fee_payer", deduct_from.to_string()),
        );
        ctx.priority = check.priority;
        Ok(())
    }
}
