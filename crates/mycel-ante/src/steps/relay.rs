//! Duplicate relay rejection

use crate::context::TxContext;
use crate::error::{AnteError, AnteResult};
use crate::pipeline::AnteHandler;

impl AnteHandler {
    /// Mempool-only: a tx whose packet messages were all already relayed is
    /// refused so relayers do not pay for each other's work. Client updates
    /// are not counted either way.
    pub(crate) fn redundant_relay(&self, ctx: &mut TxContext<'_>) -> AnteResult<()> {
        if !ctx.mode.is_check() {
            return Ok(());
        }
        let Some(checker) = &self.relay_checker else {
            return Ok(());
        };

        let mut packets = 0usize;
        let mut redundant = 0usize;
        for msg in ctx.tx.body.messages.iter().filter(|m| m.packet().is_some()) {
            packets += 1;
            if checker.is_redundant(ctx.store, msg)? {
                redundant += 1;
            }
        }

        if packets > 0 && redundant == packets {
            return Err(AnteError::RedundantRelay);
        }
        Ok(())
    }
}
