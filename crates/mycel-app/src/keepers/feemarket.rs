//! Dynamic base gas price

use crate::modules::FEEMARKET;
use mycel_ante::{
    self as ante, AnteResult, FeeCheck, FeeMarketChecker, MinGasPriceChecker, TxContext,
    TxFeeChecker,
};
use mycel_primitives::{Dec, DecCoin, Gas};
use mycel_storage::{KvStore, ModuleStore};
use mycel_upgrade::UpgradeResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const PARAMS_KEY: &[u8] = b"params";
const STATE_KEY: &[u8] = b"state";

/// Base price moves by at most 1/8 per block
const LEARNING_RATE_DENOMINATOR: u128 = 8;

/// Fee-market parameters
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeMarketParams {
    /// Only denomination accepted for fees
    pub fee_denom: String,
    /// Floor under the base gas price
    pub min_base_gas_price: Dec,
    /// Gas a full block may use; half of it is the target
    pub max_block_utilization: Gas,
    /// When off, node-local minimum gas prices apply instead
    pub enabled: bool,
}

impl Default for FeeMarketParams {
    fn default() -> Self {
        Self {
            fee_denom: "uoki".to_string(),
            min_base_gas_price: Dec::from_raw(2_000_000_000_000_000),
            max_block_utilization: 50_000_000,
            enabled: true,
        }
    }
}

/// Fee-market state carried from block to block
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeMarketState {
    /// Current base gas price
    pub base_gas_price: Dec,
}

/// Store-backed fee-market keeper
#[derive(Clone, Copy, Debug, Default)]
pub struct FeeMarketKeeper;

impl FeeMarketKeeper {
    /// Create a new keeper
    pub fn new() -> Self {
        Self
    }

    /// Current params
    pub fn params(&self, store: &dyn KvStore) -> AnteResult<FeeMarketParams> {
        Ok(ModuleStore::new(store, FEEMARKET)
            .get_json(PARAMS_KEY)?
            .unwrap_or_default())
    }

    /// Replace the params
    pub fn set_params(&self, store: &dyn KvStore, params: &FeeMarketParams) -> AnteResult<()> {
        ModuleStore::new(store, FEEMARKET).set_json(PARAMS_KEY, params)?;
        Ok(())
    }

    /// Current state; the floor price until a block has been processed
    pub fn state(&self, store: &dyn KvStore) -> AnteResult<FeeMarketState> {
        match ModuleStore::new(store, FEEMARKET).get_json(STATE_KEY)? {
            Some(state) => Ok(state),
            None => Ok(FeeMarketState {
                base_gas_price: self.params(store)?.min_base_gas_price,
            }),
        }
    }

    /// Replace the state
    pub fn set_state(&self, store: &dyn KvStore, state: &FeeMarketState) -> AnteResult<()> {
        ModuleStore::new(store, FEEMARKET).set_json(STATE_KEY, state)?;
        Ok(())
    }

    /// Move the base price toward demand after a block that used
    /// `block_gas_used`: up when above half the block, down when below, never
    /// under the floor.
    pub fn update(&self, store: &dyn KvStore, block_gas_used: Gas) -> AnteResult<Dec> {
        let params = self.params(store)?;
        let mut state = self.state(store)?;
        let target = (params.max_block_utilization / 2) as u128;
        if !params.enabled || target == 0 {
            return Ok(state.base_gas_price);
        }

        let used = block_gas_used as u128;
        let base = state.base_gas_price.raw();
        let diff = used.abs_diff(target);
        let delta = base.saturating_mul(diff) / target / LEARNING_RATE_DENOMINATOR;
        let next = if used > target {
            base.saturating_add(delta)
        } else {
            base.saturating_sub(delta)
        };
        let next = Dec::from_raw(next).max(params.min_base_gas_price);

        if next != state.base_gas_price {
            tracing::debug!(from = %state.base_gas_price, to = %next, block_gas_used, "base gas price updated");
        }
        state.base_gas_price = next;
        self.set_state(store, &state)?;
        Ok(next)
    }
}

impl ante::FeeMarketKeeper for FeeMarketKeeper {
    fn base_gas_price(&self, store: &dyn KvStore) -> AnteResult<DecCoin> {
        let params = self.params(store)?;
        Ok(DecCoin::new(params.fee_denom, self.state(store)?.base_gas_price))
    }

    fn min_base_gas_price(&self, store: &dyn KvStore) -> AnteResult<DecCoin> {
        let params = self.params(store)?;
        Ok(DecCoin::new(params.fee_denom, params.min_base_gas_price))
    }
}

/// Fee-market pricing while the market is enabled, node-local minimum gas
/// prices otherwise
pub struct AppFeeChecker {
    keeper: Arc<FeeMarketKeeper>,
    market: FeeMarketChecker,
    local: MinGasPriceChecker,
}

impl AppFeeChecker {
    /// Checker over `keeper` with the node's minimum gas prices
    pub fn new(keeper: Arc<FeeMarketKeeper>, min_gas_prices: Vec<DecCoin>) -> Self {
        Self {
            market: FeeMarketChecker::new(keeper.clone()),
            local: MinGasPriceChecker::new(min_gas_prices),
            keeper,
        }
    }
}

impl TxFeeChecker for AppFeeChecker {
    fn check(&self, ctx: &TxContext<'_>) -> AnteResult<FeeCheck> {
        if self.keeper.params(ctx.store)?.enabled {
            self.market.check(ctx)
        } else {
            self.local.check(ctx)
        }
    }
}

pub(crate) fn init_genesis(store: &ModuleStore<'_>) -> UpgradeResult<()> {
    let params = FeeMarketParams::default();
    store.set_json(
        STATE_KEY,
        &FeeMarketState {
            base_gas_price: params.min_base_gas_price,
        },
    )?;
    store.set_json(PARAMS_KEY, &params)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mycel_storage::MemoryDb;

    fn price(s: &str) -> Dec {
        Dec::from_str_exact(s).unwrap()
    }

    #[test]
    fn test_full_blocks_raise_price() {
        let db = MemoryDb::new();
        let market = FeeMarketKeeper::new();
        assert_eq!(market.state(&db).unwrap().base_gas_price, price("0.002"));

        assert_eq!(market.update(&db, 50_000_000).unwrap(), price("0.00225"));
        assert_eq!(market.update(&db, 25_000_000).unwrap(), price("0.00225"));
    }

    #[test]
    fn test_empty_blocks_fall_to_floor() {
        let db = MemoryDb::new();
        let market = FeeMarketKeeper::new();
        market
            .set_state(&db, &FeeMarketState { base_gas_price: price("0.004") })
            .unwrap();

        assert_eq!(market.update(&db, 0).unwrap(), price("0.0035"));
        for _ in 0..20 {
            market.update(&db, 0).unwrap();
        }
        assert_eq!(market.state(&db).unwrap().base_gas_price, price("0.002"));
    }

    #[test]
    fn test_disabled_market_holds_price() {
        let db = MemoryDb::new();
        let market = FeeMarketKeeper::new();
        market
            .set_params(&db, &FeeMarketParams { enabled: false, ..Default::default() })
            .unwrap();
        assert_eq!(market.update(&db, 50_000_000).unwrap(), price("0.002"));
    }
}
