//! Fee-calculation strategies

use crate::context::{ExecMode, TxContext};
use crate::error::{AnteError, AnteResult};
use crate::keepers::FeeMarketKeeper;
use mycel_primitives::{Coin, Coins, Dec, DecCoin, Gas};
use std::sync::Arc;

/// Outcome of a fee check: the fee to deduct and the tx's priority
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeeCheck {
    /// Fee to deduct from the payer
    pub fee: Coins,
    /// Mempool priority
    pub priority: Dec,
}

/// Decides whether the offered fee is sufficient
pub trait TxFeeChecker: Send + Sync {
    /// Check the tx in `ctx` and return the fee to charge
    fn check(&self, ctx: &TxContext<'_>) -> AnteResult<FeeCheck>;
}

/// Lowest offered price per gas unit across the fee's denominations
pub fn tx_priority(fee: &Coins, gas: Gas) -> Dec {
    if gas == 0 {
        return Dec::ZERO;
    }
    fee.iter()
        .map(|c| Dec::quo_int(c.amount, gas as u128).unwrap_or(Dec::from_raw(u128::MAX)))
        .min()
        .unwrap_or(Dec::ZERO)
}

/// `ceil(price * gas)`
fn required_fee(price: &DecCoin, gas: Gas) -> AnteResult<Coin> {
    price
        .amount
        .mul_int_ceil(gas as u128)
        .map(|amount| Coin::new(price.denom.clone(), amount))
        .ok_or_else(|| AnteError::InvalidRequest("required fee overflows".to_string()))
}

/// Dynamic base-fee pricing.
///
/// Required fee is `ceil(max(base, min_base) * gas_limit)` in the fee-market
/// denomination; the fee may not carry any other denomination.
pub struct FeeMarketChecker {
    keeper: Arc<dyn FeeMarketKeeper>,
}

impl FeeMarketChecker {
    /// Checker reading prices from `keeper`
    pub fn new(keeper: Arc<dyn FeeMarketKeeper>) -> Self {
        Self { keeper }
    }
}

impl TxFeeChecker for FeeMarketChecker {
    fn check(&self, ctx: &TxContext<'_>) -> AnteResult<FeeCheck> {
        let base = self.keeper.base_gas_price(ctx.store)?;
        let min = self.keeper.min_base_gas_price(ctx.store)?;
        let price = DecCoin::new(base.denom.clone(), base.amount.max(min.amount));

        let fee = ctx.tx.fee();
        if let Some(other) = fee.iter().find(|c| c.denom != price.denom) {
            return Err(AnteError::InvalidCoins(format!(
                "fee denom {} does not match fee market denom {}",
                other.denom, price.denom
            )));
        }

        let gas = ctx.tx.gas_limit();
        let required = required_fee(&price, gas)?;
        let offered = fee.amount_of(&price.denom);
        if offered < required.amount {
            return Err(AnteError::InsufficientFee {
                required: required.to_string(),
                got: Coin::new(price.denom, offered).to_string(),
            });
        }

        Ok(FeeCheck {
            fee: fee.clone(),
            priority: tx_priority(fee, gas),
        })
    }
}

/// Node-local minimum gas prices, enforced only on first mempool admission.
///
/// The fee passes if, for any configured denomination, it offers at least
/// `ceil(min_price * gas_limit)`.
pub struct MinGasPriceChecker {
    min_gas_prices: Vec<DecCoin>,
}

impl MinGasPriceChecker {
    /// Checker with the given minimum prices
    pub fn new(min_gas_prices: Vec<DecCoin>) -> Self {
        Self { min_gas_prices }
    }
}

impl TxFeeChecker for MinGasPriceChecker {
    fn check(&self, ctx: &TxContext<'_>) -> AnteResult<FeeCheck> {
        let fee = ctx.tx.fee();
        let gas = ctx.tx.gas_limit();

        let enforce = ctx.mode == ExecMode::Check
            && self.min_gas_prices.iter().any(|p| !p.amount.is_zero());
        if enforce {
            let required = self
                .min_gas_prices
                .iter()
                .map(|p| required_fee(p, gas))
                .collect::<AnteResult<Vec<_>>>()?;
            let satisfied = required
                .iter()
                .any(|req| fee.amount_of(&req.denom) >= req.amount);
            if !satisfied {
                let required = Coins::from_vec(required);
                return Err(AnteError::InsufficientFee {
                    required: required.to_string(),
                    got: fee.to_string(),
                });
            }
        }

        Ok(FeeCheck {
            fee: fee.clone(),
            priority: tx_priority(fee, gas),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_is_lowest_price() {
        let fee: Coins = "1000uoki,5000stake".parse().unwrap();
        let p = tx_priority(&fee, 500_000);
        assert_eq!(p, Dec::from_str_exact("0.002").unwrap());
        assert_eq!(tx_priority(&fee, 0), Dec::ZERO);
        assert_eq!(tx_priority(&Coins::new(), 10), Dec::ZERO);
    }

    #[test]
    fn test_required_fee_rounds_up() {
        let price: DecCoin = "0.0025uoki".parse().unwrap();
        assert_eq!(required_fee(&price, 1001).unwrap(), Coin::new("uoki", 3));
    }
}
