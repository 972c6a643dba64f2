//! Fee allowances

use crate::modules::FEEGRANT;
use mycel_ante::{self as ante, AnteError, AnteResult};
use mycel_primitives::{Address, Coin, Coins};
use mycel_storage::{KvStore, ModuleStore};
use mycel_types::Msg;
use serde::{Deserialize, Serialize};

const GRANT_PREFIX: &[u8] = b"grant/";

fn grant_key(granter: &Address, grantee: &Address) -> Vec<u8> {
    let mut key = GRANT_PREFIX.to_vec();
    key.extend_from_slice(granter.as_bytes());
    key.extend_from_slice(grantee.as_bytes());
    key
}

/// Allowance a granter extends to a grantee
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAllowance {
    /// Remaining spend; unlimited when absent
    pub spend_limit: Option<Coins>,
}

impl BasicAllowance {
    /// Allowance without a limit
    pub fn unlimited() -> Self {
        Self { spend_limit: None }
    }

    /// Allowance capped at `limit`
    pub fn limited(limit: Coins) -> Self {
        Self {
            spend_limit: Some(limit),
        }
    }

    /// Charge `fee`; returns whether the allowance is used up
    fn accept(&mut self, fee: &Coins) -> AnteResult<bool> {
        let Some(limit) = &self.spend_limit else {
            return Ok(false);
        };
        let mut left = Vec::new();
        for coin in limit {
            let spent = fee.amount_of(&coin.denom);
            left.push(Coin::new(coin.denom.clone(), coin.amount.saturating_sub(spent)));
        }
        let exceeded = fee
            .iter()
            .any(|c| c.amount > limit.amount_of(&c.denom));
        if exceeded {
            return Err(AnteError::InsufficientFunds(
                "basic allowance: fee limit exceeded".to_string(),
            ));
        }
        left.retain(|c| c.amount > 0);
        let remaining = Coins::from_vec(left);
        let exhausted = remaining.is_empty();
        self.spend_limit = Some(remaining);
        Ok(exhausted)
    }
}

/// Store-backed fee-grant keeper
#[derive(Clone, Copy, Debug, Default)]
pub struct FeegrantKeeper;

impl FeegrantKeeper {
    /// Create a new keeper
    pub fn new() -> Self {
        Self
    }

    /// Create or replace the allowance from `granter` to `grantee`
    pub fn grant_allowance(
        &self,
        store: &dyn KvStore,
        granter: &Address,
        grantee: &Address,
        allowance: &BasicAllowance,
    ) -> AnteResult<()> {
        if granter == grantee {
            return Err(AnteError::InvalidAddress(
                "cannot self-grant fee authorization".to_string(),
            ));
        }
        ModuleStore::new(store, FEEGRANT).set_json(&grant_key(granter, grantee), allowance)?;
        Ok(())
    }

    /// Current allowance, if any
    pub fn allowance(
        &self,
        store: &dyn KvStore,
        granter: &Address,
        grantee: &Address,
    ) -> AnteResult<Option<BasicAllowance>> {
        Ok(ModuleStore::new(store, FEEGRANT).get_json(&grant_key(granter, grantee))?)
    }
}

impl ante::FeegrantKeeper for FeegrantKeeper {
    fn use_grant(
        &self,
        store: &dyn KvStore,
        granter: &Address,
        grantee: &Address,
        fee: &Coins,
        _msgs: &[Msg],
    ) -> AnteResult<()> {
        let key = grant_key(granter, grantee);
        let module = ModuleStore::new(store, FEEGRANT);
        let mut allowance: BasicAllowance = module.get_json(&key)?.ok_or_else(|| {
            AnteError::Unauthorized(format!(
                "{} does not allow to pay fees for {}: fee-grant not found",
                granter, grantee
            ))
        })?;

        if allowance.accept(fee)? {
            module.remove(&key)?;
            tracing::debug!(granter = %granter, grantee = %grantee, "fee allowance used up");
        } else {
            module.set_json(&key, &allowance)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mycel_ante::FeegrantKeeper as _;
    use mycel_storage::MemoryDb;

    const GRANTER: Address = Address::from_bytes([1; 20]);
    const GRANTEE: Address = Address::from_bytes([2; 20]);

    #[test]
    fn test_limited_allowance_is_spent_down_then_removed() {
        let db = MemoryDb::new();
        let grants = FeegrantKeeper::new();
        grants
            .grant_allowance(&db, &GRANTER, &GRANTEE, &BasicAllowance::limited(Coins::one("uoki", 1500)))
            .unwrap();

        grants.use_grant(&db, &GRANTER, &GRANTEE, &Coins::one("uoki", 1000), &[]).unwrap();
        assert_eq!(
            grants.allowance(&db, &GRANTER, &GRANTEE).unwrap(),
            Some(BasicAllowance::limited(Coins::one("uoki", 500)))
        );

        let err = grants
            .use_grant(&db, &GRANTER, &GRANTEE, &Coins::one("uoki", 501), &[])
            .unwrap_err();
        assert_eq!(err.code(), 5);

        grants.use_grant(&db, &GRANTER, &GRANTEE, &Coins::one("uoki", 500), &[]).unwrap();
        assert_eq!(grants.allowance(&db, &GRANTER, &GRANTEE).unwrap(), None);
    }

    #[test]
    fn test_missing_grant_is_unauthorized() {
        let db = MemoryDb::new();
        let err = FeegrantKeeper::new()
            .use_grant(&db, &GRANTER, &GRANTEE, &Coins::one("uoki", 1), &[])
            .unwrap_err();
        assert_eq!(err.code(), 4);
    }

    #[test]
    fn test_unlimited_allowance_persists() {
        let db = MemoryDb::new();
        let grants = FeegrantKeeper::new();
        grants
            .grant_allowance(&db, &GRANTER, &GRANTEE, &BasicAllowance::unlimited())
            .unwrap();
        grants.use_grant(&db, &GRANTER, &GRANTEE, &Coins::one("uoki", 10_000), &[]).unwrap();
        assert!(grants.allowance(&db, &GRANTER, &GRANTEE).unwrap().is_some());
    }
}
