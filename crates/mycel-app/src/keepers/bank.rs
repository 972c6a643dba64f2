//! Balances, supply and the fee collector

use super::module_address;
use crate::modules::BANK;
use mycel_ante::{self as ante, AnteError, AnteResult};
use mycel_primitives::{Address, Coin, Coins};
use mycel_storage::{KvStore, ModuleStore};
use mycel_upgrade::UpgradeResult;
use std::collections::BTreeMap;

const BALANCE_PREFIX: &[u8] = b"bal/";
const SUPPLY_PREFIX: &[u8] = b"supply/";

/// Module account receiving transaction fees
pub const FEE_COLLECTOR: &str = "fee_collector";

fn balance_key(address: &Address, denom: &str) -> Vec<u8> {
    let mut key = BALANCE_PREFIX.to_vec();
    key.extend_from_slice(address.as_bytes());
    key.extend_from_slice(denom.as_bytes());
    key
}

fn supply_key(denom: &str) -> Vec<u8> {
    let mut key = SUPPLY_PREFIX.to_vec();
    key.extend_from_slice(denom.as_bytes());
    key
}

/// Store-backed bank keeper
#[derive(Clone, Copy, Debug, Default)]
pub struct BankKeeper;

impl BankKeeper {
    /// Create a new keeper
    pub fn new() -> Self {
        Self
    }

    /// Address of the fee collector module account
    pub fn fee_collector(&self) -> Address {
        module_address(FEE_COLLECTOR)
    }

    /// Balance of one denomination
    pub fn balance(&self, store: &dyn KvStore, address: &Address, denom: &str) -> AnteResult<u128> {
        Ok(ModuleStore::new(store, BANK)
            .get_json(&balance_key(address, denom))?
            .unwrap_or(0))
    }

    /// Every non-zero balance of `address`
    pub fn balances(&self, store: &dyn KvStore, address: &Address) -> AnteResult<Coins> {
        let mut prefix = BALANCE_PREFIX.to_vec();
        prefix.extend_from_slice(address.as_bytes());
        let skip = address.as_bytes().len();

        let mut coins = Vec::new();
        for (key, value) in ModuleStore::new(store, BANK).scan(&prefix)? {
            let denom = String::from_utf8(key[BALANCE_PREFIX.len() + skip..].to_vec())
                .map_err(|e| AnteError::Internal(e.to_string()))?;
            let amount: u128 =
                serde_json::from_slice(&value).map_err(|e| AnteError::Internal(e.to_string()))?;
            coins.push(Coin::new(denom, amount));
        }
        Ok(Coins::from_vec(coins))
    }

    fn set_balance(&self, store: &dyn KvStore, address: &Address, denom: &str, amount: u128) -> AnteResult<()> {
        let module = ModuleStore::new(store, BANK);
        let key = balance_key(address, denom);
        if amount == 0 {
            module.remove(&key)?;
        } else {
            module.set_json(&key, &amount)?;
        }
        Ok(())
    }

    /// Total issued amount of `denom`
    pub fn supply(&self, store: &dyn KvStore, denom: &str) -> AnteResult<u128> {
        Ok(ModuleStore::new(store, BANK)
            .get_json(&supply_key(denom))?
            .unwrap_or(0))
    }

    /// Issue new coins to `to`
    pub fn mint(&self, store: &dyn KvStore, to: &Address, amount: &Coins) -> AnteResult<()> {
        for coin in amount {
            let balance = self.balance(store, to, &coin.denom)?;
            let supply = self.supply(store, &coin.denom)?;
            let (Some(balance), Some(supply)) = (
                balance.checked_add(coin.amount),
                supply.checked_add(coin.amount),
            ) else {
                return Err(AnteError::InvalidCoins(format!("minting {} overflows", coin)));
            };
            self.set_balance(store, to, &coin.denom, balance)?;
            ModuleStore::new(store, BANK).set_json(&supply_key(&coin.denom), &supply)?;
        }
        Ok(())
    }

    /// Move coins between accounts. Nothing is written unless every
    /// denomination is covered.
    pub fn send(&self, store: &dyn KvStore, from: &Address, to: &Address, amount: &Coins) -> AnteResult<()> {
        for coin in amount {
            let have = self.balance(store, from, &coin.denom)?;
            if have < coin.amount {
                return Err(AnteError::InsufficientFunds(format!(
                    "spendable balance {}{} is smaller than {}",
                    have, coin.denom, coin
                )));
            }
        }
        for coin in amount {
            let have = self.balance(store, from, &coin.denom)?;
            self.set_balance(store, from, &coin.denom, have - coin.amount)?;
            let theirs = self.balance(store, to, &coin.denom)?;
            self.set_balance(store, to, &coin.denom, theirs.saturating_add(coin.amount))?;
        }
        Ok(())
    }
}

impl ante::BankKeeper for BankKeeper {
    fn deduct_fee(&self, store: &dyn KvStore, payer: &Address, amount: &Coins) -> AnteResult<()> {
        self.send(store, payer, &self.fee_collector(), amount)
    }
}

/// v4 tracks total supply; rebuild it from balances.
pub(crate) fn migrate_v3_to_v4(store: &ModuleStore<'_>) -> UpgradeResult<()> {
    let mut supply: BTreeMap<String, u128> = BTreeMap::new();
    for (key, value) in store.scan(BALANCE_PREFIX)? {
        let Some(denom) = key.get(BALANCE_PREFIX.len() + Address::LEN..) else {
            continue;
        };
        let amount: u128 = serde_json::from_slice(&value)
            .map_err(|e| mycel_storage::StorageError::Deserialization(e.to_string()))?;
        let total = supply
            .entry(String::from_utf8_lossy(denom).into_owned())
            .or_default();
        *total = total.saturating_add(amount);
    }
    for (denom, total) in &supply {
        store.set_json(&supply_key(denom), total)?;
    }
    tracing::info!(denoms = supply.len(), "rebuilt bank supply");
    Ok(())
}
