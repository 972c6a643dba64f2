//! Genesis state

use crate::error::{AppError, AppResult};
use crate::keepers::{AppKeepers, FeeMarketParams, TokenFactoryParams};
use mycel_ante::AnteParams;
use mycel_primitives::{Address, Coins};
use mycel_storage::KvStore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Funded account at genesis
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAccount {
    /// Account address
    pub address: Address,
    /// Initial balance
    #[serde(default)]
    pub coins: Coins,
}

/// Initial chain state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    /// Chain identifier
    pub chain_id: String,
    /// Genesis time, unix seconds
    #[serde(default)]
    pub genesis_time: u64,
    /// Funded accounts
    #[serde(default)]
    pub accounts: Vec<GenesisAccount>,
    /// Auth params; module defaults when absent
    #[serde(default)]
    pub auth_params: Option<AnteParams>,
    /// Fee-market params; module defaults when absent
    #[serde(default)]
    pub feemarket_params: Option<FeeMarketParams>,
    /// Token-factory params; module defaults when absent
    #[serde(default)]
    pub tokenfactory_params: Option<TokenFactoryParams>,
}

impl Genesis {
    /// Genesis with no accounts
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            genesis_time: 0,
            accounts: Vec::new(),
            auth_params: None,
            feemarket_params: None,
            tokenfactory_params: None,
        }
    }

    /// Add a funded account
    pub fn with_account(mut self, address: Address, coins: Coins) -> Self {
        self.accounts.push(GenesisAccount { address, coins });
        self
    }

    /// Load a JSON genesis file
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| AppError::Genesis(format!("{}: {}", path.display(), e)))?;
        let genesis: Genesis = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::Genesis(format!("{}: {}", path.display(), e)))?;
        genesis.validate()?;
        Ok(genesis)
    }

    /// Stateless checks
    pub fn validate(&self) -> AppResult<()> {
        if self.chain_id.trim().is_empty() {
            return Err(AppError::Genesis("chain id cannot be empty".to_string()));
        }
        let mut seen = HashSet::new();
        for account in &self.accounts {
            if !seen.insert(account.address) {
                return Err(AppError::Genesis(format!(
                    "duplicate account {}",
                    account.address
                )));
            }
            account
                .coins
                .validate()
                .map_err(|e| AppError::Genesis(format!("account {}: {}", account.address, e)))?;
        }
        Ok(())
    }

    /// Write params and accounts. Modules must already hold their default state.
    pub(crate) fn apply(&self, store: &dyn KvStore, keepers: &AppKeepers) -> AppResult<()> {
        if let Some(params) = &self.auth_params {
            keepers.auth.set_params(store, params)?;
        }
        if let Some(params) = &self.feemarket_params {
            keepers.feemarket.set_params(store, params)?;
        }
        if let Some(params) = &self.tokenfactory_params {
            keepers.tokenfactory.set_params(store, params)?;
        }
        for account in &self.accounts {
            keepers.auth.get_or_create(store, &account.address)?;
            keepers.bank.mint(store, &account.address, &account.coins)?;
        }
        tracing::info!(accounts = self.accounts.len(), chain_id = %self.chain_id, "genesis state written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genesis.json");
        std::fs::write(
            &path,
            r#"{"chain_id":"mycel-1","accounts":[{"address":"0x0101010101010101010101010101010101010101","coins":[{"denom":"uoki","amount":5}]}]}"#,
        )
        .unwrap();

        let genesis = Genesis::from_file(&path).unwrap();
        assert_eq!(genesis.accounts[0].coins, Coins::one("uoki", 5));
        assert!(genesis.auth_params.is_none());
    }

    #[test]
    fn test_duplicate_accounts_rejected() {
        let address = Address::from_bytes([1; 20]);
        let genesis = Genesis::new("mycel-1")
            .with_account(address, Coins::one("uoki", 1))
            .with_account(address, Coins::one("uoki", 2));
        assert!(matches!(genesis.validate(), Err(AppError::Genesis(_))));
        assert!(Genesis::new(" ").validate().is_err());
    }
}
