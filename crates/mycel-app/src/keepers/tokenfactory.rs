//! Permissionless denominations

use super::BankKeeper;
use crate::error::{AppError, AppResult};
use crate::modules::TOKENFACTORY;
use mycel_ante::{AnteError, AnteResult};
use mycel_primitives::{Address, Coins, Gas};
use mycel_storage::{KvStore, ModuleStore};
use mycel_upgrade::UpgradeResult;
use serde::{Deserialize, Serialize};

const PARAMS_KEY: &[u8] = b"params";
const DENOM_PREFIX: &[u8] = b"denoms/";
const MAX_SUBDENOM_LEN: usize = 44;

fn denom_key(denom: &str) -> Vec<u8> {
    let mut key = DENOM_PREFIX.to_vec();
    key.extend_from_slice(denom.as_bytes());
    key
}

/// Token-factory parameters
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenFactoryParams {
    /// Charged to the creator of a new denom
    pub denom_creation_fee: Coins,
    /// Extra gas consumed by denom creation
    pub denom_creation_gas_consume: Gas,
}

/// Admin record of a created denom
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenomAuthority {
    /// Account allowed to mint and burn
    pub admin: Address,
}

/// Store-backed token-factory keeper
#[derive(Clone, Copy, Debug, Default)]
pub struct TokenFactoryKeeper {
    bank: BankKeeper,
}

impl TokenFactoryKeeper {
    /// Create a new keeper
    pub fn new() -> Self {
        Self::default()
    }

    /// Current params
    pub fn params(&self, store: &dyn KvStore) -> AnteResult<TokenFactoryParams> {
        Ok(ModuleStore::new(store, TOKENFACTORY)
            .get_json(PARAMS_KEY)?
            .unwrap_or_default())
    }

    /// Replace the params
    pub fn set_params(&self, store: &dyn KvStore, params: &TokenFactoryParams) -> AnteResult<()> {
        ModuleStore::new(store, TOKENFACTORY).set_json(PARAMS_KEY, params)?;
        Ok(())
    }

    /// Full denom for `creator`'s `subdenom`
    pub fn full_denom(creator: &Address, subdenom: &str) -> String {
        format!("factory/{}/{}", creator, subdenom)
    }

    /// Admin of a created denom
    pub fn authority(&self, store: &dyn KvStore, denom: &str) -> AnteResult<Option<DenomAuthority>> {
        Ok(ModuleStore::new(store, TOKENFACTORY).get_json(&denom_key(denom))?)
    }

    /// Register `factory/<creator>/<subdenom>` with the creator as admin and
    /// charge the creation fee. Returns the denom and the gas to consume.
    pub fn create_denom(
        &self,
        store: &dyn KvStore,
        creator: &Address,
        subdenom: &str,
    ) -> AppResult<(String, Gas)> {
        if subdenom.is_empty()
            || subdenom.len() > MAX_SUBDENOM_LEN
            || !subdenom
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.')
        {
            return Err(AnteError::InvalidRequest(format!("invalid subdenom: {:?}", subdenom)).into());
        }

        let denom = Self::full_denom(creator, subdenom);
        if self.authority(store, &denom)?.is_some() {
            return Err(AppError::DenomExists(denom));
        }

        let params = self.params(store)?;
        if !params.denom_creation_fee.is_zero() {
            self.bank
                .send(store, creator, &self.bank.fee_collector(), &params.denom_creation_fee)?;
        }

        ModuleStore::new(store, TOKENFACTORY)
            .set_json(&denom_key(&denom), &DenomAuthority { admin: *creator })?;
        tracing::info!(denom = %denom, creator = %creator, "denom created");
        Ok((denom, params.denom_creation_gas_consume))
    }
}

pub(crate) fn init_genesis(store: &ModuleStore<'_>) -> UpgradeResult<()> {
    store.set_json(PARAMS_KEY, &TokenFactoryParams::default())?;
    Ok(())
}
