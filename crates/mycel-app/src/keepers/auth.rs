//! Accounts, account numbers and auth params

use crate::modules::AUTH;
use mycel_ante::{self as ante, AnteParams, AnteResult, BaseAccount};
use mycel_primitives::Address;
use mycel_storage::{KvStore, ModuleStore};
use mycel_upgrade::UpgradeResult;

const ACCOUNT_PREFIX: &[u8] = b"acc/";
const PARAMS_KEY: &[u8] = b"params";
const NEXT_NUMBER_KEY: &[u8] = b"next_account_number";

fn account_key(address: &Address) -> Vec<u8> {
    let mut key = ACCOUNT_PREFIX.to_vec();
    key.extend_from_slice(address.as_bytes());
    key
}

/// Store-backed account keeper
#[derive(Clone, Copy, Debug, Default)]
pub struct AuthKeeper;

impl AuthKeeper {
    /// Create a new keeper
    pub fn new() -> Self {
        Self
    }

    /// Replace the auth params
    pub fn set_params(&self, store: &dyn KvStore, params: &AnteParams) -> AnteResult<()> {
        ModuleStore::new(store, AUTH).set_json(PARAMS_KEY, params)?;
        Ok(())
    }

    /// Allocate the next account number
    pub fn next_account_number(&self, store: &dyn KvStore) -> AnteResult<u64> {
        let module = ModuleStore::new(store, AUTH);
        let next: u64 = module.get_json(NEXT_NUMBER_KEY)?.unwrap_or(0);
        module.set_json(NEXT_NUMBER_KEY, &(next + 1))?;
        Ok(next)
    }

    /// Existing account, or a fresh one with a new account number
    pub fn get_or_create(&self, store: &dyn KvStore, address: &Address) -> AnteResult<BaseAccount> {
        if let Some(account) = ante::AccountKeeper::get_account(self, store, address)? {
            return Ok(account);
        }
        let account = BaseAccount {
            address: *address,
            public_key: None,
            account_number: self.next_account_number(store)?,
            sequence: 0,
        };
        ante::AccountKeeper::set_account(self, store, &account)?;
        tracing::debug!(address = %address, number = account.account_number, "created account");
        Ok(account)
    }

    /// Every account, ordered by address
    pub fn accounts(&self, store: &dyn KvStore) -> AnteResult<Vec<BaseAccount>> {
        ModuleStore::new(store, AUTH)
            .scan(ACCOUNT_PREFIX)?
            .into_iter()
            .map(|(_, value)| {
                serde_json::from_slice(&value)
                    .map_err(|e| ante::AnteError::Internal(format!("corrupt account: {}", e)))
            })
            .collect()
    }
}

impl ante::AccountKeeper for AuthKeeper {
    fn params(&self, store: &dyn KvStore) -> AnteResult<AnteParams> {
        Ok(ModuleStore::new(store, AUTH)
            .get_json(PARAMS_KEY)?
            .unwrap_or_default())
    }

    fn get_account(&self, store: &dyn KvStore, address: &Address) -> AnteResult<Option<BaseAccount>> {
        Ok(ModuleStore::new(store, AUTH).get_json(&account_key(address))?)
    }

    fn set_account(&self, store: &dyn KvStore, account: &BaseAccount) -> AnteResult<()> {
        ModuleStore::new(store, AUTH).set_json(&account_key(&account.address), account)?;
        Ok(())
    }
}

pub(crate) fn init_genesis(store: &ModuleStore<'_>) -> UpgradeResult<()> {
    store.set_json(PARAMS_KEY, &AnteParams::default())?;
    store.set_json(NEXT_NUMBER_KEY, &0u64)?;
    Ok(())
}

/// v4 keyed accounts by bare address; v5 moves them under `acc/` and
/// backfills params.
pub(crate) fn migrate_v4_to_v5(store: &ModuleStore<'_>) -> UpgradeResult<()> {
    let mut moved = 0usize;
    for (key, value) in store.scan(&[])? {
        if key.len() != Address::LEN {
            continue;
        }
        let mut new_key = ACCOUNT_PREFIX.to_vec();
        new_key.extend_from_slice(&key);
        store.set(&new_key, &value)?;
        store.remove(&key)?;
        moved += 1;
    }
    if !store.has(PARAMS_KEY)? {
        store.set_json(PARAMS_KEY, &AnteParams::default())?;
    }
    tracing::info!(accounts = moved, "migrated auth store to v5");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mycel_ante::AccountKeeper;
    use mycel_storage::MemoryDb;

    #[test]
    fn test_account_numbers_are_sequential() {
        let db = MemoryDb::new();
        let keeper = AuthKeeper::new();
        let a = keeper.get_or_create(&db, &Address::from_bytes([1; 20])).unwrap();
        let b = keeper.get_or_create(&db, &Address::from_bytes([2; 20])).unwrap();
        let again = keeper.get_or_create(&db, &Address::from_bytes([1; 20])).unwrap();
        assert_eq!((a.account_number, b.account_number), (0, 1));
        assert_eq!(again, a);
        assert_eq!(keeper.accounts(&db).unwrap().len(), 2);
    }

    #[test]
    fn test_params_default_until_set() {
        let db = MemoryDb::new();
        let keeper = AuthKeeper::new();
        assert_eq!(keeper.params(&db).unwrap(), AnteParams::default());

        let params = AnteParams {
            max_memo_characters: 16,
            ..Default::default()
        };
        keeper.set_params(&db, &params).unwrap();
        assert_eq!(keeper.params(&db).unwrap(), params);
    }

    #[test]
    fn test_v5_migration_rekeys_accounts() {
        let db = MemoryDb::new();
        let address = Address::from_bytes([7; 20]);
        let legacy = BaseAccount {
            address,
            account_number: 3,
            ..Default::default()
        };
        let module = ModuleStore::new(&db, AUTH);
        module.set_json(address.as_bytes(), &legacy).unwrap();

        migrate_v4_to_v5(&module).unwrap();

        assert!(!module.has(address.as_bytes()).unwrap());
        let keeper = AuthKeeper::new();
        assert_eq!(keeper.get_account(&db, &address).unwrap(), Some(legacy));
        assert_eq!(keeper.params(&db).unwrap(), AnteParams::default());
    }
}
