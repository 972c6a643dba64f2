//! Administrative message-type switch

use crate::modules::CIRCUIT;
use mycel_ante::{self as ante, AnteResult};
use mycel_storage::{KvStore, ModuleStore};

const DISABLED_PREFIX: &[u8] = b"disabled/";

fn disabled_key(type_url: &str) -> Vec<u8> {
    let mut key = DISABLED_PREFIX.to_vec();
    key.extend_from_slice(type_url.as_bytes());
    key
}

/// Disabled message types, kept in the `circuit` namespace.
///
/// The namespace is removed by the v2.0.0 upgrade; afterwards every message
/// type is allowed.
#[derive(Clone, Copy, Debug, Default)]
pub struct CircuitKeeper;

impl CircuitKeeper {
    /// Create a new keeper
    pub fn new() -> Self {
        Self
    }

    /// Trip the breaker for `type_url`
    pub fn disable(&self, store: &dyn KvStore, type_url: &str) -> AnteResult<()> {
        ModuleStore::new(store, CIRCUIT).set(&disabled_key(type_url), &[])?;
        tracing::warn!(type_url, "message type disabled");
        Ok(())
    }

    /// Reset the breaker for `type_url`
    pub fn enable(&self, store: &dyn KvStore, type_url: &str) -> AnteResult<()> {
        ModuleStore::new(store, CIRCUIT).remove(&disabled_key(type_url))?;
        Ok(())
    }

    /// Every disabled type URL
    pub fn disabled(&self, store: &dyn KvStore) -> AnteResult<Vec<String>> {
        Ok(ModuleStore::new(store, CIRCUIT)
            .scan(DISABLED_PREFIX)?
            .into_iter()
            .map(|(key, _)| String::from_utf8_lossy(&key[DISABLED_PREFIX.len()..]).into_owned())
            .collect())
    }
}

impl ante::CircuitBreaker for CircuitKeeper {
    fn is_allowed(&self, store: &dyn KvStore, type_url: &str) -> AnteResult<bool> {
        Ok(!ModuleStore::new(store, CIRCUIT).has(&disabled_key(type_url))?)
    }
}
