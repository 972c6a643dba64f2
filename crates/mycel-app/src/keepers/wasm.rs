//! Contract runtime state: the per-block transaction counter

use crate::modules::WASM;
use mycel_ante::{self as ante, AnteResult};
use mycel_primitives::BlockHeight;
use mycel_storage::{KvStore, ModuleStore};
use serde::{Deserialize, Serialize};

const TX_COUNTER_KEY: &[u8] = b"tx_counter";

#[derive(Debug, Serialize, Deserialize)]
struct HeightCounter {
    height: BlockHeight,
    counter: u64,
}

/// Store-backed wasm keeper
#[derive(Clone, Copy, Debug, Default)]
pub struct WasmKeeper;

impl WasmKeeper {
    /// Create a new keeper
    pub fn new() -> Self {
        Self
    }
}

impl ante::TxCounter for WasmKeeper {
    fn next_index(&self, store: &dyn KvStore, height: BlockHeight, simulate: bool) -> AnteResult<u64> {
        let module = ModuleStore::new(store, WASM);
        let index = match module.get_json::<HeightCounter>(TX_COUNTER_KEY)? {
            Some(last) if last.height == height => last.counter + 1,
            _ => 0,
        };
        if !simulate {
            module.set_json(
                TX_COUNTER_KEY,
                &HeightCounter {
                    height,
                    counter: index,
                },
            )?;
        }
        Ok(index)
    }
}
