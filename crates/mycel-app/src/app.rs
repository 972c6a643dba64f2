//! Application: threads blocks and transactions through admission, message
//! execution and the upgrade scheduler

use crate::error::{AppError, AppResult};
use crate::genesis::Genesis;
use crate::keepers::{AppFeeChecker, AppKeepers};
use crate::modules::module_manager;
use crate::router::{AppRouter, MsgRouter};
use crate::upgrades;
use mycel_ante::{
    AnteHandler, BlockInfo, DirectSignMode, Event, ExecMode, HandlerOptions, Rejection, TxContext,
};
use mycel_primitives::{BlockHeight, Dec, DecCoin, Gas};
use mycel_storage::{cf, CacheStore, KvStore, StorageError};
use mycel_types::{decode_tx, Tx};
use mycel_upgrade::{Plan, UpgradeOutcome, UpgradeScheduler, UpgradeStore, VersionMap};
use std::path::PathBuf;
use std::sync::Arc;

const LAST_HEIGHT_KEY: &[u8] = b"app/last_height";
const LAST_TIME_KEY: &[u8] = b"app/last_time";
const CHAIN_ID_KEY: &[u8] = b"app/chain_id";

/// Node-supplied application settings
#[derive(Clone, Debug)]
pub struct AppOptions {
    /// Chain identifier bound into every sign doc
    pub chain_id: String,
    /// Node-local minimum gas prices, used while the fee market is disabled
    pub min_gas_prices: Vec<DecCoin>,
    /// Gas ceiling for simulations
    pub simulation_gas_limit: Option<Gas>,
    /// Heights whose upgrade plan is cleared instead of applied
    pub skip_upgrade_heights: Vec<BlockHeight>,
    /// Where `upgrade-info.json` is written on an upgrade halt
    pub data_dir: Option<PathBuf>,
    /// Version of this binary, names the no-op upgrade
    pub build_version: String,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            chain_id: "mycel-1".to_string(),
            min_gas_prices: Vec::new(),
            simulation_gas_limit: None,
            skip_upgrade_heights: Vec::new(),
            data_dir: None,
            build_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Result of checking, simulating or delivering one transaction
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxResult {
    /// 0 on success
    pub code: u32,
    /// Namespace of `code`
    pub codespace: &'static str,
    /// Error text, empty on success
    pub log: String,
    /// Gas limit asked for
    pub gas_wanted: Gas,
    /// Gas consumed
    pub gas_used: Gas,
    /// Mempool priority
    pub priority: Dec,
    /// Position within the block
    pub tx_index: Option<u64>,
    /// Emitted events
    pub events: Vec<Event>,
}

impl TxResult {
    /// Transaction succeeded
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }

    fn failed(err: &AppError, gas_wanted: Gas, gas_used: Gas) -> Self {
        Self {
            code: err.code(),
            codespace: err.codespace(),
            log: err.to_string(),
            gas_wanted,
            gas_used,
            ..Default::default()
        }
    }

    fn rejected(rejection: &Rejection, gas_wanted: Gas) -> Self {
        Self {
            code: rejection.code(),
            codespace: rejection.error.codespace(),
            log: rejection.to_string(),
            gas_wanted,
            gas_used: rejection.gas_used,
            ..Default::default()
        }
    }
}

/// Block in progress
struct BlockState {
    info: BlockInfo,
    deliver: Arc<CacheStore>,
    gas_used: Gas,
}

/// The Mycel application
pub struct App {
    store: Arc<dyn KvStore>,
    keepers: AppKeepers,
    ante: AnteHandler,
    router: Arc<dyn MsgRouter>,
    scheduler: UpgradeScheduler<AppKeepers>,
    chain_id: String,
    last_height: BlockHeight,
    last_time: u64,
    check_state: Arc<CacheStore>,
    block: Option<BlockState>,
}

impl App {
    /// Build the application over `store`, loading any pending upgrade plan
    pub fn new(store: Arc<dyn KvStore>, options: AppOptions) -> AppResult<Self> {
        let keepers = AppKeepers::new();
        let ante = AnteHandler::new(HandlerOptions {
            account_keeper: Some(keepers.auth.clone()),
            bank_keeper: Some(keepers.bank.clone()),
            feegrant_keeper: Some(keepers.feegrant.clone()),
            circuit_breaker: Some(keepers.circuit.clone()),
            tx_counter: Some(keepers.wasm.clone()),
            relay_checker: Some(keepers.ibc.clone()),
            sign_mode_handler: Some(Arc::new(DirectSignMode)),
            tx_fee_checker: Some(Arc::new(AppFeeChecker::new(
                keepers.feemarket.clone(),
                options.min_gas_prices.clone(),
            ))),
            sig_gas_consumer: None,
            simulation_gas_limit: options.simulation_gas_limit,
        })?;

        let registry = upgrades::registry(&options.build_version)?;
        let mut scheduler = UpgradeScheduler::new(registry, module_manager())
            .with_skip_heights(options.skip_upgrade_heights.iter().copied());
        if let Some(dir) = &options.data_dir {
            scheduler = scheduler.with_data_dir(dir.clone());
        }
        scheduler.load(store.as_ref())?;

        let last_height = read_meta::<BlockHeight>(store.as_ref(), LAST_HEIGHT_KEY)?.unwrap_or(0);
        let last_time = read_meta::<u64>(store.as_ref(), LAST_TIME_KEY)?.unwrap_or(0);
        if let Some(stored) = read_meta::<String>(store.as_ref(), CHAIN_ID_KEY)? {
            if stored != options.chain_id {
                return Err(AppError::Genesis(format!(
                    "store belongs to chain {}, configured for {}",
                    stored, options.chain_id
                )));
            }
        }

        tracing::info!(
            chain_id = %options.chain_id,
            height = last_height,
            version = %options.build_version,
            upgrades = scheduler.registry().len(),
            "application loaded"
        );

        Ok(Self {
            check_state: Arc::new(CacheStore::new(store.clone())),
            router: Arc::new(AppRouter::new(keepers.clone())),
            store,
            keepers,
            ante,
            scheduler,
            chain_id: options.chain_id,
            last_height,
            last_time,
            block: None,
        })
    }

    /// Replace the message router
    pub fn with_router(mut self, router: Arc<dyn MsgRouter>) -> Self {
        self.router = router;
        self
    }

    /// Committed store
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Keepers
    pub fn keepers(&self) -> &AppKeepers {
        &self.keepers
    }

    /// Upgrade scheduler
    pub fn scheduler(&self) -> &UpgradeScheduler<AppKeepers> {
        &self.scheduler
    }

    /// Chain identifier
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Height of the last committed block
    pub fn last_height(&self) -> BlockHeight {
        self.last_height
    }

    /// Gas consumed so far by the open block
    pub fn block_gas_used(&self) -> Option<Gas> {
        self.block.as_ref().map(|block| block.gas_used)
    }

    /// Committed version map
    pub fn version_map(&self) -> AppResult<VersionMap> {
        Ok(UpgradeStore::new(self.store.as_ref()).version_map()?)
    }

    /// Write genesis state: every module's default state, then `genesis`.
    pub fn init_chain(&mut self, genesis: &Genesis) -> AppResult<VersionMap> {
        genesis.validate()?;
        if genesis.chain_id != self.chain_id {
            return Err(AppError::Genesis(format!(
                "genesis is for chain {}, configured for {}",
                genesis.chain_id, self.chain_id
            )));
        }
        if !self.version_map()?.is_empty() {
            return Err(AppError::AlreadyInitialized(self.last_height));
        }

        let branch = CacheStore::new(self.store.clone());
        let vm = self
            .scheduler
            .modules()
            .run_migrations(&branch, &VersionMap::new())?;
        genesis.apply(&branch, &self.keepers)?;
        UpgradeStore::new(&branch).set_version_map(&vm)?;
        write_meta(&branch, CHAIN_ID_KEY, &self.chain_id)?;
        write_meta(&branch, LAST_HEIGHT_KEY, &0i64)?;
        write_meta(&branch, LAST_TIME_KEY, &genesis.genesis_time)?;
        branch.commit()?;

        self.last_height = 0;
        self.last_time = genesis.genesis_time;
        self.reset_check_state();
        tracing::info!(modules = vm.len(), "chain initialized");
        Ok(vm)
    }

    /// Open block `height`. The upgrade scheduler runs first, before any
    /// transaction of the block.
    ///
    /// A fatal error here means the node must halt.
    pub fn begin_block(&mut self, height: BlockHeight, time: u64) -> AppResult<UpgradeOutcome> {
        if self.block.is_some() {
            return Err(AppError::Lifecycle("previous block not committed".to_string()));
        }
        if height != self.last_height + 1 {
            return Err(AppError::Lifecycle(format!(
                "expected height {}, got {}",
                self.last_height + 1,
                height
            )));
        }

        let deliver = Arc::new(CacheStore::new(self.store.clone()));
        let deliver_store: Arc<dyn KvStore> = deliver.clone();
        let outcome = self
            .scheduler
            .begin_block(&deliver_store, &self.keepers, height)
            .map_err(|e| {
                if e.is_fatal() {
                    tracing::error!(height, error = %e, "halting");
                }
                AppError::from(e)
            })?;

        self.block = Some(BlockState {
            info: BlockInfo {
                chain_id: self.chain_id.clone(),
                height,
                time,
            },
            deliver,
            gas_used: 0,
        });
        Ok(outcome)
    }

    /// Execute a transaction in the open block.
    ///
    /// The admission write set (fee, sequences) is committed whenever the
    /// pipeline admits; message writes only when every message succeeds.
    /// `Err` is reserved for failures that must stop the node.
    pub fn deliver_tx(&mut self, tx_bytes: &[u8]) -> AppResult<TxResult> {
        let block = self
            .block
            .as_mut()
            .ok_or_else(|| AppError::Lifecycle("deliver_tx outside a block".to_string()))?;

        let tx = match decode_tx(tx_bytes) {
            Ok(tx) => tx,
            Err(e) => return Ok(TxResult::failed(&AppError::Decode(e), 0, 0)),
        };
        let gas_wanted = tx.gas_limit();

        let ante_branch = CacheStore::new(block.deliver.clone());
        let mut ctx = TxContext::new(&tx, tx_bytes, &ante_branch, ExecMode::Deliver, &block.info);
        let admitted = match self.ante.run(&mut ctx) {
            Ok(admitted) => admitted,
            Err(rejection) => {
                block.gas_used = block.gas_used.saturating_add(rejection.gas_used);
                return Ok(TxResult::rejected(&rejection, gas_wanted));
            }
        };
        ante_branch.commit()?;

        let msg_branch = CacheStore::new(block.deliver.clone());
        let executed = execute_msgs(
            self.router.as_ref(),
            &msg_branch,
            &tx,
            admitted.gas_used,
            Some(gas_wanted),
        );
        let result = match executed {
            Ok((gas_used, events)) => {
                msg_branch.commit()?;
                let mut all = admitted.events;
                all.extend(events);
                TxResult {
                    gas_wanted,
                    gas_used,
                    priority: admitted.priority,
                    tx_index: admitted.tx_index,
                    events: all,
                    ..Default::default()
                }
            }
            Err((err, gas_used)) => {
                if err.is_fatal() {
                    return Err(err);
                }
                msg_branch.discard();
                tracing::debug!(code = err.code(), hash = %tx.hash().short(), "tx failed: {}", err);
                TxResult {
                    tx_index: admitted.tx_index,
                    ..TxResult::failed(&err, gas_wanted, gas_used)
                }
            }
        };

        block.gas_used = block.gas_used.saturating_add(result.gas_used);
        Ok(result)
    }

    /// First mempool admission
    pub fn check_tx(&self, tx_bytes: &[u8]) -> AppResult<TxResult> {
        self.check(tx_bytes, ExecMode::Check)
    }

    /// Re-admission after a commit
    pub fn recheck_tx(&self, tx_bytes: &[u8]) -> AppResult<TxResult> {
        self.check(tx_bytes, ExecMode::ReCheck)
    }

    fn check(&self, tx_bytes: &[u8], mode: ExecMode) -> AppResult<TxResult> {
        let tx = match decode_tx(tx_bytes) {
            Ok(tx) => tx,
            Err(e) => return Ok(TxResult::failed(&AppError::Decode(e), 0, 0)),
        };
        let block = self.next_block_info();
        let branch = CacheStore::new(self.check_state.clone());
        let mut ctx = TxContext::new(&tx, tx_bytes, &branch, mode, &block);
        match self.ante.run(&mut ctx) {
            Ok(admitted) => {
                branch.commit()?;
                Ok(TxResult {
                    gas_wanted: tx.gas_limit(),
                    gas_used: admitted.gas_used,
                    priority: admitted.priority,
                    tx_index: admitted.tx_index,
                    events: admitted.events,
                    ..Default::default()
                })
            }
            Err(rejection) => Ok(TxResult::rejected(&rejection, tx.gas_limit())),
        }
    }

    /// Estimate gas: admission and messages run against the check state and
    /// every write is discarded
    pub fn simulate_tx(&self, tx_bytes: &[u8]) -> AppResult<TxResult> {
        let tx = match decode_tx(tx_bytes) {
            Ok(tx) => tx,
            Err(e) => return Ok(TxResult::failed(&AppError::Decode(e), 0, 0)),
        };
        let block = self.next_block_info();
        let branch = CacheStore::new(self.check_state.clone());
        let mut ctx = TxContext::new(&tx, tx_bytes, &branch, ExecMode::Simulate, &block);
        let admitted = match self.ante.run(&mut ctx) {
            Ok(admitted) => admitted,
            Err(rejection) => return Ok(TxResult::rejected(&rejection, tx.gas_limit())),
        };

        let executed = execute_msgs(
            self.router.as_ref(),
            &branch,
            &tx,
            admitted.gas_used,
            admitted.gas_limit,
        );
        let result = match executed {
            Ok((gas_used, events)) => {
                let mut all = admitted.events;
                all.extend(events);
                TxResult {
                    gas_wanted: tx.gas_limit(),
                    gas_used,
                    priority: admitted.priority,
                    events: all,
                    ..Default::default()
                }
            }
            Err((err, gas_used)) => TxResult::failed(&err, tx.gas_limit(), gas_used),
        };
        branch.discard();
        Ok(result)
    }

    /// Close the open block: move the base gas price toward demand
    pub fn end_block(&mut self) -> AppResult<Dec> {
        let block = self
            .block
            .as_ref()
            .ok_or_else(|| AppError::Lifecycle("end_block outside a block".to_string()))?;
        let price = self
            .keepers
            .feemarket
            .update(block.deliver.as_ref(), block.gas_used)?;
        tracing::debug!(height = block.info.height, gas_used = block.gas_used, base_gas_price = %price, "block ended");
        Ok(price)
    }

    /// Persist the open block atomically and reset the check state
    pub fn commit(&mut self) -> AppResult<BlockHeight> {
        let block = self
            .block
            .take()
            .ok_or_else(|| AppError::Lifecycle("commit outside a block".to_string()))?;
        let height = block.info.height;
        write_meta(block.deliver.as_ref(), LAST_HEIGHT_KEY, &height)?;
        write_meta(block.deliver.as_ref(), LAST_TIME_KEY, &block.info.time)?;
        block.deliver.commit()?;

        self.last_height = height;
        self.last_time = block.info.time;
        self.reset_check_state();
        tracing::info!(height, gas_used = block.gas_used, "committed block");
        Ok(height)
    }

    /// Schedule an upgrade against committed state
    pub fn schedule_upgrade(&self, plan: &Plan) -> AppResult<()> {
        UpgradeStore::new(self.current_store()).schedule_upgrade(plan, self.current_height())?;
        Ok(())
    }

    /// Drop the pending upgrade plan
    pub fn cancel_upgrade(&self) -> AppResult<Option<Plan>> {
        Ok(UpgradeStore::new(self.current_store()).cancel_upgrade()?)
    }

    /// Pending upgrade plan
    pub fn pending_upgrade(&self) -> AppResult<Option<Plan>> {
        Ok(UpgradeStore::new(self.current_store()).plan()?)
    }

    /// Applied upgrades with their heights
    pub fn applied_upgrades(&self) -> AppResult<Vec<(String, BlockHeight)>> {
        Ok(UpgradeStore::new(self.current_store()).applied()?)
    }

    /// Write set of the open block, or the committed store between blocks
    fn current_store(&self) -> &dyn KvStore {
        match &self.block {
            Some(block) => block.deliver.as_ref(),
            None => self.store.as_ref(),
        }
    }

    fn current_height(&self) -> BlockHeight {
        match &self.block {
            Some(block) => block.info.height,
            None => self.last_height,
        }
    }

    fn next_block_info(&self) -> BlockInfo {
        BlockInfo {
            chain_id: self.chain_id.clone(),
            height: self.last_height + 1,
            time: self.last_time,
        }
    }

    fn reset_check_state(&mut self) {
        self.check_state = Arc::new(CacheStore::new(self.store.clone()));
    }
}

/// Run every message in order on `store`, stopping at the first failure.
/// Returns total gas including `admission_gas`; `gas_limit` of `None` leaves
/// execution unbounded.
fn execute_msgs(
    router: &dyn MsgRouter,
    store: &dyn KvStore,
    tx: &Tx,
    admission_gas: Gas,
    gas_limit: Option<Gas>,
) -> Result<(Gas, Vec<Event>), (AppError, Gas)> {
    let gas_wanted = gas_limit.unwrap_or(Gas::MAX);
    let mut gas_used = admission_gas;
    let mut events = Vec::new();

    for msg in &tx.body.messages {
        let response = router.route(store, msg).map_err(|e| (e, gas_used))?;
        gas_used = gas_used.saturating_add(response.gas_used);
        if gas_used > gas_wanted {
            return Err((
                AppError::OutOfGas {
                    wanted: gas_wanted,
                    used: gas_used,
                },
                gas_used,
            ));
        }
        events.extend(response.events);
    }
    Ok((gas_used, events))
}

fn read_meta<T: serde::de::DeserializeOwned>(store: &dyn KvStore, key: &[u8]) -> AppResult<Option<T>> {
    match store.get(cf::META, key)? {
        Some(bytes) => Ok(Some(
            serde_json::from_slice(&bytes).map_err(|e| StorageError::Deserialization(e.to_string()))?,
        )),
        None => Ok(None),
    }
}

fn write_meta<T: serde::Serialize>(store: &dyn KvStore, key: &[u8], value: &T) -> AppResult<()> {
    let bytes = serde_json::to_vec(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
    store.put(cf::META, key, &bytes)?;
    Ok(())
}
