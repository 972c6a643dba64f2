//! Node orchestration for mycel-node

use crate::config::{data_dir, genesis_path, ConfigError, NodeConfig};
use mycel_app::{App, AppError, Genesis, TxResult};
use mycel_primitives::BlockHeight;
use mycel_storage::{Database, KvStore, StorageError};
use mycel_upgrade::{read_upgrade_info, upgrade_info_path, UpgradeError};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::interval;

/// Node error types
#[derive(Debug, Error)]
pub enum NodeError {
    /// Application error
    #[error(transparent)]
    App(#[from] AppError),
    /// Storage error
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    /// Upgrade-info file error
    #[error("upgrade error: {0}")]
    Upgrade(#[from] UpgradeError),
    /// Configuration error
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Transaction bytes were not valid hex
    #[error("invalid transaction hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Result type for node operations
pub type NodeResult<T> = Result<T, NodeError>;

/// Single-validator dev node: produces a block every tick from the local
/// mempool.
pub struct Node {
    home: PathBuf,
    config: NodeConfig,
    app: App,
    mempool: VecDeque<Vec<u8>>,
}

impl Node {
    /// Open the database under `home`, build the app and write genesis state
    /// on first start.
    pub fn open(home: &Path, config: NodeConfig) -> NodeResult<Self> {
        let data = data_dir(home);
        std::fs::create_dir_all(&data)?;

        let db = Database::new(data.join("db"));
        db.open()?;
        let store: Arc<dyn KvStore> = Arc::new(db);
        let mut app = App::new(store, config.app_options(home)?)?;

        if app.version_map()?.is_empty() {
            let path = genesis_path(home);
            tracing::info!(path = %path.display(), "initializing chain from genesis");
            let genesis = Genesis::from_file(&path)?;
            app.init_chain(&genesis)?;
        }

        if let Some(plan) = read_upgrade_info(&data)? {
            if app.scheduler().registry().contains(&plan.name) {
                tracing::info!(name = %plan.name, height = plan.height, "upgrade info found, handler present");
            } else {
                tracing::warn!(
                    name = %plan.name,
                    height = plan.height,
                    info = %plan.info,
                    "upgrade info names an upgrade this binary does not carry"
                );
            }
        }

        tracing::info!(
            chain_id = %config.chain_id,
            height = app.last_height(),
            home = %home.display(),
            "node opened"
        );
        Ok(Self {
            home: home.to_path_buf(),
            config,
            app,
            mempool: VecDeque::new(),
        })
    }

    /// The application
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Transactions waiting for the next block
    pub fn pending(&self) -> usize {
        self.mempool.len()
    }

    /// Run mempool admission; queue the transaction if admitted
    pub fn submit(&mut self, tx: Vec<u8>) -> NodeResult<TxResult> {
        let result = self.app.check_tx(&tx)?;
        if result.is_ok() {
            self.mempool.push_back(tx);
        } else {
            tracing::debug!(code = result.code, log = %result.log, "tx refused by mempool");
        }
        Ok(result)
    }

    /// Move queued files from the inbox into the mempool. Returns how many were
    /// admitted.
    pub fn drain_inbox(&mut self) -> NodeResult<usize> {
        let dir = inbox_dir(&self.home);
        if !dir.exists() {
            return Ok(0);
        }
        let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "hex"))
            .collect();
        files.sort();

        let mut admitted = 0;
        for path in files {
            let content = std::fs::read_to_string(&path)?;
            let tx = match decode_hex(&content) {
                Ok(tx) => tx,
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "dropping inbox entry");
                    std::fs::remove_file(&path)?;
                    continue;
                }
            };
            // The entry stays queued until the mempool has answered.
            let result = self.submit(tx)?;
            std::fs::remove_file(&path)?;
            if result.is_ok() {
                admitted += 1;
            }
        }
        Ok(admitted)
    }

    /// begin_block, deliver every queued transaction, end_block, commit.
    ///
    /// Errors are fatal: the node must stop.
    pub fn produce_block(&mut self) -> NodeResult<BlockHeight> {
        let height = self.app.last_height() + 1;
        let time = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        let outcome = self.app.begin_block(height, time)?;
        tracing::debug!(height, ?outcome, "block opened");

        let txs: Vec<Vec<u8>> = self.mempool.drain(..).collect();
        let mut failed = 0;
        for tx in &txs {
            let result = self.app.deliver_tx(tx)?;
            if !result.is_ok() {
                failed += 1;
                tracing::debug!(height, code = result.code, log = %result.log, "tx failed");
            }
        }

        let base_gas_price = self.app.end_block()?;
        self.app.commit()?;
        tracing::info!(
            height,
            txs = txs.len(),
            failed,
            base_gas_price = %base_gas_price,
            "block produced"
        );
        Ok(height)
    }

    /// Halt height configured and reached
    pub fn halted(&self) -> bool {
        self.config.halt_height > 0 && self.app.last_height() >= self.config.halt_height
    }

    /// Produce blocks until Ctrl+C, the halt height, or a fatal error
    pub async fn run(&mut self) -> NodeResult<()> {
        tracing::info!(
            block_time_ms = self.config.block_time_ms,
            halt_height = self.config.halt_height,
            "starting block loop"
        );
        let mut ticker = interval(self.config.block_time());

        while !self.halted() {
            tokio::select! {
                _ = ticker.tick() => {
                    let admitted = self.drain_inbox()?;
                    if admitted > 0 {
                        tracing::debug!(admitted, pending = self.pending(), "inbox drained");
                    }
                    if let Err(e) = self.produce_block() {
                        if let NodeError::App(AppError::Upgrade(UpgradeError::UpgradeNeeded { .. })) = &e {
                            tracing::error!(
                                path = %upgrade_info_path(&data_dir(&self.home)).display(),
                                "install the new binary and restart"
                            );
                        }
                        return Err(e);
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown signal received");
                    return Ok(());
                }
            }
        }

        tracing::info!(height = self.app.last_height(), "halt height reached");
        Ok(())
    }
}

/// `<home>/data/inbox`: transactions queued for a running node
pub fn inbox_dir(home: &Path) -> PathBuf {
    data_dir(home).join("inbox")
}

/// Queue a transaction for the running node. The database is held by the
/// node process, so submission goes through the inbox.
pub fn queue_tx(home: &Path, tx_hex: &str) -> NodeResult<PathBuf> {
    decode_hex(tx_hex)?;
    let dir = inbox_dir(home);
    std::fs::create_dir_all(&dir)?;
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let path = dir.join(format!("{:024}.hex", stamp));
    std::fs::write(&path, tx_hex.trim())?;
    Ok(path)
}

/// Hex with optional `0x` prefix
pub fn decode_hex(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let s = s.trim();
    hex::decode(s.strip_prefix("0x").unwrap_or(s))
}
