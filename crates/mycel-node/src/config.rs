//! Configuration types for mycel-node

use mycel_app::AppOptions;
use mycel_primitives::{BlockHeight, DecCoin, Gas};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Config file name under `<home>/config`
pub const APP_TOML: &str = "app.toml";

/// Genesis file name under `<home>/config`
pub const GENESIS_JSON: &str = "genesis.json";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed app.toml
    #[error("invalid app.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Config could not be rendered
    #[error("failed to write app.toml: {0}")]
    Render(#[from] toml::ser::Error),
    /// Bad `minimum_gas_prices` entry
    #[error("invalid minimum gas price {0:?}: {1}")]
    GasPrice(String, String),
}

/// Node configuration, read from `<home>/config/app.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Chain ID
    #[serde(default = "default_chain_id")]
    pub chain_id: String,
    /// Node-local minimum gas prices, e.g. `"0.002uoki"`
    #[serde(default = "default_minimum_gas_prices")]
    pub minimum_gas_prices: String,
    /// Heights whose upgrade plan is cleared instead of applied
    #[serde(default)]
    pub unsafe_skip_upgrade_heights: Vec<BlockHeight>,
    /// Contract runtime settings
    #[serde(default)]
    pub wasm: WasmConfig,
    /// Dev block interval
    #[serde(default = "default_block_time_ms")]
    pub block_time_ms: u64,
    /// Stop after committing this height (0 = never)
    #[serde(default)]
    pub halt_height: BlockHeight,
}

/// `[wasm]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasmConfig {
    /// Gas ceiling for simulations
    #[serde(default)]
    pub simulation_gas_limit: Option<Gas>,
}

fn default_chain_id() -> String {
    "mycel-1".to_string()
}

fn default_minimum_gas_prices() -> String {
    "0.002uoki".to_string()
}

fn default_block_time_ms() -> u64 {
    1_000
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            minimum_gas_prices: default_minimum_gas_prices(),
            unsafe_skip_upgrade_heights: Vec::new(),
            wasm: WasmConfig::default(),
            block_time_ms: default_block_time_ms(),
            halt_height: 0,
        }
    }
}

impl NodeConfig {
    /// Load `<home>/config/app.toml`; defaults when the file is absent
    pub fn load(home: &Path) -> Result<Self, ConfigError> {
        let path = config_dir(home).join(APP_TOML);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no app.toml, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Write `<home>/config/app.toml`
    pub fn save(&self, home: &Path) -> Result<PathBuf, ConfigError> {
        let dir = config_dir(home);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(APP_TOML);
        std::fs::write(&path, toml::to_string_pretty(self)?)?;
        Ok(path)
    }

    /// Merge CLI skip heights into the file's set
    pub fn merge_skip_heights(&mut self, heights: &[BlockHeight]) {
        for height in heights {
            if !self.unsafe_skip_upgrade_heights.contains(height) {
                self.unsafe_skip_upgrade_heights.push(*height);
            }
        }
        self.unsafe_skip_upgrade_heights.sort_unstable();
    }

    /// Parsed `minimum_gas_prices`
    pub fn min_gas_prices(&self) -> Result<Vec<DecCoin>, ConfigError> {
        self.minimum_gas_prices
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<DecCoin>()
                    .map_err(|e| ConfigError::GasPrice(s.to_string(), e.to_string()))
            })
            .collect()
    }

    /// Block interval
    pub fn block_time(&self) -> Duration {
        Duration::from_millis(self.block_time_ms.max(1))
    }

    /// Application options for a node rooted at `home`
    pub fn app_options(&self, home: &Path) -> Result<AppOptions, ConfigError> {
        Ok(AppOptions {
            chain_id: self.chain_id.clone(),
            min_gas_prices: self.min_gas_prices()?,
            simulation_gas_limit: self.wasm.simulation_gas_limit,
            skip_upgrade_heights: self.unsafe_skip_upgrade_heights.clone(),
            data_dir: Some(data_dir(home)),
            ..Default::default()
        })
    }
}

/// `<home>/config`
pub fn config_dir(home: &Path) -> PathBuf {
    home.join("config")
}

/// `<home>/data`
pub fn data_dir(home: &Path) -> PathBuf {
    home.join("data")
}

/// `<home>/config/genesis.json`
pub fn genesis_path(home: &Path) -> PathBuf {
    config_dir(home).join(GENESIS_JSON)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mycel_primitives::Dec;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: NodeConfig = toml::from_str("").unwrap();
        assert_eq!(config, NodeConfig::default());
        assert_eq!(config.chain_id, "mycel-1");
        assert_eq!(config.block_time(), Duration::from_secs(1));
        assert_eq!(config.wasm.simulation_gas_limit, None);
    }

    #[test]
    fn test_parse_app_toml() {
        let content = r#"
            chain_id = "mycel-testnet-3"
            minimum_gas_prices = "0.0025uoki, 0.1uatom"
            unsafe_skip_upgrade_heights = [1200]
            halt_height = 5000

            [wasm]
            simulation_gas_limit = 3000000
        "#;
        let config: NodeConfig = toml::from_str(content).unwrap();
        assert_eq!(config.chain_id, "mycel-testnet-3");
        assert_eq!(config.unsafe_skip_upgrade_heights, vec![1200]);
        assert_eq!(config.halt_height, 5000);
        assert_eq!(config.wasm.simulation_gas_limit, Some(3_000_000));

        let prices = config.min_gas_prices().unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].denom, "uoki");
        assert_eq!(prices[0].amount, Dec::from_str_exact("0.0025").unwrap());
    }

    #[test]
    fn test_bad_gas_price() {
        let config = NodeConfig {
            minimum_gas_prices: "cheap".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.min_gas_prices(), Err(ConfigError::GasPrice(..))));
    }

    #[test]
    fn test_empty_gas_prices() {
        let config = NodeConfig {
            minimum_gas_prices: String::new(),
            ..Default::default()
        };
        assert!(config.min_gas_prices().unwrap().is_empty());
    }

    #[test]
    fn test_merge_skip_heights() {
        let mut config = NodeConfig {
            unsafe_skip_upgrade_heights: vec![300, 100],
            ..Default::default()
        };
        config.merge_skip_heights(&[100, 200]);
        assert_eq!(config.unsafe_skip_upgrade_heights, vec![100, 200, 300]);
    }

    #[test]
    fn test_save_then_load() {
        let home = tempfile::tempdir().unwrap();
        assert_eq!(NodeConfig::load(home.path()).unwrap(), NodeConfig::default());

        let config = NodeConfig {
            chain_id: "mycel-local".to_string(),
            halt_height: 42,
            ..Default::default()
        };
        config.save(home.path()).unwrap();
        assert_eq!(NodeConfig::load(home.path()).unwrap(), config);
    }

    #[test]
    fn test_app_options() {
        let home = Path::new("/var/mycel");
        let options = NodeConfig::default().app_options(home).unwrap();
        assert_eq!(options.chain_id, "mycel-1");
        assert_eq!(options.data_dir, Some(PathBuf::from("/var/mycel/data")));
        assert_eq!(options.min_gas_prices.len(), 1);
    }
}
