//! Mycel node binary
//!
//! This is the main entry point for running a Mycel node and for the
//! operator commands that act on its local state.

mod cli;
mod config;
mod node;

use anyhow::{bail, Context, Result};
use cli::{Cli, Command, UpgradeCommand};
use config::{genesis_path, NodeConfig};
use mycel_app::{Genesis, TxResult};
use mycel_upgrade::Plan;
use node::{decode_hex, queue_tx, Node};
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let home = cli.home.as_path();
    match cli.command {
        Command::Init { chain_id } => init(home, &chain_id),
        Command::Start {
            unsafe_skip_upgrades,
            halt_height,
        } => {
            let mut config = NodeConfig::load(home)?;
            config.merge_skip_heights(&unsafe_skip_upgrades);
            if let Some(height) = halt_height {
                config.halt_height = height;
            }
            tracing::info!(version = env!("CARGO_PKG_VERSION"), "Mycel node starting...");
            let mut node = Node::open(home, config).context("failed to open node")?;
            node.run().await.context("node stopped")?;
            tracing::info!("Mycel node stopped");
            Ok(())
        }
        Command::Upgrade { action } => upgrade(home, action),
        Command::CheckTx { hex } => {
            let node = Node::open(home, NodeConfig::load(home)?)?;
            let result = node.app().check_tx(&decode_hex(&hex)?)?;
            print_result(&result);
            Ok(())
        }
        Command::SimulateTx { hex } => {
            let node = Node::open(home, NodeConfig::load(home)?)?;
            let result = node.app().simulate_tx(&decode_hex(&hex)?)?;
            print_result(&result);
            Ok(())
        }
        Command::SubmitTx { hex } => {
            let path = queue_tx(home, &hex)?;
            println!("queued {}", path.display());
            Ok(())
        }
    }
}

/// Write default config and an account-less genesis
fn init(home: &Path, chain_id: &str) -> Result<()> {
    let config = NodeConfig {
        chain_id: chain_id.to_string(),
        ..Default::default()
    };
    let genesis = genesis_path(home);
    if genesis.exists() {
        bail!("{} already exists", genesis.display());
    }
    let app_toml = config.save(home)?;
    std::fs::write(&genesis, serde_json::to_string_pretty(&Genesis::new(chain_id))?)?;
    println!("wrote {}", app_toml.display());
    println!("wrote {}", genesis.display());
    Ok(())
}

fn upgrade(home: &Path, action: UpgradeCommand) -> Result<()> {
    let node = Node::open(home, NodeConfig::load(home)?)?;
    let app = node.app();
    match action {
        UpgradeCommand::Plan => match app.pending_upgrade()? {
            Some(plan) => println!("{}", serde_json::to_string_pretty(&plan)?),
            None => println!("no upgrade scheduled"),
        },
        UpgradeCommand::Schedule { name, height, info } => {
            let plan = Plan::new(name, height).with_info(info);
            app.schedule_upgrade(&plan)?;
            println!("scheduled {} at height {}", plan.name, plan.height);
        }
        UpgradeCommand::Cancel => match app.cancel_upgrade()? {
            Some(plan) => println!("cancelled {} at height {}", plan.name, plan.height),
            None => println!("no upgrade scheduled"),
        },
        UpgradeCommand::Applied { name: Some(name) } => {
            match app.applied_upgrades()?.into_iter().find(|(n, _)| *n == name) {
                Some((_, height)) => println!("{}", height),
                None => bail!("upgrade {} has not been applied", name),
            }
        }
        UpgradeCommand::Applied { name: None } => {
            for (name, height) in app.applied_upgrades()? {
                println!("{}\t{}", height, name);
            }
        }
    }
    Ok(())
}

fn print_result(result: &TxResult) {
    println!("code: {}", result.code);
    if !result.is_ok() {
        println!("codespace: {}", result.codespace);
        println!("log: {}", result.log);
    }
    println!("gas_wanted: {}", result.gas_wanted);
    println!("gas_used: {}", result.gas_used);
    println!("priority: {}", result.priority);
}
