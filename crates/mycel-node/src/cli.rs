//! CLI argument parsing for mycel-node

use clap::{Parser, Subcommand};
use mycel_primitives::BlockHeight;
use std::path::PathBuf;

/// Mycel chain node
#[derive(Parser, Debug, Clone)]
#[command(name = "mycel")]
#[command(about = "Mycel chain node")]
#[command(version)]
pub struct Cli {
    /// Node home directory (config/, data/)
    #[arg(long, global = true, default_value = "./.mycel")]
    pub home: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Write a default app.toml and genesis.json under the home directory
    Init {
        /// Chain ID
        #[arg(long, default_value = "mycel-1")]
        chain_id: String,
    },

    /// Run the node
    Start {
        /// Heights whose upgrade plan is skipped (comma-separated)
        #[arg(long, value_delimiter = ',')]
        unsafe_skip_upgrades: Vec<BlockHeight>,

        /// Stop after committing this height
        #[arg(long)]
        halt_height: Option<BlockHeight>,
    },

    /// Inspect or change upgrade state (node must be stopped)
    Upgrade {
        #[command(subcommand)]
        action: UpgradeCommand,
    },

    /// Run mempool admission for a hex-encoded transaction
    CheckTx {
        /// Transaction bytes, hex
        #[arg(long)]
        hex: String,
    },

    /// Estimate gas for a hex-encoded transaction
    SimulateTx {
        /// Transaction bytes, hex
        #[arg(long)]
        hex: String,
    },

    /// Queue a hex-encoded transaction for the running node
    SubmitTx {
        /// Transaction bytes, hex
        #[arg(long)]
        hex: String,
    },
}

/// `upgrade` subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum UpgradeCommand {
    /// Show the pending plan
    Plan,
    /// Schedule an upgrade, replacing any pending plan
    Schedule {
        /// Upgrade name
        name: String,
        /// Height at which it runs
        height: BlockHeight,
        /// Free-form info (binary links)
        #[arg(long, default_value = "")]
        info: String,
    },
    /// Drop the pending plan
    Cancel,
    /// List applied upgrades, or the height a single one ran at
    Applied {
        /// Upgrade name
        name: Option<String>,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["mycel", "start"]);
        assert_eq!(cli.home, PathBuf::from("./.mycel"));
        assert_eq!(cli.log_level, "info");
        assert_eq!(
            cli.command,
            Command::Start {
                unsafe_skip_upgrades: vec![],
                halt_height: None
            }
        );
    }

    #[test]
    fn test_cli_start_flags() {
        let cli = Cli::parse_from([
            "mycel",
            "start",
            "--home", "/tmp/mycel",
            "--unsafe-skip-upgrades", "100,250",
            "--halt-height", "300",
            "--log-level", "debug",
        ]);
        assert_eq!(cli.home, PathBuf::from("/tmp/mycel"));
        assert_eq!(cli.log_level, "debug");
        assert_eq!(
            cli.command,
            Command::Start {
                unsafe_skip_upgrades: vec![100, 250],
                halt_height: Some(300)
            }
        );
    }

    #[test]
    fn test_cli_upgrade_schedule() {
        let cli = Cli::parse_from(["mycel", "upgrade", "schedule", "v2.0.0", "1200", "--info", "see release"]);
        assert_eq!(
            cli.command,
            Command::Upgrade {
                action: UpgradeCommand::Schedule {
                    name: "v2.0.0".to_string(),
                    height: 1200,
                    info: "see release".to_string()
                }
            }
        );

        let cli = Cli::parse_from(["mycel", "upgrade", "applied"]);
        assert_eq!(
            cli.command,
            Command::Upgrade {
                action: UpgradeCommand::Applied { name: None }
            }
        );
    }

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["mycel"]).is_err());
    }
}
