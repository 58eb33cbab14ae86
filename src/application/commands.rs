//! CLI commands
use clap::{Parser, Subcommand};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "p2pwatch")]
#[command(version, about = "P2P USDT market monitor: remittance rates, arbitrage and Telegram reports")]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = "Config.toml")]
    pub config: String,

    /// Source fiat code (overrides config)
    #[arg(long, global = true)]
    pub source: Option<String>,

    /// Target fiat code (overrides config)
    #[arg(long, global = true)]
    pub target: Option<String>,

    /// Directory for CSV snapshots (overrides config)
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the Telegram bot together with the fixed-hour scheduler
    Run,

    /// Collect and persist one snapshot, print the full report
    Snapshot {
        /// Print the snapshot as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Collect and print one report without persisting
    Report {
        #[command(subcommand)]
        kind: ReportKind,
    },

    /// Collect, persist and send one full report to CHAT_ID
    Send,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ReportKind {
    /// Remittance rates
    Tasa,
    /// Arbitrage routes
    Arbitraje,
    /// Full report
    All,
    /// Single-currency summary
    Fiat { code: String },
}

impl Cli {
    /// Apply command-line overrides on top of the loaded config
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(source) = &self.source {
            cfg.market.source.code = source.to_uppercase();
        }
        if let Some(target) = &self.target {
            cfg.market.target.code = target.to_uppercase();
        }
        if let Some(data_dir) = &self.data_dir {
            cfg.storage.data_dir = data_dir.clone();
        }
    }

    /// Whether the selected command talks to Telegram
    pub fn needs_secrets(&self) -> bool {
        matches!(self.command, Commands::Run | Commands::Send)
    }
}
