use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use p2pwatch::app;
use p2pwatch::application::Cli;
use p2pwatch::config::{Config, Secrets};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    if !Path::new(&cli.config).exists() {
        warn!("Config file {} not found, using defaults", cli.config);
    }
    let mut cfg = Config::load_or_default(&cli.config)?;
    cli.apply_overrides(&mut cfg);
    cfg.validate()?;
    if cli.needs_secrets() {
        // missing chat credentials fail before any fetch
        Secrets::from_env()?;
    }

    app::run(cfg, cli.command).await
}
