// src/app.rs
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::application::{BotService, BotSettings, Commands, FixedHourSchedule, MarketService, ReportKind};
use crate::config::{Config, Secrets};
use crate::exchanges::BinanceP2pClient;
use crate::infrastructure::storage::CsvSnapshotStore;
use crate::infrastructure::telegram::TelegramClient;
use crate::report::{ReportFormatter, ReportOptions};
use crate::shared::errors::AppError;

/// Fetch, analysis and storage wiring shared by every command.
/// Fails when the data directory cannot be created.
pub fn build_market_service(cfg: &Config) -> Result<MarketService, AppError> {
    let fetcher = Arc::new(BinanceP2pClient::new(&cfg.http)?);
    let store = CsvSnapshotStore::new(&cfg.storage.data_dir, &cfg.market.exchange)
        .with_limits(cfg.analysis.top_prices, cfg.storage.raw_payload_limit);
    store.ensure_dirs()?;
    Ok(MarketService::from_config(cfg, fetcher).with_store(Arc::new(store)))
}

/// Telegram-facing services. Fails fast on missing secrets.
fn build_bot(
    cfg: &Config,
    market: Arc<MarketService>,
) -> Result<(Arc<BotService>, Arc<TelegramClient>), AppError> {
    let secrets = Secrets::from_env()?;
    let client = Arc::new(TelegramClient::new(&cfg.telegram, &secrets.bot_token)?);
    let bot = BotService::new(
        market,
        ReportFormatter::new(ReportOptions::from_config(cfg)),
        client.clone(),
        BotSettings::new(&secrets, &cfg.schedule),
    );
    Ok((Arc::new(bot), client))
}

pub async fn run(cfg: Config, command: Commands) -> Result<()> {
    info!(
        "Starting p2pwatch for {} {}/{}",
        cfg.market.asset, cfg.market.source.code, cfg.market.target.code
    );
    let market = Arc::new(build_market_service(&cfg)?);
    let formatter = ReportFormatter::new(ReportOptions::from_config(&cfg));

    match command {
        Commands::Run => run_service(&cfg, market).await,
        Commands::Send => {
            let (bot, _) = build_bot(&cfg, market)?;
            let snapshot = bot.send_full_report().await?;
            info!("✅ Report {} sent", snapshot.run_id);
            Ok(())
        }
        Commands::Snapshot { json } => {
            let snapshot = market.collect(true).await;
            if json {
                println!("{}", ReportFormatter::to_json(&snapshot)?);
            } else {
                println!("{}", formatter.full_report(&snapshot));
            }
            Ok(())
        }
        Commands::Report { kind } => {
            let snapshot = market.collect(false).await;
            let text = match kind {
                ReportKind::Tasa => formatter.rate_summary(&snapshot),
                ReportKind::Arbitraje => formatter.arbitrage_summary(&snapshot),
                ReportKind::All => formatter.full_report(&snapshot),
                ReportKind::Fiat { code } => formatter.compact_summary(&snapshot, &code),
            };
            println!("{}", text);
            Ok(())
        }
    }
}

/// Bot polling plus the fixed-hour schedule, until Ctrl-C
async fn run_service(cfg: &Config, market: Arc<MarketService>) -> Result<()> {
    let (bot, client) = build_bot(cfg, market)?;
    let schedule = FixedHourSchedule::new(cfg.schedule.scheduled_hours.clone(), cfg.schedule.utc_offset_hours)?;

    let scheduled_bot = bot.clone();
    let scheduler = schedule.run(
        Duration::from_secs(cfg.schedule.poll_interval_seconds),
        move || {
            let bot = scheduled_bot.clone();
            async move {
                if let Err(e) = bot.send_full_report().await {
                    error!("❌ Scheduled report failed: {}", e);
                }
            }
        },
    );

    tokio::select! {
        _ = bot.run_polling(client) => {}
        _ = scheduler => {}
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }
    Ok(())
}
