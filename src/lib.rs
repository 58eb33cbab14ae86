//! p2pwatch - P2P USDT market monitor
//! Remittance rates and arbitrage estimates between two fiat P2P markets,
//! persisted as daily CSV files and delivered over Telegram.

pub mod app;
pub mod application;
pub mod config;
pub mod domain;
pub mod exchanges;
pub mod infrastructure;
pub mod math;
pub mod report;
pub mod shared;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use application::{BotService, MarketService};
pub use domain::market::MarketAnalyzer;
pub use domain::rates::RateCalculator;
pub use domain::snapshot::Snapshot;
pub use report::ReportFormatter;
