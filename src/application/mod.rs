//! Application layer - use cases and services

pub mod bot;
pub mod commands;
pub mod scheduler;
pub mod services;

pub use bot::{BotCommand, BotService, BotSettings};
pub use commands::{Cli, Commands, ReportKind};
pub use scheduler::{AutoSender, FixedHourSchedule};
pub use services::MarketService;
