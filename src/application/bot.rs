//! Chat command handling on top of the market service

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::application::scheduler::{spawn_periodic, AutoSender, Transition};
use crate::application::services::MarketService;
use crate::config::{ScheduleCfg, Secrets};
use crate::domain::snapshot::Snapshot;
use crate::infrastructure::telegram::{IncomingMessage, Notifier, TelegramClient};
use crate::report::ReportFormatter;
use crate::shared::errors::{CommandError, NotifyError};

/// Back-off after a failed `getUpdates`
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    /// `/TASA`
    Rates,
    /// `/<fiat>` for one of the monitored currencies
    Market(String),
    /// `/ARBITRAJE`
    Arbitrage,
    /// `/ALL`
    All,
    /// `/ACT`
    Act,
    AutoOn(Option<String>),
    AutoOff,
    Unknown(String),
}

impl BotCommand {
    /// Parse a chat message. Returns `None` for plain text.
    pub fn parse(text: &str, fiats: &[&str]) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let head = parts.next()?.strip_prefix('/')?;
        let name = head.split('@').next().unwrap_or(head).to_uppercase();
        let arg = parts.next().map(str::to_string);

        let command = match name.as_str() {
            "START" => Self::Start,
            "HELP" => Self::Help,
            "TASA" => Self::Rates,
            "ARBITRAJE" => Self::Arbitrage,
            "ALL" => Self::All,
            "ACT" => Self::Act,
            "AUTO_ON" => Self::AutoOn(arg),
            "AUTO_OFF" => Self::AutoOff,
            other => match fiats.iter().find(|f| f.eq_ignore_ascii_case(other)) {
                Some(fiat) => Self::Market(fiat.to_uppercase()),
                None => Self::Unknown(other.to_string()),
            },
        };
        Some(command)
    }

    fn is_restricted(&self) -> bool {
        matches!(self, Self::Act | Self::AutoOn(_) | Self::AutoOff)
    }
}

/// Interval for `/auto_on`: whole seconds, at least `min`
pub fn parse_interval(arg: Option<&str>, default: Duration, min: Duration) -> Result<Duration, CommandError> {
    let Some(raw) = arg else {
        return Ok(default);
    };
    let secs: u64 = raw.parse().map_err(|_| {
        CommandError::InvalidArgument(format!("'{}' no es un número entero de segundos", raw))
    })?;
    let interval = Duration::from_secs(secs);
    if interval < min {
        return Err(CommandError::InvalidArgument(format!(
            "el intervalo mínimo es {} segundos",
            min.as_secs()
        )));
    }
    Ok(interval)
}

#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Destination of `/ACT`, auto-send and scheduled reports
    pub chat_id: String,
    /// When set, only this user may run `/ACT`, `/auto_on` and `/auto_off`
    pub owner_id: Option<String>,
    pub default_auto_interval: Duration,
    pub min_auto_interval: Duration,
}

impl BotSettings {
    pub fn new(secrets: &Secrets, schedule: &ScheduleCfg) -> Self {
        Self {
            chat_id: secrets.chat_id.clone(),
            owner_id: secrets.owner_id.clone(),
            default_auto_interval: Duration::from_secs(schedule.default_auto_interval_seconds),
            min_auto_interval: Duration::from_secs(schedule.min_auto_interval_seconds),
        }
    }
}

pub struct BotService {
    market: Arc<MarketService>,
    formatter: ReportFormatter,
    notifier: Arc<dyn Notifier>,
    settings: BotSettings,
    auto: AutoSender,
}

impl BotService {
    pub fn new(
        market: Arc<MarketService>,
        formatter: ReportFormatter,
        notifier: Arc<dyn Notifier>,
        settings: BotSettings,
    ) -> Self {
        Self {
            market,
            formatter,
            notifier,
            settings,
            auto: AutoSender::new(),
        }
    }

    fn help_text(&self) -> String {
        let market = self.market.market();
        [
            format!(
                "🤖 Monitor P2P {} ({} / {})",
                market.asset, market.source.code, market.target.code
            ),
            "/TASA - tasas de remesa".to_string(),
            format!("/{} - resumen {}", market.source.code, market.source.code),
            format!("/{} - resumen {}", market.target.code, market.target.code),
            "/ARBITRAJE - rutas de arbitraje".to_string(),
            "/ALL - reporte completo".to_string(),
            "/ACT - enviar reporte al canal".to_string(),
            "/auto_on [segundos] - activar envío automático".to_string(),
            "/auto_off - desactivar envío automático".to_string(),
        ]
        .join("\n")
    }

    /// Collect, persist and deliver the full report to the configured chat
    pub async fn send_full_report(&self) -> Result<Snapshot, NotifyError> {
        let snapshot = self.market.collect(true).await;
        let text = self.formatter.full_report(&snapshot);
        self.notifier.send_message(&self.settings.chat_id, &text).await?;
        Ok(snapshot)
    }

    /// Build the single reply for a message. `None` for non-command text.
    pub async fn handle(self: &Arc<Self>, message: &IncomingMessage) -> Option<String> {
        let market = self.market.market();
        let fiats = [market.source.code.as_str(), market.target.code.as_str()];
        let command = BotCommand::parse(&message.text, &fiats)?;
        info!("💬 {:?} from chat {}", command, message.chat_id);

        if command.is_restricted() && !self.is_owner(message) {
            warn!("Rejected {:?} from user {:?}", command, message.user_id);
            return Some(format!("⛔ {}", CommandError::Unauthorized));
        }

        let reply = match command {
            BotCommand::Start | BotCommand::Help | BotCommand::Unknown(_) => self.help_text(),
            BotCommand::Rates => self.formatter.rate_summary(&self.market.collect(false).await),
            BotCommand::Market(fiat) => self
                .formatter
                .compact_summary(&self.market.collect(false).await, &fiat),
            BotCommand::Arbitrage => self.formatter.arbitrage_summary(&self.market.collect(false).await),
            BotCommand::All => self.formatter.full_report(&self.market.collect(false).await),
            BotCommand::Act => self.act(message).await,
            BotCommand::AutoOn(arg) => self.auto_on(arg.as_deref()).await,
            BotCommand::AutoOff => match self.auto.disable().await {
                Transition::Disabled => "⏹️ Envío automático desactivado".to_string(),
                _ => "ℹ️ El envío automático no estaba activo".to_string(),
            },
        };
        Some(reply)
    }

    fn is_owner(&self, message: &IncomingMessage) -> bool {
        match &self.settings.owner_id {
            Some(owner) => message.user_id.as_deref() == Some(owner.as_str()),
            None => true,
        }
    }

    async fn act(&self, message: &IncomingMessage) -> String {
        // Asked from the destination chat itself: the report is the reply
        if message.chat_id == self.settings.chat_id {
            return self.formatter.full_report(&self.market.collect(true).await);
        }
        match self.send_full_report().await {
            Ok(_) => "✅ Reporte enviado".to_string(),
            Err(e) => {
                error!("❌ /ACT delivery failed: {}", e);
                format!("❌ No se pudo enviar el reporte: {}", e)
            }
        }
    }

    async fn auto_on(self: &Arc<Self>, arg: Option<&str>) -> String {
        let interval = match parse_interval(
            arg,
            self.settings.default_auto_interval,
            self.settings.min_auto_interval,
        ) {
            Ok(interval) => interval,
            Err(e) => return format!("⚠️ {}", e),
        };

        let bot = Arc::clone(self);
        let transition = self
            .auto
            .enable(interval, move |interval| {
                spawn_periodic(interval, move || {
                    let bot = bot.clone();
                    async move {
                        if let Err(e) = bot.send_full_report().await {
                            error!("❌ Auto-send failed: {}", e);
                        }
                    }
                })
            })
            .await;

        match transition {
            Transition::AlreadyOn(current) => format!(
                "ℹ️ El envío automático ya está activo (cada {} s)",
                current.as_secs()
            ),
            _ => format!("⏱️ Envío automático activado cada {} s", interval.as_secs()),
        }
    }

    /// Handle one message and deliver its reply to the originating chat
    pub async fn reply(self: &Arc<Self>, message: &IncomingMessage) {
        if let Some(text) = self.handle(message).await {
            if let Err(e) = self.notifier.send_message(&message.chat_id, &text).await {
                error!("❌ Failed to reply to chat {}: {}", message.chat_id, e);
            }
        }
    }

    /// Long-poll for commands forever
    pub async fn run_polling(self: Arc<Self>, client: Arc<TelegramClient>) {
        info!("🤖 Bot polling started");
        let mut offset = 0;
        loop {
            match client.get_updates(offset).await {
                Ok(batch) => {
                    offset = batch.next_offset;
                    for message in &batch.messages {
                        self.reply(message).await;
                    }
                }
                Err(e) => {
                    warn!("getUpdates failed: {}", e);
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                }
            }
        }
    }
}
