// src/report.rs
use crate::config::{Config, ReferenceMultiplier};
use crate::domain::market::MarketAnalysis;
use crate::domain::rates::{ArbitrageRoute, RateEstimate};
use crate::domain::snapshot::{PairSnapshot, Snapshot};
use crate::shared::utils::format_opt;

/// Rendered in place of any number that could not be computed
pub const NOT_AVAILABLE: &str = "N/D";
/// Rendered in place of a slice with no usable listings
pub const INSUFFICIENT_DATA: &str = "datos insuficientes";

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub reference_multipliers: Vec<ReferenceMultiplier>,
    /// Combined coefficient of variation (percent) above which a market is flagged
    pub volatility_threshold_pct: f64,
    pub price_decimals: usize,
    pub rate_decimals: usize,
}

impl ReportOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            reference_multipliers: cfg.rates.reference_multipliers.clone(),
            volatility_threshold_pct: cfg.analysis.volatility_threshold_pct,
            price_decimals: cfg.analysis.price_decimals as usize,
            rate_decimals: cfg.analysis.rate_decimals as usize,
        }
    }
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Renders snapshots as chat-ready text. Never fetches, never stores.
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter {
    options: ReportOptions,
}

impl ReportFormatter {
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    fn price(&self, value: Option<f64>) -> String {
        format_opt(value, self.options.price_decimals, NOT_AVAILABLE)
    }

    fn pct(value: Option<f64>) -> String {
        match value {
            Some(v) if v.is_finite() => format!("{:+.2}%", v),
            _ => NOT_AVAILABLE.to_string(),
        }
    }

    fn side_line(&self, label: &str, analysis: &MarketAnalysis) -> String {
        match analysis.stats() {
            Some(stats) => format!(
                "{}: {} (pond. {}) · {} anuncios · rango {}-{} · outliers {}",
                label,
                self.price(Some(stats.simple_mean)),
                self.price(Some(stats.weighted_mean)),
                stats.sample_count,
                self.price(Some(stats.min)),
                self.price(Some(stats.max)),
                stats.outlier_count,
            ),
            None => format!("{}: {}", label, INSUFFICIENT_DATA),
        }
    }

    fn volatility_line(&self, pair: &PairSnapshot) -> String {
        match pair.combined.stats() {
            Some(stats) => {
                let cv = stats.coefficient_of_variation;
                let flag = if cv > self.options.volatility_threshold_pct {
                    " ⚠️ alta volatilidad"
                } else {
                    ""
                };
                format!("Volatilidad (CV): {:.2}%{}", cv, flag)
            }
            None => format!("Volatilidad (CV): {}", INSUFFICIENT_DATA),
        }
    }

    fn pair_block(&self, snapshot: &Snapshot, pair: &PairSnapshot) -> String {
        let mut lines = vec![
            format!("📊 {} · {}", pair.pair, snapshot.timestamp.format("%Y-%m-%d %H:%M UTC")),
            self.side_line("Compra", &pair.buy),
            self.side_line("Venta", &pair.sell),
            format!("Spread: {}", Self::pct(pair.spread_pct())),
            self.volatility_line(pair),
            format!("Liquidez expuesta: {}", self.price(Some(pair.exposed_volume()))),
        ];
        match pair.top_of_book() {
            Some(top) => lines.push(format!(
                "Mejor anuncio: {} ({}, máx. {})",
                self.price(Some(top.price)),
                top.nick,
                self.price(Some(top.capacity)),
            )),
            None => lines.push(format!("Mejor anuncio: {}", NOT_AVAILABLE)),
        }
        lines.join("\n")
    }

    /// Single-currency summary, used by `/COP`, `/VES` and friends
    pub fn compact_summary(&self, snapshot: &Snapshot, fiat: &str) -> String {
        match snapshot.pair(fiat) {
            Some(pair) => self.pair_block(snapshot, pair),
            None => format!("Moneda {} no monitoreada", fiat.to_uppercase()),
        }
    }

    fn rate_block(&self, title_from: &str, title_to: &str, buy: Option<f64>, sell: Option<f64>, rates: &[RateEstimate]) -> String {
        let mut lines = vec![
            format!("💱 Tasa {} → {}", title_from, title_to),
            format!(
                "Compra {}: {} · Venta {}: {}",
                title_from,
                self.price(buy),
                title_to,
                self.price(sell)
            ),
        ];
        for rate in rates {
            lines.push(format!(
                "+{}%: {}",
                rate.margin_pct,
                format_opt(rate.value, self.options.rate_decimals, NOT_AVAILABLE)
            ));
        }
        lines.join("\n")
    }

    /// Remittance rates in both directions plus the reference prices
    pub fn rate_summary(&self, snapshot: &Snapshot) -> String {
        let source = &snapshot.source;
        let target = &snapshot.target;
        let mut blocks = vec![
            self.rate_block(
                source.fiat(),
                target.fiat(),
                source.remittance_buy.simple_mean(),
                target.remittance_sell.simple_mean(),
                &snapshot.rates.forward,
            ),
            self.rate_block(
                target.fiat(),
                source.fiat(),
                target.remittance_buy.simple_mean(),
                source.remittance_sell.simple_mean(),
                &snapshot.rates.reverse,
            ),
        ];

        let sell_avg = target.sell.simple_mean();
        let mut references = vec![format!(
            "📌 Referencia {} (venta {})",
            target.fiat(),
            self.price(sell_avg)
        )];
        for reference in &self.options.reference_multipliers {
            references.push(format!(
                "{}: {}",
                reference.label,
                self.price(sell_avg.map(|avg| avg * reference.factor))
            ));
        }
        blocks.push(references.join("\n"));
        blocks.join("\n\n")
    }

    fn route_line(route: &ArbitrageRoute, asset: &str) -> String {
        let mark = match route.pct {
            Some(_) if route.is_profitable() => " ✅",
            Some(_) => " ❌",
            None => "",
        };
        format!("{}: {}{}", route.label(asset), Self::pct(route.pct), mark)
    }

    /// Both arbitrage routes and the recommendation
    pub fn arbitrage_summary(&self, snapshot: &Snapshot) -> String {
        let arbitrage = &snapshot.rates.arbitrage;
        let recommendation = match arbitrage.recommended_route() {
            Some(route) => format!(
                "Recomendación: {} ({})",
                route.label(&snapshot.asset),
                Self::pct(route.pct)
            ),
            None => "Recomendación: ninguna ruta rentable".to_string(),
        };
        [
            format!("🔁 Arbitraje {}", snapshot.asset),
            Self::route_line(&arbitrage.source_to_target, &snapshot.asset),
            Self::route_line(&arbitrage.target_to_source, &snapshot.asset),
            recommendation,
        ]
        .join("\n")
    }

    /// Everything above, used for `/ALL`, `/ACT` and scheduled sends
    pub fn full_report(&self, snapshot: &Snapshot) -> String {
        [
            format!(
                "📈 Reporte P2P {} · {}",
                snapshot.asset,
                snapshot.timestamp.format("%Y-%m-%d %H:%M UTC")
            ),
            self.pair_block(snapshot, &snapshot.source),
            self.pair_block(snapshot, &snapshot.target),
            self.rate_summary(snapshot),
            self.arbitrage_summary(snapshot),
            format!(
                "💧 Liquidez total expuesta: {}",
                self.price(Some(snapshot.total_exposed_liquidity))
            ),
        ]
        .join("\n\n")
    }

    pub fn to_json(snapshot: &Snapshot) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(snapshot)
    }
}
