//! Rates domain - remittance rates and arbitrage routes across two fiat markets

mod rate_calculator;

pub use rate_calculator::{CurrencyView, RateCalculator};

use serde::{Deserialize, Serialize};

/// Margin-adjusted conversion rate from `base_currency` to `quote_currency`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEstimate {
    pub base_currency: String,
    pub quote_currency: String,
    pub margin_pct: f64,
    /// `None` when an input average was unavailable
    pub value: Option<f64>,
}

impl RateEstimate {
    pub fn id(&self) -> String {
        format!("{}→{} +{}%", self.base_currency, self.quote_currency, self.margin_pct)
    }
}

/// Round trip `from` fiat -> asset -> `to` fiat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageRoute {
    pub from: String,
    pub to: String,
    pub pct: Option<f64>,
}

impl ArbitrageRoute {
    pub fn is_profitable(&self) -> bool {
        self.pct.map(|p| p > 0.0).unwrap_or(false)
    }

    pub fn label(&self, asset: &str) -> String {
        format!("{} → {} → {}", self.from, asset, self.to)
    }
}

/// Which of the two routes is recommended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteChoice {
    SourceToTarget,
    TargetToSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageEstimate {
    pub source_to_target: ArbitrageRoute,
    pub target_to_source: ArbitrageRoute,
    pub recommended: Option<RouteChoice>,
}

impl ArbitrageEstimate {
    pub fn recommended_route(&self) -> Option<&ArbitrageRoute> {
        self.recommended.map(|choice| match choice {
            RouteChoice::SourceToTarget => &self.source_to_target,
            RouteChoice::TargetToSource => &self.target_to_source,
        })
    }
}

/// Everything the rate calculator produces for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSheet {
    /// Source→target rates, one per margin
    pub forward: Vec<RateEstimate>,
    /// Target→source rates, one per margin
    pub reverse: Vec<RateEstimate>,
    pub arbitrage: ArbitrageEstimate,
}

impl RateSheet {
    pub fn all_rates(&self) -> impl Iterator<Item = &RateEstimate> {
        self.forward.iter().chain(self.reverse.iter())
    }
}
