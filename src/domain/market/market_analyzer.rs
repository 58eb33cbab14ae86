//! Listing slice -> MarketStats reduction

use tracing::debug;

use crate::exchanges::types::Listing;
use crate::math;
use crate::shared::utils::round_to;
use super::{AnalyzerConfig, MarketAnalysis, MarketStats};

/// Coefficient of variation is a percentage and always published with 2 decimals
const CV_DECIMALS: u32 = 2;

/// Reduces listings into descriptive statistics. Pure: no fetching, no I/O.
#[derive(Debug, Clone, Default)]
pub struct MarketAnalyzer {
    config: AnalyzerConfig,
}

impl MarketAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn analyze(&self, listings: &[Listing]) -> MarketAnalysis {
        let pairs: Vec<(f64, f64)> = listings
            .iter()
            .filter_map(|l| {
                let usable = l.price.is_finite()
                    && l.price > 0.0
                    && l.capacity().is_finite()
                    && l.capacity() >= 0.0;
                if !usable {
                    debug!("Skipping listing {} with unusable price/capacity", l.adv_no);
                }
                usable.then_some((l.price, l.capacity()))
            })
            .collect();
        self.analyze_pairs(&pairs)
    }

    /// Analyze raw `(price, capacity)` pairs that already passed validation
    pub fn analyze_pairs(&self, pairs: &[(f64, f64)]) -> MarketAnalysis {
        let prices: Vec<f64> = pairs.iter().map(|(p, _)| *p).collect();
        let simple_mean = match math::mean(&prices) {
            Some(mean) => mean,
            None => return MarketAnalysis::InsufficientData,
        };

        let total_capacity = pairs.iter().fold(0.0, |acc, (_, c)| acc + c);
        let weighted_mean = if self.config.use_volume_weighting && total_capacity > 0.0 {
            math::weighted_mean(pairs).unwrap_or(simple_mean)
        } else {
            simple_mean
        };

        let std_dev = math::sample_std_dev(&prices);
        let cv = math::coefficient_of_variation(std_dev, simple_mean);
        let outlier_count = math::count_outside_band(&prices, simple_mean, self.config.outlier_band);
        let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let d = self.config.price_decimals;
        MarketAnalysis::Stats(MarketStats {
            simple_mean: round_to(simple_mean, d),
            weighted_mean: round_to(weighted_mean, d),
            std_dev: round_to(std_dev, d),
            coefficient_of_variation: round_to(cv, CV_DECIMALS),
            outlier_count,
            min: round_to(min, d),
            max: round_to(max, d),
            sample_count: prices.len(),
            total_capacity: round_to(total_capacity, d),
        })
    }
}
