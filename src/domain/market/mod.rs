//! Market domain - statistics over a slice of P2P listings

mod market_analyzer;

pub use market_analyzer::MarketAnalyzer;

use serde::{Deserialize, Serialize};

/// Analyzer settings
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Symmetric tolerance around the simple mean, as a fraction (0.025 = ±2.5%)
    pub outlier_band: f64,
    pub use_volume_weighting: bool,
    /// Decimals for published prices and statistics
    pub price_decimals: u32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            outlier_band: 0.025,
            use_volume_weighting: true,
            price_decimals: 2,
        }
    }
}

/// Descriptive statistics for one (fiat, direction) slice.
/// All fields are already rounded to their published precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    pub simple_mean: f64,
    pub weighted_mean: f64,
    pub std_dev: f64,
    /// Percent
    pub coefficient_of_variation: f64,
    pub outlier_count: usize,
    pub min: f64,
    pub max: f64,
    pub sample_count: usize,
    pub total_capacity: f64,
}

/// Result of analyzing a slice: statistics, or an explicit marker when no
/// listing carried a usable price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarketAnalysis {
    Stats(MarketStats),
    InsufficientData,
}

impl MarketAnalysis {
    pub fn stats(&self) -> Option<&MarketStats> {
        match self {
            MarketAnalysis::Stats(stats) => Some(stats),
            MarketAnalysis::InsufficientData => None,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        matches!(self, MarketAnalysis::InsufficientData)
    }

    pub fn simple_mean(&self) -> Option<f64> {
        self.stats().map(|s| s.simple_mean)
    }

    pub fn weighted_mean(&self) -> Option<f64> {
        self.stats().map(|s| s.weighted_mean)
    }

    pub fn sample_count(&self) -> usize {
        self.stats().map(|s| s.sample_count).unwrap_or(0)
    }
}
