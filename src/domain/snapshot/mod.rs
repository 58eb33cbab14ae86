//! Snapshot domain - one complete analysis run over both fiat markets

mod snapshot_assembler;

pub use snapshot_assembler::{FetchedListings, SnapshotAssembler};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::market::MarketAnalysis;
use crate::domain::rates::RateSheet;
use crate::exchanges::types::Listing;
use crate::math;
use crate::shared::types::MarketPair;
use crate::shared::utils::round_to;

/// Analyses of one asset/fiat market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSnapshot {
    pub pair: MarketPair,
    /// Full fetched sample
    pub buy: MarketAnalysis,
    pub sell: MarketAnalysis,
    /// Top-of-book window used for remittance rates
    pub remittance_buy: MarketAnalysis,
    pub remittance_sell: MarketAnalysis,
    /// Buy and sell prices pooled together
    pub combined: MarketAnalysis,
    pub buy_listings: Vec<Listing>,
    pub sell_listings: Vec<Listing>,
    /// Precision shared by every published price of this market
    pub price_decimals: u32,
}

impl PairSnapshot {
    pub fn fiat(&self) -> &str {
        &self.pair.fiat
    }

    pub fn rows_fetched(&self) -> usize {
        self.buy_listings.len() + self.sell_listings.len()
    }

    /// Mid of the buy and sell simple means
    pub fn avg_price_simple(&self) -> Option<f64> {
        mid(self.buy.simple_mean(), self.sell.simple_mean()).map(|m| round_to(m, self.price_decimals))
    }

    pub fn avg_price_weighted(&self) -> Option<f64> {
        mid(self.buy.weighted_mean(), self.sell.weighted_mean()).map(|m| round_to(m, self.price_decimals))
    }

    /// `(avg_sell - avg_buy) / avg_buy * 100`
    pub fn spread_pct(&self) -> Option<f64> {
        match (self.buy.simple_mean(), self.sell.simple_mean()) {
            (Some(buy), Some(sell)) => math::pct_change(buy, sell).map(|p| round_to(p, 2)),
            _ => None,
        }
    }

    /// Sum of max transaction capacities over both sides
    pub fn exposed_volume(&self) -> f64 {
        let total = self
            .buy_listings
            .iter()
            .chain(self.sell_listings.iter())
            .fold(0.0, |acc, l| acc + l.capacity());
        round_to(total, self.price_decimals)
    }

    /// Best sell-side listing, rounded the way it is published
    pub fn top_of_book(&self) -> Option<TopOfBook> {
        self.sell_listings.first().map(|l| TopOfBook {
            price: round_to(l.price, self.price_decimals),
            capacity: round_to(l.capacity(), self.price_decimals),
            nick: l.advertiser_nick.clone(),
        })
    }

    /// First `n` sell prices, rounded
    pub fn top_prices(&self, n: usize) -> Vec<f64> {
        self.sell_listings
            .iter()
            .take(n)
            .map(|l| round_to(l.price, self.price_decimals))
            .collect()
    }
}

/// Published view of the best listing of a market
#[derive(Debug, Clone, PartialEq)]
pub struct TopOfBook {
    pub price: f64,
    pub capacity: f64,
    pub nick: String,
}

fn mid(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some((a + b) / 2.0),
        _ => None,
    }
}

/// One full analysis run. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub asset: String,
    pub source: PairSnapshot,
    pub target: PairSnapshot,
    pub rates: RateSheet,
    pub total_exposed_liquidity: f64,
}

impl Snapshot {
    /// Look up a market by fiat code (case-insensitive)
    pub fn pair(&self, fiat: &str) -> Option<&PairSnapshot> {
        [&self.source, &self.target]
            .into_iter()
            .find(|p| p.pair.fiat.eq_ignore_ascii_case(fiat))
    }

    pub fn pairs(&self) -> [&PairSnapshot; 2] {
        [&self.source, &self.target]
    }
}
