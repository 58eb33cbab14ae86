//! Common types used across the application

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade direction, relative to acquiring the asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asset/fiat market pair, e.g. `USDT-COP`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketPair {
    pub asset: String,
    pub fiat: String,
}

impl MarketPair {
    pub fn new(asset: impl Into<String>, fiat: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            fiat: fiat.into(),
        }
    }
}

impl fmt::Display for MarketPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.asset, self.fiat)
    }
}
