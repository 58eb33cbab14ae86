use serde::{Deserialize, Serialize};

use crate::shared::types::{Direction, MarketPair};

/// One advertised P2P offer, validated at the fetch boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub adv_no: String,
    pub direction: Direction,
    pub fiat: String,
    pub price: f64,
    pub min_amount: f64,
    /// Dynamic max single transaction amount; the listing's capacity
    pub max_amount: f64,
    pub advertiser_id: String,
    pub advertiser_nick: String,
    pub month_order_count: u64,
    pub month_finish_rate: String,
    pub payment_methods: Vec<String>,
    /// Original JSON object, kept for audit rows
    pub raw: String,
}

impl Listing {
    pub fn capacity(&self) -> f64 {
        self.max_amount
    }
}

/// Parameters of a single listing search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub asset: String,
    pub direction: Direction,
    pub fiat: String,
    pub page: u32,
    pub rows: u32,
    pub merchant_only: bool,
}

impl ListingQuery {
    pub fn new(asset: impl Into<String>, direction: Direction, fiat: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            direction,
            fiat: fiat.into(),
            page: 1,
            rows: 10,
            merchant_only: false,
        }
    }

    pub fn with_page(mut self, page: u32, rows: u32) -> Self {
        self.page = page;
        self.rows = rows;
        self
    }

    pub fn pair(&self) -> MarketPair {
        MarketPair::new(self.asset.clone(), self.fiat.clone())
    }
}
