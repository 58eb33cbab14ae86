//! Shared fixtures for unit tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::exchanges::api_clients::ListingFetcher;
use crate::exchanges::types::{Listing, ListingQuery};
use crate::infrastructure::telegram::Notifier;
use crate::shared::errors::NotifyError;
use crate::shared::types::Direction;

pub fn listing(direction: Direction, fiat: &str, price: f64, capacity: f64) -> Listing {
    Listing {
        adv_no: format!("{}-{}-{}", direction, fiat, price),
        direction,
        fiat: fiat.to_string(),
        price,
        min_amount: 0.0,
        max_amount: capacity,
        advertiser_id: "u-1".to_string(),
        advertiser_nick: "trader".to_string(),
        month_order_count: 100,
        month_finish_rate: "0.99".to_string(),
        payment_methods: vec!["Nequi".to_string(), "Pago Movil".to_string()],
        raw: format!("{{\"price\":\"{}\"}}", price),
    }
}

/// Serves canned listings per (direction, fiat) and counts calls
#[derive(Default)]
pub struct StubFetcher {
    listings: HashMap<(Direction, String), Vec<Listing>>,
    pub calls: AtomicUsize,
}

impl StubFetcher {
    pub fn with(mut self, direction: Direction, fiat: &str, prices: &[(f64, f64)]) -> Self {
        let listings = prices
            .iter()
            .map(|(p, c)| listing(direction, fiat, *p, *c))
            .collect();
        self.listings.insert((direction, fiat.to_string()), listings);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingFetcher for StubFetcher {
    async fn fetch_listings(&self, query: &ListingQuery) -> Vec<Listing> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.listings
            .get(&(query.direction, query.fiat.clone()))
            .map(|all| all.iter().take(query.rows as usize).cloned().collect())
            .unwrap_or_default()
    }
}

/// Records every delivered message
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((chat_id.to_string(), text.to_string()));
        }
        Ok(())
    }
}
