pub mod binance_p2p_client;

pub use binance_p2p_client::BinanceP2pClient;

use async_trait::async_trait;
use crate::exchanges::types::{Listing, ListingQuery};

/// Source of P2P listings.
///
/// Implementations never fail: transport and decoding problems are logged and
/// reported as an empty listing set.
#[async_trait]
pub trait ListingFetcher: Send + Sync {
    async fn fetch_listings(&self, query: &ListingQuery) -> Vec<Listing>;
}
