pub mod api_clients;
pub mod types;

pub use api_clients::{BinanceP2pClient, ListingFetcher};
pub use types::{Listing, ListingQuery};
