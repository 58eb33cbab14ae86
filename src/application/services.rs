//! Application services and use cases

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::{Config, FiatCfg, MarketCfg};
use crate::domain::market::{AnalyzerConfig, MarketAnalyzer};
use crate::domain::rates::RateCalculator;
use crate::domain::snapshot::{FetchedListings, Snapshot, SnapshotAssembler};
use crate::exchanges::api_clients::ListingFetcher;
use crate::exchanges::types::{Listing, ListingQuery};
use crate::infrastructure::storage::SnapshotStore;
use crate::shared::types::Direction;

/// Fetch → analyze → (store) pipeline shared by the CLI, the bot and the scheduler
pub struct MarketService {
    fetcher: Arc<dyn ListingFetcher>,
    assembler: SnapshotAssembler,
    market: MarketCfg,
    store: Option<Arc<dyn SnapshotStore>>,
}

impl MarketService {
    pub fn new(fetcher: Arc<dyn ListingFetcher>, assembler: SnapshotAssembler, market: MarketCfg) -> Self {
        Self {
            fetcher,
            assembler,
            market,
            store: None,
        }
    }

    pub fn from_config(cfg: &Config, fetcher: Arc<dyn ListingFetcher>) -> Self {
        let analyzer = MarketAnalyzer::new(AnalyzerConfig {
            outlier_band: cfg.analysis.outlier_band_fraction,
            use_volume_weighting: cfg.analysis.use_volume_weighting,
            price_decimals: cfg.analysis.price_decimals,
        });
        let calculator = RateCalculator::new(cfg.rates.margins_pct.clone(), cfg.analysis.rate_decimals);
        let assembler = SnapshotAssembler::new(analyzer, calculator, cfg.analysis.remittance_sample_size);
        Self::new(fetcher, assembler, cfg.market.clone())
    }

    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn market(&self) -> &MarketCfg {
        &self.market
    }

    fn query(&self, direction: Direction, fiat: &FiatCfg) -> ListingQuery {
        let mut query = ListingQuery::new(self.market.asset.clone(), direction, fiat.code.clone())
            .with_page(fiat.page, fiat.rows);
        query.merchant_only = self.market.merchant_only;
        query
    }

    /// Issue the four independent fetches concurrently
    pub async fn fetch_all(&self) -> FetchedListings {
        let queries = [
            self.query(Direction::Buy, &self.market.source),
            self.query(Direction::Sell, &self.market.source),
            self.query(Direction::Buy, &self.market.target),
            self.query(Direction::Sell, &self.market.target),
        ];

        let results: Vec<Vec<Listing>> =
            join_all(queries.iter().map(|q| self.fetcher.fetch_listings(q))).await;

        for (query, listings) in queries.iter().zip(results.iter()) {
            if listings.is_empty() {
                warn!("⚠️ No listings for {} {}", query.pair(), query.direction);
            } else {
                info!("📥 {} {} listings for {}", listings.len(), query.direction, query.pair());
            }
        }

        let mut results = results.into_iter();
        FetchedListings {
            source_buy: results.next().unwrap_or_default(),
            source_sell: results.next().unwrap_or_default(),
            target_buy: results.next().unwrap_or_default(),
            target_sell: results.next().unwrap_or_default(),
        }
    }

    /// Run one full collection. Storage failures are logged and never abort the run.
    pub async fn collect(&self, persist: bool) -> Snapshot {
        info!("📊 Collecting snapshot {}-{}/{}", self.market.asset, self.market.source.code, self.market.target.code);
        let fetched = self.fetch_all().await;
        let snapshot = self.assembler.assemble(
            &self.market.asset,
            &self.market.source.code,
            &self.market.target.code,
            fetched,
            Utc::now(),
        );

        if persist {
            match &self.store {
                Some(store) => match store.save_snapshot(&snapshot) {
                    Ok(()) => info!("✅ Snapshot {} persisted", snapshot.run_id),
                    Err(e) => error!("❌ Failed to persist snapshot {}: {}", snapshot.run_id, e),
                },
                None => warn!("No snapshot store configured, skipping persistence"),
            }
        }
        snapshot
    }
}
