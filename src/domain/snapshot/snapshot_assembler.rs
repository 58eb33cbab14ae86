use chrono::{DateTime, Utc};

use crate::domain::market::MarketAnalyzer;
use crate::domain::rates::{CurrencyView, RateCalculator};
use crate::exchanges::types::Listing;
use crate::shared::types::MarketPair;
use crate::shared::utils::{generate_id, round_to};
use super::{PairSnapshot, Snapshot};

/// Listings fetched for one run, in API order
#[derive(Debug, Clone, Default)]
pub struct FetchedListings {
    pub source_buy: Vec<Listing>,
    pub source_sell: Vec<Listing>,
    pub target_buy: Vec<Listing>,
    pub target_sell: Vec<Listing>,
}

/// Turns fetched listings into a [`Snapshot`]
#[derive(Debug, Clone)]
pub struct SnapshotAssembler {
    analyzer: MarketAnalyzer,
    calculator: RateCalculator,
    remittance_sample_size: usize,
}

impl SnapshotAssembler {
    pub fn new(analyzer: MarketAnalyzer, calculator: RateCalculator, remittance_sample_size: usize) -> Self {
        Self {
            analyzer,
            calculator,
            remittance_sample_size,
        }
    }

    pub fn assemble(
        &self,
        asset: &str,
        source_fiat: &str,
        target_fiat: &str,
        fetched: FetchedListings,
        timestamp: DateTime<Utc>,
    ) -> Snapshot {
        let source = self.pair_snapshot(asset, source_fiat, fetched.source_buy, fetched.source_sell);
        let target = self.pair_snapshot(asset, target_fiat, fetched.target_buy, fetched.target_sell);

        let rates = self.calculator.calculate(view(&source), view(&target));
        let total_exposed_liquidity = round_to(
            source.exposed_volume() + target.exposed_volume(),
            self.analyzer.config().price_decimals,
        );

        Snapshot {
            run_id: generate_id(),
            timestamp,
            asset: asset.to_string(),
            source,
            target,
            rates,
            total_exposed_liquidity,
        }
    }

    fn pair_snapshot(&self, asset: &str, fiat: &str, buy: Vec<Listing>, sell: Vec<Listing>) -> PairSnapshot {
        let window = self.remittance_sample_size;
        let combined: Vec<Listing> = buy.iter().chain(sell.iter()).cloned().collect();

        PairSnapshot {
            pair: MarketPair::new(asset, fiat),
            buy: self.analyzer.analyze(&buy),
            sell: self.analyzer.analyze(&sell),
            remittance_buy: self.analyzer.analyze(&buy[..buy.len().min(window)]),
            remittance_sell: self.analyzer.analyze(&sell[..sell.len().min(window)]),
            combined: self.analyzer.analyze(&combined),
            buy_listings: buy,
            sell_listings: sell,
            price_decimals: self.analyzer.config().price_decimals,
        }
    }
}

fn view(pair: &PairSnapshot) -> CurrencyView<'_> {
    CurrencyView {
        fiat: pair.fiat(),
        remittance_buy: &pair.remittance_buy,
        remittance_sell: &pair.remittance_sell,
        full_buy: &pair.buy,
        full_sell: &pair.sell,
    }
}
