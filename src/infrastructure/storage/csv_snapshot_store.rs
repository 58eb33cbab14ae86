use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

use crate::domain::snapshot::{PairSnapshot, Snapshot};
use crate::exchanges::types::Listing;
use crate::shared::errors::StorageError;
use crate::shared::utils::truncate_chars;
use super::SnapshotStore;

/// One row of `snapshots_YYYYMMDD.csv`: a market summary for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub timestamp_utc: String,
    pub run_id: String,
    pub pair: String,
    pub rows_fetched: usize,
    pub buy_count: usize,
    pub sell_count: usize,
    pub avg_price_simple: Option<f64>,
    pub avg_price_weighted: Option<f64>,
    pub spread_pct: Option<f64>,
    pub coef_var: Option<f64>,
    pub total_exposed_volume: f64,
    pub top1_price: Option<f64>,
    pub top1_vol: Option<f64>,
    pub top1_nick: Option<String>,
    pub top_prices: String,
    pub arb_source_to_target_pct: Option<f64>,
    pub arb_target_to_source_pct: Option<f64>,
}

impl SummaryRow {
    pub fn from_pair(snapshot: &Snapshot, pair: &PairSnapshot, top_n: usize) -> Self {
        let top = pair.top_of_book();
        Self {
            timestamp_utc: format_timestamp(&snapshot.timestamp),
            run_id: snapshot.run_id.clone(),
            pair: pair.pair.to_string(),
            rows_fetched: pair.rows_fetched(),
            buy_count: pair.buy.sample_count(),
            sell_count: pair.sell.sample_count(),
            avg_price_simple: pair.avg_price_simple(),
            avg_price_weighted: pair.avg_price_weighted(),
            spread_pct: pair.spread_pct(),
            coef_var: pair.combined.stats().map(|s| s.coefficient_of_variation),
            total_exposed_volume: pair.exposed_volume(),
            top1_price: top.as_ref().map(|t| t.price),
            top1_vol: top.as_ref().map(|t| t.capacity),
            top1_nick: top.map(|t| t.nick),
            top_prices: pair
                .top_prices(top_n)
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join("|"),
            arb_source_to_target_pct: snapshot.rates.arbitrage.source_to_target.pct,
            arb_target_to_source_pct: snapshot.rates.arbitrage.target_to_source.pct,
        }
    }
}

/// One row of `ads_YYYYMMDD.csv`: a fetched listing, verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawListingRow {
    pub timestamp_utc: String,
    pub exchange: String,
    pub pair: String,
    pub trade_type: String,
    pub adv_id: String,
    pub advertiser_id: String,
    pub advertiser_nick: String,
    pub month_finish_rate: String,
    pub month_order_count: u64,
    pub price: f64,
    pub max_trans_amount: f64,
    pub min_trans_amount: f64,
    pub payment_methods: String,
    pub raw_json: String,
}

impl RawListingRow {
    fn from_listing(
        snapshot: &Snapshot,
        pair: &PairSnapshot,
        listing: &Listing,
        exchange: &str,
        raw_limit: usize,
    ) -> Self {
        Self {
            timestamp_utc: format_timestamp(&snapshot.timestamp),
            exchange: exchange.to_string(),
            pair: pair.pair.to_string(),
            trade_type: listing.direction.to_string(),
            adv_id: listing.adv_no.clone(),
            advertiser_id: listing.advertiser_id.clone(),
            advertiser_nick: listing.advertiser_nick.clone(),
            month_finish_rate: listing.month_finish_rate.clone(),
            month_order_count: listing.month_order_count,
            price: listing.price,
            max_trans_amount: listing.max_amount,
            min_trans_amount: listing.min_amount,
            payment_methods: listing.payment_methods.join(","),
            raw_json: truncate_chars(&listing.raw, raw_limit).to_string(),
        }
    }
}

/// CSV files under `<root>/snapshots` and `<root>/ads`, one per UTC day
#[derive(Debug, Clone)]
pub struct CsvSnapshotStore {
    root: PathBuf,
    exchange: String,
    top_prices: usize,
    raw_payload_limit: usize,
    /// Held for the whole save so concurrent runs never interleave rows
    write_lock: Arc<Mutex<()>>,
}

impl CsvSnapshotStore {
    pub fn new(root: impl Into<PathBuf>, exchange: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            exchange: exchange.into(),
            top_prices: 3,
            raw_payload_limit: 500,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_limits(mut self, top_prices: usize, raw_payload_limit: usize) -> Self {
        self.top_prices = top_prices;
        self.raw_payload_limit = raw_payload_limit;
        self
    }

    pub fn summary_path(&self, date: NaiveDate) -> PathBuf {
        self.root
            .join("snapshots")
            .join(format!("snapshots_{}.csv", date.format("%Y%m%d")))
    }

    pub fn raw_path(&self, date: NaiveDate) -> PathBuf {
        self.root
            .join("ads")
            .join(format!("ads_{}.csv", date.format("%Y%m%d")))
    }

    /// Create the `snapshots` and `ads` directories up front
    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(self.root.join("snapshots"))?;
        fs::create_dir_all(self.root.join("ads"))?;
        Ok(())
    }

    pub fn read_summaries(&self, date: NaiveDate) -> Result<Vec<SummaryRow>, StorageError> {
        read_rows(&self.summary_path(date))
    }

    pub fn read_raw_listings(&self, date: NaiveDate) -> Result<Vec<RawListingRow>, StorageError> {
        read_rows(&self.raw_path(date))
    }
}

impl SnapshotStore for CsvSnapshotStore {
    fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let date = snapshot.timestamp.date_naive();

        let raw_rows: Vec<RawListingRow> = snapshot
            .pairs()
            .into_iter()
            .flat_map(|pair| {
                pair.buy_listings
                    .iter()
                    .chain(pair.sell_listings.iter())
                    .map(move |l| {
                        RawListingRow::from_listing(snapshot, pair, l, &self.exchange, self.raw_payload_limit)
                    })
            })
            .collect();
        // the guard protects no data, a poisoned lock is still usable
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let raw_path = self.raw_path(date);
        append_rows(&raw_path, &raw_rows)?;
        info!("💾 {} raw listings saved → {}", raw_rows.len(), raw_path.display());

        let summaries: Vec<SummaryRow> = snapshot
            .pairs()
            .into_iter()
            .map(|pair| SummaryRow::from_pair(snapshot, pair, self.top_prices))
            .collect();

        let summary_path = self.summary_path(date);
        append_rows(&summary_path, &summaries)?;
        info!("💾 Snapshot {} saved → {}", snapshot.run_id, summary_path.display());

        Ok(())
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Append rows, writing the header only when the file is new or empty
fn append_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), StorageError> {
    if rows.is_empty() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_new = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(is_new)
        .from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StorageError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for result in reader.deserialize::<T>() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => warn!("Skipping unreadable row in {}: {}", path.display(), e),
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::{AnalyzerConfig, MarketAnalyzer};
    use crate::domain::rates::RateCalculator;
    use crate::domain::snapshot::{FetchedListings, SnapshotAssembler};
    use crate::report::ReportFormatter;
    use crate::shared::types::Direction;
    use crate::testing::listing;
    use chrono::TimeZone;

    fn sample_snapshot(at: DateTime<Utc>) -> Snapshot {
        let side = |d: Direction, fiat: &str, prices: &[(f64, f64)]| -> Vec<Listing> {
            prices.iter().map(|(p, c)| listing(d, fiat, *p, *c)).collect()
        };
        let mut long = listing(Direction::Sell, "VES", 40.25, 300.0);
        long.raw = "x".repeat(2_000);
        let mut target_sell = vec![long];
        target_sell.extend(side(Direction::Sell, "VES", &[(40.1, 120.0)]));

        let fetched = FetchedListings {
            source_buy: side(Direction::Buy, "COP", &[(4012.5, 1_000_000.0), (4020.0, 500_000.0)]),
            source_sell: side(Direction::Sell, "COP", &[(3990.0, 800_000.0), (3985.5, 100_000.0), (3970.0, 1.0)]),
            target_buy: side(Direction::Buy, "VES", &[(41.3, 50.0)]),
            target_sell,
        };
        SnapshotAssembler::new(
            MarketAnalyzer::new(AnalyzerConfig::default()),
            RateCalculator::new(vec![5.0, 7.5, 10.0], 4),
            5,
        )
        .assemble("USDT", "COP", "VES", fetched, at)
    }

    #[test]
    fn test_summary_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvSnapshotStore::new(dir.path(), "binance_p2p").with_limits(2, 100);
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 0, 7).unwrap();
        let snapshot = sample_snapshot(at);

        store.save_snapshot(&snapshot).unwrap();
        let rows = store.read_summaries(at.date_naive()).unwrap();
        assert_eq!(rows.len(), 2);

        let cop = &rows[0];
        let expected = SummaryRow::from_pair(&snapshot, &snapshot.source, 2);
        assert_eq!(cop, &expected);
        assert_eq!(cop.timestamp_utc, "2024-03-05T14:00:07Z");
        assert_eq!(cop.pair, "USDT-COP");
        assert_eq!(cop.rows_fetched, 5);
        assert_eq!(cop.top_prices, "3990|3985.5");
        assert_eq!(cop.top1_nick.as_deref(), Some("trader"));
        assert_eq!(cop.avg_price_simple, snapshot.source.avg_price_simple());
        assert_eq!(cop.arb_source_to_target_pct, snapshot.rates.arbitrage.source_to_target.pct);

        let ves = &rows[1];
        assert_eq!(ves, &SummaryRow::from_pair(&snapshot, &snapshot.target, 2));
        assert_eq!(ves.coef_var, snapshot.target.combined.stats().map(|s| s.coefficient_of_variation));
    }

    #[test]
    fn test_stored_top_of_book_matches_chat() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvSnapshotStore::new(dir.path(), "binance_p2p").with_limits(2, 100);
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap();
        let fetched = FetchedListings {
            source_sell: vec![
                listing(Direction::Sell, "COP", 4012.5561, 1234.567),
                listing(Direction::Sell, "COP", 4000.0049, 10.0),
            ],
            ..Default::default()
        };
        let snapshot = SnapshotAssembler::new(
            MarketAnalyzer::new(AnalyzerConfig::default()),
            RateCalculator::new(vec![5.0], 4),
            5,
        )
        .assemble("USDT", "COP", "VES", fetched, at);

        store.save_snapshot(&snapshot).unwrap();
        let cop = store.read_summaries(at.date_naive()).unwrap().remove(0);
        assert_eq!(cop.top1_price, Some(4012.56));
        assert_eq!(cop.top1_vol, Some(1234.57));
        assert_eq!(cop.top_prices, "4012.56|4000");

        let chat = ReportFormatter::default().compact_summary(&snapshot, "COP");
        assert!(chat.contains("Mejor anuncio: 4012.56 (trader, máx. 1234.57)"));
    }

    #[test]
    fn test_header_written_once_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvSnapshotStore::new(dir.path(), "binance_p2p");
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 6, 0, 0).unwrap();

        store.save_snapshot(&sample_snapshot(at)).unwrap();
        store.save_snapshot(&sample_snapshot(at)).unwrap();

        let content = fs::read_to_string(store.summary_path(at.date_naive())).unwrap();
        let headers = content.lines().filter(|l| l.starts_with("timestamp_utc,")).count();
        assert_eq!(headers, 1);
        assert_eq!(store.read_summaries(at.date_naive()).unwrap().len(), 4);

        let next_day = Utc.with_ymd_and_hms(2024, 3, 6, 0, 0, 1).unwrap();
        store.save_snapshot(&sample_snapshot(next_day)).unwrap();
        assert_eq!(store.read_summaries(next_day.date_naive()).unwrap().len(), 2);
    }

    #[test]
    fn test_concurrent_saves_share_one_header() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvSnapshotStore::new(dir.path(), "binance_p2p");
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 18, 0, 0).unwrap();
        let snapshot = sample_snapshot(at);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let store = store.clone();
                let snapshot = &snapshot;
                scope.spawn(move || store.save_snapshot(snapshot).unwrap());
            }
        });

        let content = fs::read_to_string(store.summary_path(at.date_naive())).unwrap();
        assert_eq!(content.lines().filter(|l| l.starts_with("timestamp_utc,")).count(), 1);
        assert_eq!(store.read_summaries(at.date_naive()).unwrap().len(), 16);
        assert_eq!(store.read_raw_listings(at.date_naive()).unwrap().len(), 64);
    }

    #[test]
    fn test_raw_rows_are_truncated_and_joined() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvSnapshotStore::new(dir.path(), "binance_p2p").with_limits(3, 100);
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();
        store.save_snapshot(&sample_snapshot(at)).unwrap();

        let rows = store.read_raw_listings(at.date_naive()).unwrap();
        assert_eq!(rows.len(), 8);
        assert!(rows.iter().all(|r| r.raw_json.chars().count() <= 100));
        assert_eq!(rows[0].trade_type, "BUY");
        assert_eq!(rows[0].pair, "USDT-COP");
        assert_eq!(rows[0].payment_methods, "Nequi,Pago Movil");
        assert_eq!(rows[0].exchange, "binance_p2p");
        let long = rows.iter().find(|r| r.price == 40.25).unwrap();
        assert_eq!(long.raw_json.len(), 100);
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvSnapshotStore::new(dir.path(), "binance_p2p");
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(store.read_summaries(date).unwrap().is_empty());
    }
}
