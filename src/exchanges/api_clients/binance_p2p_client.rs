use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::HttpCfg;
use crate::exchanges::types::{Listing, ListingQuery};
use crate::shared::errors::FetchError;
use crate::shared::types::Direction;
use super::ListingFetcher;

/// Body of the `adv/search` request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    page: u32,
    rows: u32,
    asset: &'a str,
    trade_type: &'a str,
    fiat: &'a str,
    publisher_type: Option<&'a str>,
    merchant_check: bool,
}

/// Binance P2P numbers arrive either as JSON strings or numbers
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Decimal {
    Number(f64),
    Text(String),
}

impl Decimal {
    fn to_f64(&self) -> Option<f64> {
        let value = match self {
            Decimal::Number(n) => *n,
            Decimal::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }

    fn to_text(&self) -> String {
        match self {
            Decimal::Number(n) => n.to_string(),
            Decimal::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TradeMethod {
    #[serde(default)]
    trade_method_name: Option<String>,
    #[serde(default)]
    identifier: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAdv {
    adv_no: String,
    price: Decimal,
    min_single_trans_amount: Decimal,
    #[serde(default)]
    max_single_trans_amount: Option<Decimal>,
    #[serde(default)]
    dynamic_max_single_trans_amount: Option<Decimal>,
    #[serde(default)]
    trade_methods: Vec<TradeMethod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAdvertiser {
    #[serde(default)]
    user_no: Option<String>,
    #[serde(default)]
    nick_name: Option<String>,
    #[serde(default)]
    month_order_count: Option<u64>,
    #[serde(default)]
    month_finish_rate: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct RawAdEntry {
    adv: RawAdv,
    #[serde(default)]
    advertiser: Option<RawAdvertiser>,
}

/// Binance P2P `adv/search` client
pub struct BinanceP2pClient {
    http_client: Client,
    endpoint: String,
}

impl BinanceP2pClient {
    pub fn new(cfg: &HttpCfg) -> Result<Self, FetchError> {
        let http_client = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .user_agent(cfg.user_agent.clone())
            .build()?;
        Ok(Self {
            http_client,
            endpoint: cfg.endpoint.clone(),
        })
    }

    async fn search(&self, query: &ListingQuery) -> Result<Vec<Listing>, FetchError> {
        let request = SearchRequest {
            page: query.page,
            rows: query.rows,
            asset: &query.asset,
            trade_type: query.direction.as_str(),
            fiat: &query.fiat,
            publisher_type: None,
            merchant_check: query.merchant_only,
        };

        debug!("POST {} {} {}", self.endpoint, query.direction, query.fiat);

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FetchError::MalformedBody(e.to_string()))?;

        parse_listings(&body, query.direction, &query.fiat)
    }
}

#[async_trait]
impl ListingFetcher for BinanceP2pClient {
    async fn fetch_listings(&self, query: &ListingQuery) -> Vec<Listing> {
        match self.search(query).await {
            Ok(listings) => {
                info!("🔹 {} {} listings fetched ({})", listings.len(), query.direction, query.pair());
                listings
            }
            Err(e) => {
                error!("❌ Failed to fetch {} {}: {}", query.direction, query.pair(), e);
                Vec::new()
            }
        }
    }
}

/// Decode the `data` array of an `adv/search` response.
///
/// A body without a `data` array is malformed; individual entries that do not
/// match the listing schema are skipped.
pub(crate) fn parse_listings(
    body: &serde_json::Value,
    direction: Direction,
    fiat: &str,
) -> Result<Vec<Listing>, FetchError> {
    let entries = match body.get("data") {
        Some(serde_json::Value::Array(entries)) => entries,
        Some(serde_json::Value::Null) => return Ok(Vec::new()),
        _ => return Err(FetchError::MalformedBody("missing `data` array".to_string())),
    };

    let mut listings = Vec::with_capacity(entries.len());
    for entry in entries {
        let raw: RawAdEntry = match serde_json::from_value(entry.clone()) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("⚠️ Skipping listing with unexpected format: {}", e);
                continue;
            }
        };
        match to_listing(raw, entry, direction, fiat) {
            Some(listing) => listings.push(listing),
            None => warn!("⚠️ Skipping listing with invalid price or amounts"),
        }
    }
    Ok(listings)
}

fn to_listing(
    raw: RawAdEntry,
    entry: &serde_json::Value,
    direction: Direction,
    fiat: &str,
) -> Option<Listing> {
    let adv = raw.adv;
    let price = adv.price.to_f64().filter(|p| *p > 0.0)?;
    let min_amount = adv.min_single_trans_amount.to_f64().filter(|v| *v >= 0.0)?;
    let max_amount = adv
        .dynamic_max_single_trans_amount
        .as_ref()
        .and_then(Decimal::to_f64)
        .or_else(|| adv.max_single_trans_amount.as_ref().and_then(Decimal::to_f64))
        .filter(|v| *v >= min_amount)?;

    let advertiser = raw.advertiser;
    let (advertiser_id, advertiser_nick, month_order_count, month_finish_rate) = match advertiser {
        Some(a) => (
            a.user_no.unwrap_or_default(),
            a.nick_name.unwrap_or_else(|| "N/A".to_string()),
            a.month_order_count.unwrap_or(0),
            a.month_finish_rate.map(|r| r.to_text()).unwrap_or_default(),
        ),
        None => (String::new(), "N/A".to_string(), 0, String::new()),
    };

    let payment_methods = adv
        .trade_methods
        .into_iter()
        .filter_map(|m| m.trade_method_name.or(m.identifier))
        .collect();

    Some(Listing {
        adv_no: adv.adv_no,
        direction,
        fiat: fiat.to_string(),
        price,
        min_amount,
        max_amount,
        advertiser_id,
        advertiser_nick,
        month_order_count,
        month_finish_rate,
        payment_methods,
        raw: entry.to_string(),
    })
}
