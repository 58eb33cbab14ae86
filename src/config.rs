use serde::Deserialize;
use std::{fs, path::Path};

use crate::shared::errors::ConfigError;

/// Upper bound for published decimals
const MAX_DECIMALS: u32 = 12;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FiatCfg {
    pub code: String,
    pub page: u32,
    pub rows: u32,
}

impl FiatCfg {
    fn with_code(code: &str) -> Self {
        Self {
            code: code.to_string(),
            page: 1,
            rows: 10,
        }
    }
}

impl Default for FiatCfg {
    fn default() -> Self {
        Self::with_code("COP")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketCfg {
    pub asset: String,
    pub exchange: String,
    pub merchant_only: bool,
    pub source: FiatCfg,
    pub target: FiatCfg,
}

impl Default for MarketCfg {
    fn default() -> Self {
        Self {
            asset: "USDT".to_string(),
            exchange: "binance_p2p".to_string(),
            merchant_only: false,
            source: FiatCfg::with_code("COP"),
            target: FiatCfg::with_code("VES"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisCfg {
    pub outlier_band_fraction: f64,
    pub use_volume_weighting: bool,
    pub volatility_threshold_pct: f64,
    /// How many top listings feed the remittance-rate averages
    pub remittance_sample_size: usize,
    pub price_decimals: u32,
    pub rate_decimals: u32,
    /// Size of the top-N price list in summary rows
    pub top_prices: usize,
}

impl Default for AnalysisCfg {
    fn default() -> Self {
        Self {
            outlier_band_fraction: 0.025,
            use_volume_weighting: true,
            volatility_threshold_pct: 2.0,
            remittance_sample_size: 5,
            price_decimals: 2,
            rate_decimals: 4,
            top_prices: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReferenceMultiplier {
    pub label: String,
    pub factor: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RatesCfg {
    pub margins_pct: Vec<f64>,
    pub reference_multipliers: Vec<ReferenceMultiplier>,
}

impl Default for RatesCfg {
    fn default() -> Self {
        Self {
            margins_pct: vec![5.0, 7.5, 10.0],
            reference_multipliers: vec![
                ReferenceMultiplier {
                    label: "Ref. -3%".to_string(),
                    factor: 0.97,
                },
                ReferenceMultiplier {
                    label: "Ref. +3%".to_string(),
                    factor: 1.03,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleCfg {
    /// Hours of day (in the `utc_offset_hours` zone) that trigger a report
    pub scheduled_hours: Vec<u32>,
    pub utc_offset_hours: i32,
    pub poll_interval_seconds: u64,
    pub default_auto_interval_seconds: u64,
    pub min_auto_interval_seconds: u64,
}

impl Default for ScheduleCfg {
    fn default() -> Self {
        Self {
            scheduled_hours: vec![6, 10, 14, 18],
            utc_offset_hours: -5,
            poll_interval_seconds: 60,
            default_auto_interval_seconds: 3600,
            min_auto_interval_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpCfg {
    pub endpoint: String,
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for HttpCfg {
    fn default() -> Self {
        Self {
            endpoint: "https://p2p.binance.com/bapi/c2c/v2/friendly/c2c/adv/search".to_string(),
            timeout_ms: 10_000,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageCfg {
    pub data_dir: String,
    pub raw_payload_limit: usize,
}

impl Default for StorageCfg {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            raw_payload_limit: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramCfg {
    pub api_base: String,
    pub long_poll_seconds: u64,
}

impl Default for TelegramCfg {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            long_poll_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub market: MarketCfg,
    pub analysis: AnalysisCfg,
    pub rates: RatesCfg,
    pub schedule: ScheduleCfg,
    pub http: HttpCfg,
    pub storage: StorageCfg,
    pub telegram: TelegramCfg,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&s)
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from `path` when it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.market.source.code.eq_ignore_ascii_case(&self.market.target.code) {
            return Err(ConfigError::Invalid(
                "source and target fiat must differ".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.analysis.outlier_band_fraction) {
            return Err(ConfigError::Invalid(format!(
                "outlier_band_fraction must be in [0, 1), got {}",
                self.analysis.outlier_band_fraction
            )));
        }
        if self.analysis.remittance_sample_size == 0 {
            return Err(ConfigError::Invalid(
                "remittance_sample_size must be at least 1".to_string(),
            ));
        }
        if self.analysis.price_decimals > MAX_DECIMALS || self.analysis.rate_decimals > MAX_DECIMALS {
            return Err(ConfigError::Invalid(format!(
                "price_decimals and rate_decimals must be at most {}",
                MAX_DECIMALS
            )));
        }
        if let Some(hour) = self.schedule.scheduled_hours.iter().find(|h| **h > 23) {
            return Err(ConfigError::Invalid(format!("invalid scheduled hour {}", hour)));
        }
        if !(-23..=23).contains(&self.schedule.utc_offset_hours) {
            return Err(ConfigError::Invalid(format!(
                "utc_offset_hours must be within ±23, got {}",
                self.schedule.utc_offset_hours
            )));
        }
        if self.schedule.poll_interval_seconds == 0 || self.schedule.min_auto_interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "schedule intervals must be positive".to_string(),
            ));
        }
        if self.schedule.default_auto_interval_seconds < self.schedule.min_auto_interval_seconds {
            return Err(ConfigError::Invalid(
                "default_auto_interval_seconds is below min_auto_interval_seconds".to_string(),
            ));
        }
        if self.http.timeout_ms == 0 {
            return Err(ConfigError::Invalid("http.timeout_ms must be positive".to_string()));
        }
        Ok(())
    }
}

/// Chat secrets taken from the environment (`.env` is loaded first)
#[derive(Debug, Clone)]
pub struct Secrets {
    pub bot_token: String,
    pub chat_id: String,
    pub owner_id: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingSecret(key))
        };
        Ok(Self {
            bot_token: required("BOT_TOKEN")?,
            chat_id: required("CHAT_ID")?,
            owner_id: lookup("OWNER_ID")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_sections_missing() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg.market.asset, "USDT");
        assert_eq!(cfg.market.source.code, "COP");
        assert_eq!(cfg.market.target.code, "VES");
        assert_eq!(cfg.analysis.remittance_sample_size, 5);
        assert_eq!(cfg.rates.margins_pct, vec![5.0, 7.5, 10.0]);
        assert_eq!(cfg.rates.reference_multipliers.len(), 2);
        assert_eq!(cfg.schedule.scheduled_hours, vec![6, 10, 14, 18]);
        assert_eq!(cfg.http.timeout_ms, 10_000);
    }

    #[test]
    fn test_partial_override() {
        let cfg = Config::from_toml(
            r#"
            [market.target]
            code = "ARS"
            rows = 20

            [analysis]
            outlier_band_fraction = 0.05
            use_volume_weighting = false
            "#,
        )
        .unwrap();
        assert_eq!(cfg.market.target.code, "ARS");
        assert_eq!(cfg.market.target.rows, 20);
        assert_eq!(cfg.market.target.page, 1);
        assert_eq!(cfg.analysis.outlier_band_fraction, 0.05);
        assert!(!cfg.analysis.use_volume_weighting);
        assert_eq!(cfg.analysis.price_decimals, 2);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_toml("[schedule]\nscheduled_hours = [25]").is_err());
        assert!(Config::from_toml("[market.target]\ncode = \"COP\"").is_err());
        assert!(Config::from_toml("[analysis]\nremittance_sample_size = 0").is_err());
        assert!(Config::from_toml("[schedule]\nutc_offset_hours = 30").is_err());
        assert!(Config::from_toml("[schedule]\npoll_interval_seconds = 0").is_err());
        assert!(Config::from_toml("not = [valid").is_err());
    }

    #[test]
    fn test_decimals_are_capped() {
        assert!(Config::from_toml("[analysis]\nprice_decimals = 12\nrate_decimals = 12").is_ok());
        assert!(Config::from_toml("[analysis]\nprice_decimals = 13").is_err());
        assert!(Config::from_toml("[analysis]\nrate_decimals = 4000000000").is_err());
    }

    #[test]
    fn test_bundled_config_file() {
        let cfg = Config::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/Config.toml")).unwrap();
        assert_eq!(cfg.rates.reference_multipliers[1].factor, 1.03);
        assert_eq!(cfg.schedule.utc_offset_hours, -5);
        assert!(Config::from_file("/nonexistent/Config.toml").is_err());
    }

    #[test]
    fn test_secrets_required() {
        let mut env = HashMap::new();
        env.insert("BOT_TOKEN", "123:abc".to_string());
        let err = Secrets::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret("CHAT_ID")));

        env.insert("CHAT_ID", "-100".to_string());
        env.insert("OWNER_ID", " ".to_string());
        let secrets = Secrets::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(secrets.chat_id, "-100");
        assert_eq!(secrets.owner_id, None);
    }
}
