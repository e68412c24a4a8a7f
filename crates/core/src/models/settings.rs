use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::CoreError;

pub const DEFAULT_EASTMONEY_KLINE_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";
pub const DEFAULT_EASTMONEY_QUOTE_URL: &str = "https://push2.eastmoney.com/api/qt/stock/get";
pub const DEFAULT_TENCENT_URL: &str = "https://web.ifzq.gtimg.cn/appstock/app/fqkline/get";
pub const DEFAULT_SINA_URL: &str =
    "https://quotes.sina.cn/cn/api/json_v2.php/CN_MarketDataService.getKLineData";

/// Runtime configuration. Every field has a default, so an empty TOML file is valid.
///
/// ```toml
/// [sync]
/// default_start_date = "2015-01-01"
///
/// [sources]
/// timeout_secs = 20
/// lot_size = 100.0
///
/// [valuation]
/// include_trade_dates = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sync: SyncSettings,
    pub sources: SourceSettings,
    pub valuation: ValuationSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// First date requested from price sources when a sync gives none
    pub default_start_date: NaiveDate,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            default_start_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Per-request HTTP timeout
    pub timeout_secs: u64,

    /// Shares per board lot, used to derive volume from turnover
    pub lot_size: f64,

    pub eastmoney_kline_url: String,
    pub eastmoney_quote_url: String,
    pub tencent_url: String,
    pub sina_url: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            lot_size: 100.0,
            eastmoney_kline_url: DEFAULT_EASTMONEY_KLINE_URL.to_string(),
            eastmoney_quote_url: DEFAULT_EASTMONEY_QUOTE_URL.to_string(),
            tencent_url: DEFAULT_TENCENT_URL.to_string(),
            sina_url: DEFAULT_SINA_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationSettings {
    /// Add trade dates without a stored price to the equity curve axis
    pub include_trade_dates: bool,
}

impl Default for ValuationSettings {
    fn default() -> Self {
        Self {
            include_trade_dates: true,
        }
    }
}

impl Settings {
    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, CoreError> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Settings file not found, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("Failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.sources.timeout_secs == 0 {
            return Err(CoreError::Config(
                "sources.timeout_secs must be greater than zero".into(),
            ));
        }
        if !self.sources.lot_size.is_finite() || self.sources.lot_size <= 0.0 {
            return Err(CoreError::Config(format!(
                "sources.lot_size must be a positive number, got {}",
                self.sources.lot_size
            )));
        }
        Ok(())
    }
}
