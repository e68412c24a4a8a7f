use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

use crate::errors::CoreError;
use crate::models::instrument::InstrumentType;
use crate::models::price::{Ohlc, PriceRecord};
use crate::models::settings::SourceSettings;
use super::normalize;
use super::traits::PriceSource;
use super::http_client;

const PROVIDER: &str = "Sina";

/// Daily bars only (scale = minutes per bar)
const DAILY_SCALE: &str = "240";
const MAX_BARS: &str = "10000";

/// Sina Finance A-share history, last resort for stocks.
///
/// Only unadjusted bars are available; both adjusted series are filled
/// with the raw prices.
pub struct SinaSource {
    client: Client,
    base_url: String,
}

impl SinaSource {
    pub fn new(settings: &SourceSettings) -> Self {
        Self {
            client: http_client(settings),
            base_url: settings.sina_url.clone(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

// ── Sina API response types ────────────────────────────────────────

#[derive(Deserialize)]
struct SinaBar {
    day: String,
    open: String,
    high: String,
    low: String,
    close: String,
    #[serde(default)]
    volume: Option<String>,
}

impl SinaBar {
    fn into_record(self) -> Option<PriceRecord> {
        // "day" may carry a time component on intraday scales
        let date = normalize::parse_date(self.day.get(..10).unwrap_or(&self.day))?;
        let raw = Ohlc {
            open: normalize::parse_number(&self.open),
            high: normalize::parse_number(&self.high),
            low: normalize::parse_number(&self.low),
            close: normalize::parse_number(&self.close),
        };
        let mut record = PriceRecord::new(date);
        record.raw = raw;
        record.qfq = raw;
        record.hfq = raw;
        record.volume = Some(
            self.volume
                .as_deref()
                .and_then(normalize::parse_number)
                .unwrap_or(0.0),
        );
        Some(record)
    }
}

#[async_trait]
impl PriceSource for SinaSource {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn supported_instrument_types(&self) -> Vec<InstrumentType> {
        vec![InstrumentType::Stock]
    }

    async fn fetch(&self, symbol: &str, start: NaiveDate) -> Result<Vec<PriceRecord>, CoreError> {
        let code = normalize::prefixed_symbol(symbol);
        let bars: Option<Vec<SinaBar>> = self
            .client
            .get(&self.base_url)
            .query(&[
                ("symbol", code.as_str()),
                ("scale", DAILY_SCALE),
                ("ma", "no"),
                ("datalen", MAX_BARS),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to parse klines for {symbol}: {e}"),
            })?;

        let records: Vec<PriceRecord> = bars
            .unwrap_or_default()
            .into_iter()
            .filter_map(SinaBar::into_record)
            .filter(|r| r.date >= start)
            .collect();

        if records.is_empty() {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Returned empty data for {symbol}"),
            });
        }
        Ok(records)
    }
}
