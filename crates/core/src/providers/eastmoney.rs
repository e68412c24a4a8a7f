use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

use crate::errors::CoreError;
use crate::models::instrument::InstrumentType;
use crate::models::price::{Ohlc, PriceRecord};
use crate::models::settings::SourceSettings;
use super::normalize::{self, Bar, Series};
use super::traits::{NameResolver, PriceSource};
use super::http_client;

const PROVIDER: &str = "East Money";

/// Daily kline
const KLINE_PERIOD: &str = "101";
const FAR_END_DATE: &str = "20500101";

/// East Money `fqt` adjustment flag
fn adjust_flag(series: Series) -> &'static str {
    match series {
        Series::Raw => "0",
        Series::Qfq => "1",
        Series::Hfq => "2",
    }
}

fn series_label(series: Series) -> &'static str {
    match series {
        Series::Raw => "raw",
        Series::Qfq => "qfq",
        Series::Hfq => "hfq",
    }
}

// ── East Money API response types ──────────────────────────────────

#[derive(Deserialize)]
struct KlineResponse {
    data: Option<KlineData>,
}

#[derive(Deserialize)]
struct KlineData {
    #[serde(default)]
    klines: Vec<String>,
}

#[derive(Deserialize)]
struct QuoteResponse {
    data: Option<QuoteData>,
}

#[derive(Deserialize)]
struct QuoteData {
    /// Security short name
    f58: Option<String>,
}

/// Thin client over the East Money kline endpoint, shared by the stock and fund sources.
///
/// Kline rows are comma-separated:
/// `date,open,close,high,low,volume,turnover,...`
#[derive(Clone)]
pub struct EastMoneyClient {
    client: Client,
    kline_url: String,
    lot_size: f64,
}

impl EastMoneyClient {
    pub fn new(settings: &SourceSettings) -> Self {
        Self {
            client: http_client(settings),
            kline_url: settings.eastmoney_kline_url.clone(),
            lot_size: settings.lot_size,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.kline_url = url.into();
        self
    }

    /// Fetch one adjustment series. An empty series is an error.
    pub async fn fetch_series(
        &self,
        symbol: &str,
        series: Series,
        start: NaiveDate,
    ) -> Result<Vec<Bar>, CoreError> {
        let secid = normalize::eastmoney_secid(symbol);
        let beg = start.format("%Y%m%d").to_string();
        let resp: KlineResponse = self
            .client
            .get(&self.kline_url)
            .query(&[
                ("secid", secid.as_str()),
                ("fields1", "f1,f2,f3,f4,f5,f6"),
                ("fields2", "f51,f52,f53,f54,f55,f56,f57"),
                ("klt", KLINE_PERIOD),
                ("fqt", adjust_flag(series)),
                ("beg", beg.as_str()),
                ("end", FAR_END_DATE),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to parse {} klines for {symbol}: {e}", series_label(series)),
            })?;

        let bars: Vec<Bar> = resp
            .data
            .map(|d| d.klines)
            .unwrap_or_default()
            .iter()
            .filter_map(|line| parse_kline(line))
            .collect();

        if bars.is_empty() {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Returned empty {} data for {symbol}", series_label(series)),
            });
        }
        Ok(bars)
    }

    /// Fetch raw, qfq and hfq and outer-join them on date.
    async fn fetch_joined(
        &self,
        symbol: &str,
        start: NaiveDate,
        volume_from: Series,
    ) -> Result<Vec<PriceRecord>, CoreError> {
        let raw = self.fetch_series(symbol, Series::Raw, start).await?;
        let qfq = self.fetch_series(symbol, Series::Qfq, start).await?;
        let hfq = self.fetch_series(symbol, Series::Hfq, start).await?;

        let records = normalize::outer_join(
            vec![(Series::Raw, raw), (Series::Qfq, qfq), (Series::Hfq, hfq)],
            volume_from,
            self.lot_size,
        );
        if records.is_empty() {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Merged data is empty for {symbol}"),
            });
        }
        Ok(records)
    }
}

fn parse_kline(line: &str) -> Option<Bar> {
    let cells: Vec<&str> = line.split(',').collect();
    if cells.len() < 5 {
        return None;
    }
    let date = normalize::parse_date(cells[0])?;
    Some(Bar {
        date,
        ohlc: Ohlc {
            open: normalize::parse_number(cells[1]),
            close: normalize::parse_number(cells[2]),
            high: normalize::parse_number(cells[3]),
            low: normalize::parse_number(cells[4]),
        },
        volume: cells.get(5).and_then(|c| normalize::parse_number(c)),
        turnover: cells.get(6).and_then(|c| normalize::parse_number(c)),
    })
}

/// East Money A-share history: raw, front- and back-adjusted series, native volume.
///
/// - **Free**: no API key.
/// - **Coverage**: Shanghai and Shenzhen listings from 1990 onwards.
/// - Three requests per sync (one per adjustment mode); any empty series fails the source.
pub struct EastMoneyStockSource {
    client: EastMoneyClient,
}

impl EastMoneyStockSource {
    pub fn new(settings: &SourceSettings) -> Self {
        Self {
            client: EastMoneyClient::new(settings),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.client = self.client.with_base_url(url);
        self
    }
}

#[async_trait]
impl PriceSource for EastMoneyStockSource {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn supported_instrument_types(&self) -> Vec<InstrumentType> {
        vec![InstrumentType::Stock]
    }

    async fn fetch(&self, symbol: &str, start: NaiveDate) -> Result<Vec<PriceRecord>, CoreError> {
        self.client.fetch_joined(symbol, start, Series::Raw).await
    }
}

/// East Money ETF history, a composite of three sub-fetches (raw, qfq, hfq).
///
/// Funds quote volume on the front-adjusted series.
pub struct EastMoneyFundSource {
    client: EastMoneyClient,
}

impl EastMoneyFundSource {
    pub fn new(settings: &SourceSettings) -> Self {
        Self {
            client: EastMoneyClient::new(settings),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.client = self.client.with_base_url(url);
        self
    }
}

#[async_trait]
impl PriceSource for EastMoneyFundSource {
    fn name(&self) -> &str {
        "East Money Fund"
    }

    fn supported_instrument_types(&self) -> Vec<InstrumentType> {
        vec![InstrumentType::Fund]
    }

    async fn fetch(&self, symbol: &str, start: NaiveDate) -> Result<Vec<PriceRecord>, CoreError> {
        self.client.fetch_joined(symbol, start, Series::Qfq).await
    }
}

/// Resolves display names through the East Money quote endpoint (field `f58`).
pub struct EastMoneyNameResolver {
    client: Client,
    quote_url: String,
}

impl EastMoneyNameResolver {
    pub fn new(settings: &SourceSettings) -> Self {
        Self {
            client: http_client(settings),
            quote_url: settings.eastmoney_quote_url.clone(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.quote_url = url.into();
        self
    }
}

#[async_trait]
impl NameResolver for EastMoneyNameResolver {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn resolve_name(
        &self,
        symbol: &str,
        _instrument_type: InstrumentType,
    ) -> Result<Option<String>, CoreError> {
        let secid = normalize::eastmoney_secid(symbol);
        let params: HashMap<&str, &str> =
            HashMap::from([("secid", secid.as_str()), ("fields", "f57,f58")]);

        let resp: QuoteResponse = self
            .client
            .get(&self.quote_url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to parse quote for {symbol}: {e}"),
            })?;

        Ok(resp
            .data
            .and_then(|d| d.f58)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty()))
    }
}
