use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::errors::CoreError;
use crate::models::instrument::InstrumentType;
use crate::models::price::{Ohlc, PriceRecord};
use crate::models::settings::SourceSettings;
use super::normalize::{self, Bar, Series};
use super::traits::PriceSource;
use super::http_client;

const PROVIDER: &str = "Tencent";
const MAX_BARS: u32 = 10_000;

/// Tencent Finance A-share history.
///
/// - **Free**: no API key.
/// - **Data**: front- and back-adjusted daily bars only. There is no raw
///   series, so raw prices are copied from the front-adjusted series (they
///   agree on the most recent day).
/// - **Volume**: not reported; derived from the traded amount column as
///   `amount / close / lot_size`.
pub struct TencentSource {
    client: Client,
    base_url: String,
    lot_size: f64,
}

impl TencentSource {
    pub fn new(settings: &SourceSettings) -> Self {
        Self {
            client: http_client(settings),
            base_url: settings.tencent_url.clone(),
            lot_size: settings.lot_size,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn fetch_series(
        &self,
        symbol: &str,
        series: Series,
        start: NaiveDate,
    ) -> Result<Vec<Bar>, CoreError> {
        let (mode, key) = match series {
            Series::Qfq => ("qfq", "qfqday"),
            Series::Hfq => ("hfq", "hfqday"),
            Series::Raw => ("", "day"),
        };
        let code = normalize::prefixed_symbol(symbol);
        let param = format!(
            "{code},day,{},2050-12-31,{MAX_BARS},{mode}",
            start.format("%Y-%m-%d")
        );

        let resp: FqKlineResponse = self
            .client
            .get(&self.base_url)
            .query(&[("param", param.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to parse {mode} klines for {symbol}: {e}"),
            })?;

        // Besides the bar arrays the per-symbol object carries quote metadata
        let rows = resp
            .data
            .get(&code)
            .and_then(|by_key| by_key.get(key))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let bars: Vec<Bar> = rows
            .iter()
            .filter_map(|row| row.as_array().and_then(|cells| parse_row(cells)))
            .filter(|bar| bar.date >= start)
            .collect();

        if bars.is_empty() {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Returned empty {mode} data for {symbol}"),
            });
        }
        Ok(bars)
    }
}

// ── Tencent API response types ─────────────────────────────────────

#[derive(Deserialize)]
struct FqKlineResponse {
    #[serde(default)]
    data: HashMap<String, HashMap<String, Value>>,
}

/// Row layout: `[date, open, close, high, low, amount, ...]`, numbers as strings.
fn parse_row(row: &[Value]) -> Option<Bar> {
    let cell = |idx: usize| -> Option<f64> {
        match row.get(idx)? {
            Value::String(s) => normalize::parse_number(s),
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    };
    let date = normalize::parse_date(row.first()?.as_str()?)?;
    Some(Bar {
        date,
        ohlc: Ohlc {
            open: cell(1),
            close: cell(2),
            high: cell(3),
            low: cell(4),
        },
        volume: None,
        turnover: cell(5),
    })
}

#[async_trait]
impl PriceSource for TencentSource {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn supported_instrument_types(&self) -> Vec<InstrumentType> {
        vec![InstrumentType::Stock]
    }

    async fn fetch(&self, symbol: &str, start: NaiveDate) -> Result<Vec<PriceRecord>, CoreError> {
        let qfq = self.fetch_series(symbol, Series::Qfq, start).await?;
        let hfq = self.fetch_series(symbol, Series::Hfq, start).await?;

        let mut records = normalize::outer_join(
            vec![(Series::Qfq, qfq), (Series::Hfq, hfq)],
            Series::Qfq,
            self.lot_size,
        );
        for record in &mut records {
            record.raw = record.qfq;
        }
        Ok(records)
    }
}
