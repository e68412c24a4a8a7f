//! Shared helpers for turning provider rows into [`PriceRecord`]s.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::models::price::{Ohlc, PriceRecord};

/// Which price series a provider row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Series {
    Raw,
    Qfq,
    Hfq,
}

/// One provider row before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub date: NaiveDate,
    pub ohlc: Ohlc,
    /// Shares traded, when the provider reports it
    pub volume: Option<f64>,
    /// Traded amount in currency, when the provider reports it
    pub turnover: Option<f64>,
}

/// Volume from the provider's own field, or derived as `turnover / close / lot_size`.
/// Falls back to zero when neither is usable.
pub fn resolve_volume(bar: &Bar, lot_size: f64) -> f64 {
    if let Some(volume) = bar.volume {
        return volume;
    }
    match (bar.turnover, bar.ohlc.close) {
        (Some(turnover), Some(close)) if close > 0.0 && lot_size > 0.0 => {
            let derived = turnover / close / lot_size;
            if derived.is_finite() {
                derived
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Outer-join several series on date.
///
/// A date present in only some of the series is kept with the other series left
/// empty. Volume is taken from the `volume_from` series; dates missing there get
/// no volume.
pub fn outer_join(series: Vec<(Series, Vec<Bar>)>, volume_from: Series, lot_size: f64) -> Vec<PriceRecord> {
    let mut by_date: BTreeMap<NaiveDate, PriceRecord> = BTreeMap::new();

    for (kind, bars) in series {
        for bar in bars {
            let record = by_date
                .entry(bar.date)
                .or_insert_with(|| PriceRecord::new(bar.date));
            let slot = match kind {
                Series::Raw => &mut record.raw,
                Series::Qfq => &mut record.qfq,
                Series::Hfq => &mut record.hfq,
            };
            *slot = bar.ohlc;
            if kind == volume_from {
                record.volume = Some(resolve_volume(&bar, lot_size));
            }
        }
    }

    by_date.into_values().collect()
}

/// Parse a numeric cell; blanks, dashes and garbage become `None`.
pub fn parse_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() || cell == "-" {
        return None;
    }
    cell.parse().ok()
}

/// Parse `YYYY-MM-DD`.
pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(cell.trim(), "%Y-%m-%d").ok()
}

/// True for codes listed in Shenzhen (main board, ChiNext, SZ-listed funds).
pub fn is_shenzhen(symbol: &str) -> bool {
    symbol.starts_with('0')
        || symbol.starts_with('3')
        || symbol.starts_with("15")
        || symbol.starts_with("16")
}

/// Exchange-prefixed code used by Tencent and Sina, e.g. `sh600519`.
pub fn prefixed_symbol(symbol: &str) -> String {
    let prefix = if is_shenzhen(symbol) { "sz" } else { "sh" };
    format!("{prefix}{symbol}")
}

/// East Money security id, e.g. `1.600519` (Shanghai) or `0.000001` (Shenzhen).
pub fn eastmoney_secid(symbol: &str) -> String {
    let market = if is_shenzhen(symbol) { 0 } else { 1 };
    format!("{market}.{symbol}")
}
