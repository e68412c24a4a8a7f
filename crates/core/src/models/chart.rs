use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::instrument::InstrumentType;
use super::price::PriceRecord;
use super::transaction::Side;

/// A single point of the portfolio equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,

    /// Market value of all open positions on this date
    pub value: f64,
}

/// Price history of one instrument with its trades overlaid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentChart {
    pub symbol: String,
    pub name: String,
    pub instrument_type: InstrumentType,

    /// Full stored history, ascending by date
    pub prices: Vec<PriceRecord>,

    /// One marker per trade on this instrument, ascending by date
    pub markers: Vec<TradeMarker>,
}

/// A buy/sell annotation on an instrument chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeMarker {
    pub date: NaiveDate,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,

    /// Short label for rendering, e.g. "buy 100"
    pub label: String,
}
