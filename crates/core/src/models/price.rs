use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Open/high/low/close quadruple. Sources may supply any subset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Ohlc {
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
}

impl Ohlc {
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(Option::is_none)
    }

    fn fields(&self) -> [Option<f64>; 4] {
        [self.open, self.high, self.low, self.close]
    }

    /// Overwrite with every field present in `newer`, keep the rest.
    pub fn merge_from(&mut self, newer: &Ohlc) {
        self.open = newer.open.or(self.open);
        self.high = newer.high.or(self.high);
        self.low = newer.low.or(self.low);
        self.close = newer.close.or(self.close);
    }
}

/// One trading day for one instrument.
///
/// `qfq` is the front-adjusted series (latest price equals the raw quote),
/// `hfq` the back-adjusted series (earliest price equals the raw quote).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub raw: Ohlc,
    pub volume: Option<f64>,
    pub qfq: Ohlc,
    pub hfq: Ohlc,
}

impl PriceRecord {
    /// An empty record for `date`; fill in whatever series the source has.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            raw: Ohlc::default(),
            volume: None,
            qfq: Ohlc::default(),
            hfq: Ohlc::default(),
        }
    }

    /// Raw close, the price used for valuation.
    pub fn close(&self) -> Option<f64> {
        self.raw.close
    }

    /// Every present price must be finite and strictly positive, volume finite and
    /// non-negative, and at least one price must be present.
    pub fn is_valid(&self) -> bool {
        let prices: Vec<f64> = [self.raw, self.qfq, self.hfq]
            .iter()
            .flat_map(|q| q.fields())
            .flatten()
            .collect();
        if prices.is_empty() {
            return false;
        }
        let prices_ok = prices.iter().all(|p| p.is_finite() && *p > 0.0);
        let volume_ok = self.volume.map_or(true, |v| v.is_finite() && v >= 0.0);
        prices_ok && volume_ok
    }

    /// Partial overwrite: fields present in `newer` win.
    pub fn merge_from(&mut self, newer: &PriceRecord) {
        self.raw.merge_from(&newer.raw);
        self.qfq.merge_from(&newer.qfq);
        self.hfq.merge_from(&newer.hfq);
        self.volume = newer.volume.or(self.volume);
    }
}

/// Price history of every instrument, keyed by (symbol, date).
///
/// Each symbol's records are kept sorted by date so point lookups and
/// "latest on or before" queries are binary searches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceStore {
    entries: BTreeMap<String, Vec<PriceRecord>>,
}

impl PriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for an exact (symbol, date), if stored.
    pub fn get(&self, symbol: &str, date: NaiveDate) -> Option<&PriceRecord> {
        let records = self.entries.get(symbol)?;
        records
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|idx| &records[idx])
    }

    /// Insert or partially overwrite the record at `(symbol, record.date)`.
    pub fn upsert(&mut self, symbol: &str, record: PriceRecord) {
        let records = self.entries.entry(symbol.to_string()).or_default();
        match records.binary_search_by_key(&record.date, |r| r.date) {
            Ok(idx) => records[idx].merge_from(&record),
            Err(idx) => records.insert(idx, record),
        }
    }

    /// Upsert a batch; returns how many records were written.
    pub fn upsert_all(&mut self, symbol: &str, records: impl IntoIterator<Item = PriceRecord>) -> usize {
        let mut written = 0;
        for record in records {
            self.upsert(symbol, record);
            written += 1;
        }
        written
    }

    /// All records of a symbol, ascending by date.
    pub fn series(&self, symbol: &str) -> &[PriceRecord] {
        self.entries.get(symbol).map(Vec::as_slice).unwrap_or_default()
    }

    /// Most recent raw close of a symbol.
    pub fn latest_close(&self, symbol: &str) -> Option<f64> {
        self.series(symbol).iter().rev().find_map(PriceRecord::close)
    }

    /// Raw close on `date`, falling back to the most recent earlier close.
    pub fn close_on_or_before(&self, symbol: &str, date: NaiveDate) -> Option<f64> {
        let records = self.series(symbol);
        let end = records.partition_point(|r| r.date <= date);
        records[..end].iter().rev().find_map(PriceRecord::close)
    }

    /// Every distinct date stored for any symbol, at or after `from`, ascending.
    pub fn dates_from(&self, from: NaiveDate) -> BTreeSet<NaiveDate> {
        self.entries
            .values()
            .flat_map(|records| {
                let start = records.partition_point(|r| r.date < from);
                records[start..].iter().map(|r| r.date)
            })
            .collect()
    }

    /// Drop a symbol's whole history; returns the number of records removed.
    pub fn remove_symbol(&mut self, symbol: &str) -> usize {
        self.entries.remove(symbol).map(|v| v.len()).unwrap_or(0)
    }
}
