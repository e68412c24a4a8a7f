use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::instrument::{Instrument, InstrumentType};
use super::price::PriceStore;
use super::transaction::Transaction;

/// The persisted data set: instrument catalog, price history and the
/// transaction log. Everything in here is written to the snapshot file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    /// Instruments keyed by symbol
    pub instruments: BTreeMap<String, Instrument>,

    /// Daily price records per instrument
    pub prices: PriceStore,

    /// Trades, kept sorted by date; same-date trades stay in insertion order.
    pub transactions: Vec<Transaction>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instrument(&self, symbol: &str) -> Option<&Instrument> {
        self.instruments.get(symbol)
    }

    /// Look up an instrument, creating an unnamed one on first reference.
    pub fn ensure_instrument(&mut self, symbol: &str, instrument_type: InstrumentType) -> &mut Instrument {
        self.instruments
            .entry(symbol.to_string())
            .or_insert_with(|| Instrument::unnamed(symbol, instrument_type))
    }

    pub fn transaction(&self, id: Uuid) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    /// Trades of one instrument, in ledger order.
    pub fn transactions_for<'a>(&'a self, symbol: &'a str) -> impl Iterator<Item = &'a Transaction> + 'a {
        self.transactions.iter().filter(move |t| t.symbol == symbol)
    }

    /// Insert keeping date order; a trade lands after existing trades on the same date.
    pub fn insert_transaction(&mut self, transaction: Transaction) {
        let pos = self
            .transactions
            .partition_point(|t| t.date <= transaction.date);
        self.transactions.insert(pos, transaction);
    }

    pub fn remove_transaction(&mut self, id: Uuid) -> Option<Transaction> {
        let idx = self.transactions.iter().position(|t| t.id == id)?;
        Some(self.transactions.remove(idx))
    }
}
