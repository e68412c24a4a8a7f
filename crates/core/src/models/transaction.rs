use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::CoreError;

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// +1 for buys, -1 for sells.
    pub fn sign(self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for Side {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(CoreError::ValidationError(format!(
                "Unknown transaction side: {other:?}"
            ))),
        }
    }
}

/// A single executed trade in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,

    /// Symbol of the traded instrument
    pub symbol: String,

    /// Trade date (daily granularity)
    pub date: NaiveDate,

    pub side: Side,

    /// Units traded (always positive; direction comes from `side`)
    pub quantity: f64,

    /// Unit price paid or received
    pub price: f64,

    /// Commissions, stamp duty and transfer fees combined
    pub fees: f64,

    pub notes: Option<String>,
}

impl Transaction {
    /// Exact-match duplicate check used by manual entry and import.
    pub fn same_trade_as(&self, draft: &NewTransaction) -> bool {
        self.symbol == draft.symbol
            && self.date == draft.date
            && self.side == draft.side
            && self.quantity == draft.quantity
            && self.price == draft.price
            && self.fees == draft.fees
    }

    /// Signed quantity: positive for buys, negative for sells.
    pub fn signed_quantity(&self) -> f64 {
        self.side.sign() * self.quantity
    }
}

/// Fields for a transaction that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub symbol: String,
    pub date: NaiveDate,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    #[serde(default)]
    pub fees: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewTransaction {
    pub fn new(
        symbol: impl Into<String>,
        date: NaiveDate,
        side: Side,
        quantity: f64,
        price: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            side,
            quantity,
            price,
            fees: 0.0,
            notes: None,
        }
    }

    pub fn buy(symbol: impl Into<String>, date: NaiveDate, quantity: f64, price: f64) -> Self {
        Self::new(symbol, date, Side::Buy, quantity, price)
    }

    pub fn sell(symbol: impl Into<String>, date: NaiveDate, quantity: f64, price: f64) -> Self {
        Self::new(symbol, date, Side::Sell, quantity, price)
    }

    pub fn with_fees(mut self, fees: f64) -> Self {
        self.fees = fees;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub(crate) fn into_transaction(self, id: Uuid) -> Transaction {
        Transaction {
            id,
            symbol: self.symbol,
            date: self.date,
            side: self.side,
            quantity: self.quantity,
            price: self.price,
            fees: self.fees,
            notes: self.notes,
        }
    }
}

/// Partial update: every `Some` field replaces the stored value.
///
/// `notes: Some(None)` clears the notes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionPatch {
    pub symbol: Option<String>,
    pub date: Option<NaiveDate>,
    pub side: Option<Side>,
    pub quantity: Option<f64>,
    pub price: Option<f64>,
    pub fees: Option<f64>,
    pub notes: Option<Option<String>>,
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Result of inserting a transaction through the dedup-checking creation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Created(Uuid),
    /// An identical trade already exists; nothing was inserted
    Duplicate(Uuid),
}

impl AddOutcome {
    pub fn id(&self) -> Uuid {
        match self {
            AddOutcome::Created(id) | AddOutcome::Duplicate(id) => *id,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, AddOutcome::Created(_))
    }
}
