use chrono::NaiveDate;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::instrument::{normalize_symbol, InstrumentType};
use crate::models::ledger::Ledger;
use crate::models::transaction::{AddOutcome, NewTransaction, Transaction, TransactionPatch};

/// Manages the transaction log and reconstructs holdings from it.
///
/// Pure business logic: no I/O, no API calls.
pub struct PortfolioService;

impl PortfolioService {
    pub fn new() -> Self {
        Self
    }

    /// Add a transaction unless an identical trade (same symbol, date, side,
    /// quantity, price and fees) is already in the ledger.
    ///
    /// The referenced instrument is created, unnamed, if it does not exist yet.
    pub fn add_transaction(
        &self,
        ledger: &mut Ledger,
        mut draft: NewTransaction,
    ) -> Result<AddOutcome, CoreError> {
        draft.symbol = normalize_symbol(&draft.symbol);
        Self::validate_fields(&draft.symbol, draft.quantity, draft.price, draft.fees)?;

        if let Some(existing) = ledger.transactions.iter().find(|t| t.same_trade_as(&draft)) {
            return Ok(AddOutcome::Duplicate(existing.id));
        }

        ledger.ensure_instrument(&draft.symbol, InstrumentType::Stock);
        let id = Uuid::new_v4();
        ledger.insert_transaction(draft.into_transaction(id));
        Ok(AddOutcome::Created(id))
    }

    /// Apply a partial update. The result is validated before it replaces the stored trade.
    pub fn update_transaction(
        &self,
        ledger: &mut Ledger,
        id: Uuid,
        patch: TransactionPatch,
    ) -> Result<Transaction, CoreError> {
        let current = ledger
            .transaction(id)
            .cloned()
            .ok_or_else(|| CoreError::transaction_not_found(id))?;

        let mut updated = current.clone();
        if let Some(symbol) = patch.symbol {
            updated.symbol = normalize_symbol(&symbol);
        }
        if let Some(date) = patch.date {
            updated.date = date;
        }
        if let Some(side) = patch.side {
            updated.side = side;
        }
        if let Some(quantity) = patch.quantity {
            updated.quantity = quantity;
        }
        if let Some(price) = patch.price {
            updated.price = price;
        }
        if let Some(fees) = patch.fees {
            updated.fees = fees;
        }
        if let Some(notes) = patch.notes {
            updated.notes = notes;
        }

        Self::validate_fields(&updated.symbol, updated.quantity, updated.price, updated.fees)?;
        ledger.ensure_instrument(&updated.symbol, InstrumentType::Stock);

        if updated.date == current.date {
            if let Some(slot) = ledger.transactions.iter_mut().find(|t| t.id == id) {
                *slot = updated.clone();
            }
        } else {
            // Re-position so the log stays date-ordered
            ledger.remove_transaction(id);
            ledger.insert_transaction(updated.clone());
        }
        Ok(updated)
    }

    /// Remove a transaction by id, returning it.
    pub fn delete_transaction(&self, ledger: &mut Ledger, id: Uuid) -> Result<Transaction, CoreError> {
        ledger
            .remove_transaction(id)
            .ok_or_else(|| CoreError::transaction_not_found(id))
    }

    /// Replay `transactions` up to and including `as_of` into signed quantities per symbol.
    ///
    /// Trades are applied in date order; same-date trades keep their relative
    /// order. Sells are not bounded below, so short positions show as negative.
    pub fn holdings_as_of(&self, transactions: &[Transaction], as_of: NaiveDate) -> BTreeMap<String, f64> {
        let mut ordered: Vec<&Transaction> = transactions.iter().collect();
        // Stable: equal dates keep insertion order
        ordered.sort_by_key(|t| t.date);

        let mut holdings: BTreeMap<String, f64> = BTreeMap::new();
        for tx in ordered.into_iter().take_while(|t| t.date <= as_of) {
            *holdings.entry(tx.symbol.clone()).or_insert(0.0) += tx.signed_quantity();
        }
        holdings
    }

    /// Open long positions as of `today`: holdings with strictly positive quantity.
    pub fn current_holdings(&self, transactions: &[Transaction], today: NaiveDate) -> BTreeMap<String, f64> {
        let mut holdings = self.holdings_as_of(transactions, today);
        holdings.retain(|_, quantity| *quantity > 0.0);
        holdings
    }

    /// Field rules shared by create and update:
    /// - Symbol must be non-empty
    /// - Quantity and price must be finite and positive
    /// - Fees must be finite and non-negative
    fn validate_fields(symbol: &str, quantity: f64, price: f64, fees: f64) -> Result<(), CoreError> {
        if symbol.is_empty() {
            return Err(CoreError::ValidationError(
                "Transaction symbol must not be empty".into(),
            ));
        }
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Transaction quantity must be positive, got {quantity}"
            )));
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Transaction price must be positive, got {price}"
            )));
        }
        if !fees.is_finite() || fees < 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Transaction fees must not be negative, got {fees}"
            )));
        }
        Ok(())
    }
}

impl Default for PortfolioService {
    fn default() -> Self {
        Self::new()
    }
}
