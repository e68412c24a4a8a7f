use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use crate::errors::CoreError;
use crate::models::chart::{EquityPoint, InstrumentChart, TradeMarker};
use crate::models::instrument::normalize_symbol;
use crate::models::ledger::Ledger;
use crate::models::settings::ValuationSettings;
use crate::models::transaction::Transaction;
use crate::models::valuation::{Allocation, AllocationItem};
use crate::services::portfolio_service::PortfolioService;

/// Values holdings against stored prices: allocation snapshot, equity curve,
/// and per-instrument chart data.
///
/// Nothing here fails on missing prices. A position without any usable price
/// contributes zero, so analytics always return a result.
pub struct ValuationService {
    portfolio_service: PortfolioService,
    include_trade_dates: bool,
}

impl ValuationService {
    pub fn new(settings: &ValuationSettings) -> Self {
        Self {
            portfolio_service: PortfolioService::new(),
            include_trade_dates: settings.include_trade_dates,
        }
    }

    /// Current allocation across open long positions.
    ///
    /// Each position is valued at the latest stored raw close (0 without history).
    /// Unnamed instruments count towards `total_value` but are left out of `items`.
    pub fn allocation(&self, ledger: &Ledger, today: NaiveDate) -> Allocation {
        let holdings = self
            .portfolio_service
            .current_holdings(&ledger.transactions, today);
        if holdings.is_empty() {
            return Allocation::default();
        }

        let mut items = Vec::new();
        let mut total_value = 0.0;

        for (symbol, quantity) in holdings {
            let price = ledger.prices.latest_close(&symbol).unwrap_or(0.0);
            let value = quantity * price;
            total_value += value;

            let Some(instrument) = ledger.instrument(&symbol).filter(|i| i.has_name()) else {
                continue;
            };

            items.push(AllocationItem {
                symbol,
                name: instrument.name.clone(),
                quantity,
                price,
                value,
                percentage: 0.0, // filled below
            });
        }

        for item in &mut items {
            item.percentage = if total_value > 0.0 {
                item.value / total_value * 100.0
            } else {
                0.0
            };
        }
        items.sort_by(|a, b| {
            b.value
                .total_cmp(&a.value)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });

        Allocation { items, total_value }
    }

    /// Daily market value of the portfolio from the first trade onwards.
    ///
    /// The axis is every stored price date on or after the first trade (plus
    /// the trade dates themselves when configured). Holdings advance
    /// incrementally: before valuing a date, every trade dated on or before it
    /// is applied. Each open position is priced at the close on that date, or
    /// the last earlier close.
    ///
    /// Runs in O(dates × open positions × log prices) instead of replaying the
    /// whole log per date.
    pub fn equity_curve(&self, ledger: &Ledger) -> Vec<EquityPoint> {
        let mut ordered: Vec<&Transaction> = ledger.transactions.iter().collect();
        ordered.sort_by_key(|t| t.date);

        let Some(first_date) = ordered.first().map(|t| t.date) else {
            return Vec::new();
        };

        let mut axis: BTreeSet<NaiveDate> = ledger.prices.dates_from(first_date);
        if self.include_trade_dates {
            axis.extend(ordered.iter().map(|t| t.date));
        }

        let mut running: BTreeMap<&str, f64> = BTreeMap::new();
        let mut next_tx = 0;
        let mut curve = Vec::with_capacity(axis.len());

        for date in axis {
            while let Some(tx) = ordered.get(next_tx).filter(|t| t.date <= date) {
                *running.entry(tx.symbol.as_str()).or_insert(0.0) += tx.signed_quantity();
                next_tx += 1;
            }

            let value: f64 = running
                .iter()
                .filter(|(_, quantity)| **quantity != 0.0)
                .map(|(symbol, quantity)| {
                    let price = ledger.prices.close_on_or_before(symbol, date).unwrap_or(0.0);
                    quantity * price
                })
                .sum();

            curve.push(EquityPoint { date, value });
        }

        curve
    }

    /// Full price history of one instrument with its trades as markers.
    pub fn instrument_chart(&self, ledger: &Ledger, symbol: &str) -> Result<InstrumentChart, CoreError> {
        let symbol = normalize_symbol(symbol);
        let instrument = ledger
            .instrument(&symbol)
            .ok_or_else(|| CoreError::instrument_not_found(&symbol))?;

        let mut markers: Vec<TradeMarker> = ledger
            .transactions_for(&symbol)
            .map(|t| TradeMarker {
                date: t.date,
                side: t.side,
                quantity: t.quantity,
                price: t.price,
                label: format!("{} {}", t.side, t.quantity),
            })
            .collect();
        markers.sort_by_key(|m| m.date);

        Ok(InstrumentChart {
            symbol: instrument.symbol.clone(),
            name: instrument.name.clone(),
            instrument_type: instrument.instrument_type,
            prices: ledger.prices.series(&symbol).to_vec(),
            markers,
        })
    }
}

impl Default for ValuationService {
    fn default() -> Self {
        Self::new(&ValuationSettings::default())
    }
}
