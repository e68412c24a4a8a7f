use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::io::Read;
use tracing::{debug, info};

use crate::errors::CoreError;
use crate::models::instrument::normalize_symbol;
use crate::models::ledger::Ledger;
use crate::models::transaction::{NewTransaction, Side};
use crate::services::portfolio_service::PortfolioService;

/// Summary of a bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub total_rows: usize,
    pub imported: usize,
    pub skipped_duplicates: usize,
}

/// One parsed data row and the line it came from (header is line 1).
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    pub line: usize,
    pub transaction: NewTransaction,
}

/// Column positions resolved from the header row.
#[derive(Debug)]
struct Columns {
    date: usize,
    symbol: usize,
    side: usize,
    quantity: usize,
    price: usize,
    fees: Option<usize>,
    notes: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, CoreError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| CoreError::Import {
                row: 1,
                message: format!("missing required column {name:?}"),
            })
        };

        Ok(Self {
            date: require("date")?,
            symbol: require("symbol")?,
            side: require("type")?,
            quantity: require("quantity")?,
            price: require("price")?,
            fees: find("fees"),
            notes: find("notes"),
        })
    }
}

/// Bulk transaction import.
///
/// Accepts the canonical layout `date,symbol,type,quantity,price[,fees][,notes]`
/// with a header row. Rows go through the same creation path as manual entry,
/// so an exact duplicate of a stored trade is counted and skipped.
pub struct ImportService {
    portfolio_service: PortfolioService,
}

impl ImportService {
    pub fn new() -> Self {
        Self {
            portfolio_service: PortfolioService::new(),
        }
    }

    /// Parse a CSV document into transaction drafts.
    /// The first malformed row fails the whole parse.
    pub fn parse_csv<R: Read>(&self, reader: R) -> Result<Vec<CsvRow>, CoreError> {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let columns = Columns::from_headers(&headers)?;
        debug!(?columns, "Resolved import columns");

        let mut drafts = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            // Header is row 1
            let line = idx + 2;
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            drafts.push(CsvRow {
                line,
                transaction: parse_row(&record, &columns, line)?,
            });
        }
        Ok(drafts)
    }

    /// Insert drafts into the ledger, skipping exact duplicates.
    ///
    /// Duplicates are checked against the ledger as it grows, so a row repeated
    /// within one file is imported once. Errors carry the 1-based position
    /// of the draft in `rows`.
    pub fn import_rows(
        &self,
        ledger: &mut Ledger,
        rows: Vec<NewTransaction>,
    ) -> Result<ImportReport, CoreError> {
        let numbered = rows.into_iter().enumerate().map(|(idx, draft)| (idx + 1, draft));
        self.import_numbered(ledger, numbered)
    }

    /// Like [`import_rows`](Self::import_rows), reporting errors by CSV line.
    pub fn import_parsed(&self, ledger: &mut Ledger, rows: Vec<CsvRow>) -> Result<ImportReport, CoreError> {
        let numbered = rows.into_iter().map(|row| (row.line, row.transaction));
        self.import_numbered(ledger, numbered)
    }

    fn import_numbered(
        &self,
        ledger: &mut Ledger,
        rows: impl ExactSizeIterator<Item = (usize, NewTransaction)>,
    ) -> Result<ImportReport, CoreError> {
        let mut report = ImportReport {
            total_rows: rows.len(),
            ..ImportReport::default()
        };

        for (row, draft) in rows {
            let outcome = self
                .portfolio_service
                .add_transaction(ledger, draft)
                .map_err(|e| CoreError::Import {
                    row,
                    message: e.to_string(),
                })?;
            if outcome.is_created() {
                report.imported += 1;
            } else {
                report.skipped_duplicates += 1;
            }
        }

        info!(
            total = report.total_rows,
            imported = report.imported,
            skipped = report.skipped_duplicates,
            "Import finished"
        );
        Ok(report)
    }
}

impl Default for ImportService {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_row(record: &StringRecord, columns: &Columns, row: usize) -> Result<NewTransaction, CoreError> {
    let field = |idx: usize, name: &'static str| required(record, idx, name, row);
    let bad = |message: String| CoreError::Import { row, message };

    let date = parse_import_date(field(columns.date, "date")?)
        .ok_or_else(|| bad(format!("unrecognized date {:?}", record.get(columns.date).unwrap_or(""))))?;

    let symbol = normalize_symbol(field(columns.symbol, "symbol")?);

    let side = parse_side(field(columns.side, "type")?)
        .ok_or_else(|| bad(format!("unknown type {:?}", record.get(columns.side).unwrap_or(""))))?;

    let quantity = parse_amount(field(columns.quantity, "quantity")?)
        .ok_or_else(|| bad("quantity is not a number".into()))?;
    let price = parse_amount(field(columns.price, "price")?)
        .ok_or_else(|| bad("price is not a number".into()))?;

    let fees = match columns.fees.and_then(|idx| record.get(idx)).filter(|s| !s.is_empty()) {
        Some(raw) => parse_amount(raw).ok_or_else(|| bad("fees is not a number".into()))?,
        None => 0.0,
    };

    let notes = columns
        .notes
        .and_then(|idx| record.get(idx))
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(NewTransaction {
        symbol,
        date,
        side,
        quantity,
        price,
        fees,
        notes,
    })
}

fn required<'r>(record: &'r StringRecord, idx: usize, name: &str, row: usize) -> Result<&'r str, CoreError> {
    record
        .get(idx)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CoreError::Import {
            row,
            message: format!("missing {name}"),
        })
}

/// `YYYY-MM-DD`, `YYYY/MM/DD` or `YYYYMMDD`.
pub fn parse_import_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

fn parse_side(raw: &str) -> Option<Side> {
    match raw.trim() {
        "买入" | "买" => Some(Side::Buy),
        "卖出" | "卖" => Some(Side::Sell),
        other => other.parse().ok(),
    }
}

/// Plain decimal, tolerating thousands separators.
fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',' && *c != '_').collect();
    cleaned.trim().parse::<f64>().ok()
}
