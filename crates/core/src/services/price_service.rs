use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::errors::{CoreError, SourceFailure};
use crate::models::instrument::InstrumentType;
use crate::models::price::PriceRecord;
use crate::providers::registry::SourceRegistry;

/// Price history returned by the fetch pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedHistory {
    /// Name of the source whose data won
    pub source: String,

    /// Validated records, ascending by date, one per date
    pub records: Vec<PriceRecord>,

    /// Rows the winning source returned that failed validation
    pub dropped: usize,

    /// Sources tried and rejected before the winner
    pub failures: Vec<SourceFailure>,
}

/// Fetches price history from the registered sources with automatic fallback.
///
/// Sources are tried in registration order. A source fails when it errors or
/// when nothing survives validation; the first source with at least one valid
/// record wins. A failed source is never retried.
pub struct PriceService {
    registry: SourceRegistry,
}

impl PriceService {
    pub fn new(registry: SourceRegistry) -> Self {
        Self { registry }
    }

    /// Check if at least one source is available for a given instrument type.
    pub fn has_source_for(&self, instrument_type: InstrumentType) -> bool {
        self.registry.has_source_for(instrument_type)
    }

    /// Names of the sources for an instrument type, in fallback order.
    pub fn get_source_names(&self, instrument_type: InstrumentType) -> Vec<String> {
        self.registry
            .get_sources_for(instrument_type)
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    /// Daily history of `symbol` from `start`, from the first source that yields valid data.
    pub async fn fetch_history(
        &self,
        symbol: &str,
        instrument_type: InstrumentType,
        start: NaiveDate,
    ) -> Result<FetchedHistory, CoreError> {
        let sources = self.registry.get_sources_for(instrument_type);
        if sources.is_empty() {
            return Err(CoreError::NoProvider(instrument_type.to_string()));
        }

        let mut failures = Vec::new();

        for source in &sources {
            debug!(source = source.name(), symbol, %start, "Fetching price history");

            let reason = match source.fetch(symbol, start).await {
                Ok(records) => {
                    let fetched = records.len();
                    let (records, dropped) = validate_records(records);
                    if dropped > 0 {
                        warn!(
                            source = source.name(),
                            symbol,
                            dropped,
                            "Removed invalid price records (non-positive, NaN or infinite values)"
                        );
                    }
                    if !records.is_empty() {
                        info!(
                            source = source.name(),
                            symbol,
                            records = records.len(),
                            "Price history fetched"
                        );
                        return Ok(FetchedHistory {
                            source: source.name().to_string(),
                            records,
                            dropped,
                            failures,
                        });
                    }
                    if fetched == 0 {
                        "returned no records".to_string()
                    } else {
                        format!("all {fetched} records failed validation")
                    }
                }
                Err(e) => e.to_string(),
            };

            warn!(source = source.name(), symbol, %reason, "Price source failed, trying next");
            failures.push(SourceFailure {
                source: source.name().to_string(),
                reason,
            });
        }

        Err(CoreError::SourceExhausted {
            symbol: symbol.to_string(),
            failures,
        })
    }
}

/// Drop records violating the price invariants, sort by date and keep one record
/// per date (later duplicates merged into earlier ones).
/// Returns the surviving records and the number of rows dropped as invalid.
pub fn validate_records(records: Vec<PriceRecord>) -> (Vec<PriceRecord>, usize) {
    let total = records.len();
    let mut valid: Vec<PriceRecord> = records.into_iter().filter(PriceRecord::is_valid).collect();
    let dropped = total - valid.len();

    valid.sort_by_key(|r| r.date);
    let mut deduped: Vec<PriceRecord> = Vec::with_capacity(valid.len());
    for record in valid {
        match deduped.last_mut() {
            Some(last) if last.date == record.date => last.merge_from(&record),
            _ => deduped.push(record),
        }
    }
    (deduped, dropped)
}
