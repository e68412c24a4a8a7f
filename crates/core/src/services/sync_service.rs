use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::CoreError;
use crate::models::instrument::{normalize_symbol, InstrumentType};
use crate::models::price::PriceRecord;
use crate::providers::traits::NameResolver;
use crate::services::price_service::PriceService;
use crate::storage::manager::LedgerStore;
use crate::storage::session::Session;

/// Parameters of a single instrument sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub symbol: String,
    pub instrument_type: InstrumentType,

    /// Display name to use when the instrument has none stored yet.
    /// Skips the name lookup.
    #[serde(default)]
    pub name: Option<String>,

    /// First date to request; defaults to `sync.default_start_date`
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

impl SyncRequest {
    pub fn new(symbol: impl Into<String>, instrument_type: InstrumentType) -> Self {
        Self {
            symbol: symbol.into(),
            instrument_type,
            name: None,
            start_date: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn starting(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }
}

/// Outcome of a successful sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub symbol: String,
    pub name: String,
    pub instrument_type: InstrumentType,

    /// Source whose data was stored
    pub source: String,

    /// Full stored history of the instrument after this sync, ascending by date
    pub price_series: Vec<PriceRecord>,

    /// Rows the winning source returned that failed validation
    pub dropped: usize,
}

/// Drives one sync: name resolution, price fetch, then a single committed write.
///
/// Nothing is written unless both the name and the price history were obtained.
pub struct SyncService {
    price_service: PriceService,
    name_resolver: Box<dyn NameResolver>,
    default_start_date: NaiveDate,
}

impl SyncService {
    pub fn new(
        price_service: PriceService,
        name_resolver: Box<dyn NameResolver>,
        default_start_date: NaiveDate,
    ) -> Self {
        Self {
            price_service,
            name_resolver,
            default_start_date,
        }
    }

    pub fn price_service(&self) -> &PriceService {
        &self.price_service
    }

    pub async fn sync(
        &self,
        store: &dyn LedgerStore,
        request: SyncRequest,
    ) -> Result<SyncReport, CoreError> {
        let symbol = normalize_symbol(&request.symbol);
        if symbol.is_empty() {
            return Err(CoreError::ValidationError(
                "Sync symbol must not be empty".into(),
            ));
        }
        let instrument_type = request.instrument_type;
        let start = request.start_date.unwrap_or(self.default_start_date);

        let stored_name = {
            let session = Session::open(store)?;
            session
                .ledger()
                .instrument(&symbol)
                .filter(|i| i.has_name())
                .map(|i| i.name.clone())
        };

        let name = match stored_name {
            Some(name) => name,
            None => self
                .resolve_name(&symbol, instrument_type, request.name)
                .await?,
        };

        let history = self
            .price_service
            .fetch_history(&symbol, instrument_type, start)
            .await?;

        let mut session = Session::open_for_write(store)?;
        let ledger = session.ledger_mut();

        let instrument = ledger.ensure_instrument(&symbol, instrument_type);
        instrument.instrument_type = instrument_type;
        if !instrument.has_name() {
            instrument.name = name.clone();
        }
        let name = instrument.name.clone();

        let written = ledger.prices.upsert_all(&symbol, history.records);
        let price_series = ledger.prices.series(&symbol).to_vec();
        session.commit()?;

        info!(
            symbol = %symbol,
            source = %history.source,
            records = written,
            dropped = history.dropped,
            "Sync committed"
        );

        Ok(SyncReport {
            symbol,
            name,
            instrument_type,
            source: history.source,
            price_series,
            dropped: history.dropped,
        })
    }

    /// Caller-supplied name first, then the resolver. Any failure aborts the sync.
    async fn resolve_name(
        &self,
        symbol: &str,
        instrument_type: InstrumentType,
        supplied: Option<String>,
    ) -> Result<String, CoreError> {
        if let Some(name) = supplied.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
            return Ok(name);
        }

        match self.name_resolver.resolve_name(symbol, instrument_type).await {
            Ok(Some(name)) if !name.trim().is_empty() => Ok(name.trim().to_string()),
            Ok(_) => {
                warn!(symbol, resolver = self.name_resolver.name(), "No display name found");
                Err(CoreError::NameResolutionFailed(symbol.to_string()))
            }
            Err(e) => {
                warn!(symbol, resolver = self.name_resolver.name(), error = %e, "Name lookup failed");
                Err(CoreError::NameResolutionFailed(symbol.to_string()))
            }
        }
    }
}
