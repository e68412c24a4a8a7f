pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use chrono::{NaiveDate, Utc};
use models::{
    chart::{EquityPoint, InstrumentChart},
    instrument::{normalize_symbol, DeletedInstrument, Instrument, InstrumentType},
    settings::Settings,
    transaction::{AddOutcome, NewTransaction, Transaction, TransactionPatch},
    valuation::Allocation,
};
use providers::{eastmoney::EastMoneyNameResolver, registry::SourceRegistry, traits::NameResolver};
use services::{
    import_service::{ImportReport, ImportService},
    portfolio_service::PortfolioService,
    price_service::PriceService,
    sync_service::{SyncReport, SyncRequest, SyncService},
    valuation_service::ValuationService,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use storage::{
    manager::{FileStore, LedgerStore, MemoryStore},
    session::Session,
};
use tracing::info;
use uuid::Uuid;

use errors::CoreError;

/// Main entry point for the tradewise core library.
///
/// Holds the ledger store and the services operating on it. Every operation
/// opens its own storage session: reads see the latest committed ledger, and
/// a mutation is either committed whole or not at all.
#[must_use]
pub struct PortfolioTracker {
    store: Box<dyn LedgerStore>,
    settings: Settings,
    sync_service: SyncService,
    portfolio_service: PortfolioService,
    valuation_service: ValuationService,
    import_service: ImportService,
}

impl std::fmt::Debug for PortfolioTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioTracker")
            .field("settings", &self.settings)
            .field(
                "stock_sources",
                &self
                    .sync_service
                    .price_service()
                    .get_source_names(InstrumentType::Stock),
            )
            .finish()
    }
}

impl PortfolioTracker {
    /// Tracker over `store` with the default price sources and name lookup.
    pub fn new(store: Box<dyn LedgerStore>, settings: Settings) -> Result<Self, CoreError> {
        let registry = SourceRegistry::new_with_defaults(&settings.sources);
        let resolver = Box::new(EastMoneyNameResolver::new(&settings.sources));
        Self::with_components(store, settings, registry, resolver)
    }

    /// Ephemeral tracker with default settings; nothing outlives the process.
    pub fn in_memory() -> Self {
        let settings = Settings::default();
        let registry = SourceRegistry::new_with_defaults(&settings.sources);
        let resolver = Box::new(EastMoneyNameResolver::new(&settings.sources));
        Self::build(Box::new(MemoryStore::new()), settings, registry, resolver)
    }

    /// Tracker persisted to a snapshot file. The file is created on first commit.
    pub fn open_file(path: impl Into<PathBuf>, settings: Settings) -> Result<Self, CoreError> {
        let store = FileStore::new(path);
        // Fail early on a corrupt or foreign file
        store.load()?;
        Self::new(Box::new(store), settings)
    }

    /// Tracker with explicit collaborators. Used to plug in custom sources.
    pub fn with_components(
        store: Box<dyn LedgerStore>,
        settings: Settings,
        registry: SourceRegistry,
        name_resolver: Box<dyn NameResolver>,
    ) -> Result<Self, CoreError> {
        settings.validate()?;
        Ok(Self::build(store, settings, registry, name_resolver))
    }

    fn build(
        store: Box<dyn LedgerStore>,
        settings: Settings,
        registry: SourceRegistry,
        name_resolver: Box<dyn NameResolver>,
    ) -> Self {
        let sync_service = SyncService::new(
            PriceService::new(registry),
            name_resolver,
            settings.sync.default_start_date,
        );
        let valuation_service = ValuationService::new(&settings.valuation);
        Self {
            store,
            settings,
            sync_service,
            portfolio_service: PortfolioService::new(),
            valuation_service,
            import_service: ImportService::new(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn session(&self) -> Result<Session<'_>, CoreError> {
        Session::open(self.store.as_ref())
    }

    /// Serialized with every other mutation on this store.
    fn write_session(&self) -> Result<Session<'_>, CoreError> {
        Session::open_for_write(self.store.as_ref())
    }

    // ── Instruments ─────────────────────────────────────────────────

    /// All known instruments, ordered by symbol.
    pub fn list_instruments(&self) -> Result<Vec<Instrument>, CoreError> {
        let session = self.session()?;
        Ok(session.ledger().instruments.values().cloned().collect())
    }

    pub fn get_instrument(&self, symbol: &str) -> Result<Instrument, CoreError> {
        let symbol = normalize_symbol(symbol);
        let session = self.session()?;
        session
            .ledger()
            .instrument(&symbol)
            .cloned()
            .ok_or_else(|| CoreError::instrument_not_found(symbol))
    }

    /// Remove an instrument together with its price history and its transactions.
    pub fn delete_instrument(&self, symbol: &str) -> Result<DeletedInstrument, CoreError> {
        let symbol = normalize_symbol(symbol);
        let mut session = self.write_session()?;
        if session.ledger().instrument(&symbol).is_none() {
            return Err(CoreError::instrument_not_found(symbol));
        }

        let ledger = session.ledger_mut();
        ledger.instruments.remove(&symbol);
        let prices_removed = ledger.prices.remove_symbol(&symbol);
        let before = ledger.transactions.len();
        ledger.transactions.retain(|t| t.symbol != symbol);
        let transactions_removed = before - ledger.transactions.len();
        session.commit()?;

        info!(
            symbol = %symbol,
            prices_removed,
            transactions_removed,
            "Instrument deleted"
        );
        Ok(DeletedInstrument {
            symbol,
            prices_removed,
            transactions_removed,
        })
    }

    // ── Sync ────────────────────────────────────────────────────────

    /// Fetch and store the price history of an instrument from the
    /// configured default start date.
    pub async fn sync_instrument(
        &self,
        symbol: &str,
        instrument_type: InstrumentType,
    ) -> Result<SyncReport, CoreError> {
        self.sync_instrument_with(SyncRequest::new(symbol, instrument_type))
            .await
    }

    /// Sync with an explicit start date and/or display name.
    pub async fn sync_instrument_with(&self, request: SyncRequest) -> Result<SyncReport, CoreError> {
        self.sync_service.sync(self.store.as_ref(), request).await
    }

    /// Names of the price sources for an instrument type, in fallback order.
    #[must_use]
    pub fn source_names(&self, instrument_type: InstrumentType) -> Vec<String> {
        self.sync_service
            .price_service()
            .get_source_names(instrument_type)
    }

    // ── Transactions ────────────────────────────────────────────────

    /// Record a trade. An exact duplicate of a stored trade is not inserted
    /// and reported as [`AddOutcome::Duplicate`].
    pub fn add_transaction(&self, draft: NewTransaction) -> Result<AddOutcome, CoreError> {
        let mut session = self.write_session()?;
        let outcome = self
            .portfolio_service
            .add_transaction(session.ledger_mut(), draft)?;
        if outcome.is_created() {
            session.commit()?;
        }
        Ok(outcome)
    }

    pub fn update_transaction(&self, id: Uuid, patch: TransactionPatch) -> Result<Transaction, CoreError> {
        let mut session = self.write_session()?;
        let updated = self
            .portfolio_service
            .update_transaction(session.ledger_mut(), id, patch)?;
        session.commit()?;
        Ok(updated)
    }

    pub fn delete_transaction(&self, id: Uuid) -> Result<Transaction, CoreError> {
        let mut session = self.write_session()?;
        let removed = self
            .portfolio_service
            .delete_transaction(session.ledger_mut(), id)?;
        session.commit()?;
        Ok(removed)
    }

    pub fn get_transaction(&self, id: Uuid) -> Result<Transaction, CoreError> {
        let session = self.session()?;
        session
            .ledger()
            .transaction(id)
            .cloned()
            .ok_or_else(|| CoreError::transaction_not_found(id))
    }

    /// All trades, oldest first.
    pub fn list_transactions(&self) -> Result<Vec<Transaction>, CoreError> {
        let session = self.session()?;
        Ok(session.ledger().transactions.clone())
    }

    // ── Import ──────────────────────────────────────────────────────

    /// Import already-parsed rows. Any invalid row aborts the whole import;
    /// the error carries the row's 1-based position in `rows`.
    pub fn import_transactions(&self, rows: Vec<NewTransaction>) -> Result<ImportReport, CoreError> {
        let mut session = self.write_session()?;
        let report = self
            .import_service
            .import_rows(session.ledger_mut(), rows)?;
        session.commit()?;
        Ok(report)
    }

    /// Parse and import a CSV document (`date,symbol,type,quantity,price[,fees][,notes]`).
    /// Errors carry the line number in the document (header is line 1).
    pub fn import_csv<R: std::io::Read>(&self, reader: R) -> Result<ImportReport, CoreError> {
        let rows = self.import_service.parse_csv(reader)?;
        let mut session = self.write_session()?;
        let report = self
            .import_service
            .import_parsed(session.ledger_mut(), rows)?;
        session.commit()?;
        Ok(report)
    }

    // ── Holdings & Valuation ────────────────────────────────────────

    /// Signed quantity per symbol after every trade dated on or before `as_of`.
    pub fn holdings_as_of(&self, as_of: NaiveDate) -> Result<BTreeMap<String, f64>, CoreError> {
        let session = self.session()?;
        Ok(self
            .portfolio_service
            .holdings_as_of(&session.ledger().transactions, as_of))
    }

    /// Open long positions as of today.
    pub fn current_holdings(&self) -> Result<BTreeMap<String, f64>, CoreError> {
        let session = self.session()?;
        Ok(self
            .portfolio_service
            .current_holdings(&session.ledger().transactions, today()))
    }

    /// Allocation of open positions as of today.
    pub fn allocation(&self) -> Result<Allocation, CoreError> {
        self.allocation_as_of(today())
    }

    pub fn allocation_as_of(&self, today: NaiveDate) -> Result<Allocation, CoreError> {
        let session = self.session()?;
        Ok(self.valuation_service.allocation(session.ledger(), today))
    }

    pub fn equity_curve(&self) -> Result<Vec<EquityPoint>, CoreError> {
        let session = self.session()?;
        Ok(self.valuation_service.equity_curve(session.ledger()))
    }

    pub fn instrument_chart(&self, symbol: &str) -> Result<InstrumentChart, CoreError> {
        let session = self.session()?;
        self.valuation_service
            .instrument_chart(session.ledger(), symbol)
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
