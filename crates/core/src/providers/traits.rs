use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::instrument::InstrumentType;
use crate::models::price::PriceRecord;

/// A market-data source for daily price history.
///
/// Each provider (East Money, Tencent, Sina, ...) implements this trait and
/// normalizes its own response format into [`PriceRecord`]s. Validation and
/// fallback between sources happen in `PriceService`, not here.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Human-readable name of this source (for logs/errors).
    fn name(&self) -> &str;

    /// Which instrument types this source can serve.
    fn supported_instrument_types(&self) -> Vec<InstrumentType>;

    /// Daily records for `symbol` from `start` onwards, in any order.
    async fn fetch(&self, symbol: &str, start: NaiveDate) -> Result<Vec<PriceRecord>, CoreError>;
}

/// Metadata lookup for an instrument's display name.
#[async_trait]
pub trait NameResolver: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` when the lookup worked but the symbol is unknown.
    async fn resolve_name(
        &self,
        symbol: &str,
        instrument_type: InstrumentType,
    ) -> Result<Option<String>, CoreError>;
}
