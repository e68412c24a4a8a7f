use crate::models::instrument::InstrumentType;
use crate::models::settings::SourceSettings;

use super::eastmoney::{EastMoneyFundSource, EastMoneyStockSource};
use super::sina::SinaSource;
use super::tencent::TencentSource;
use super::traits::PriceSource;

/// Ordered registry of price sources.
///
/// Registration order is fallback priority: for a given instrument type the
/// first registered source is tried first.
pub struct SourceRegistry {
    sources: Vec<Box<dyn PriceSource>>,
}

impl SourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Registry with the default chains:
    /// stocks East Money → Tencent → Sina, funds East Money ETF.
    pub fn new_with_defaults(settings: &SourceSettings) -> Self {
        let mut registry = Self::new();

        // Raw + both adjusted series, native volume
        registry.register(Box::new(EastMoneyStockSource::new(settings)));

        // Adjusted series only, volume derived from turnover
        registry.register(Box::new(TencentSource::new(settings)));

        // Raw series only
        registry.register(Box::new(SinaSource::new(settings)));

        registry.register(Box::new(EastMoneyFundSource::new(settings)));

        registry
    }

    /// Register a new source at the lowest priority.
    pub fn register(&mut self, source: Box<dyn PriceSource>) {
        self.sources.push(source);
    }

    /// All sources for the given type, in priority order.
    pub fn get_sources_for(&self, instrument_type: InstrumentType) -> Vec<&dyn PriceSource> {
        self.sources
            .iter()
            .filter(|s| s.supported_instrument_types().contains(&instrument_type))
            .map(|s| s.as_ref())
            .collect()
    }

    pub fn has_source_for(&self, instrument_type: InstrumentType) -> bool {
        self.sources
            .iter()
            .any(|s| s.supported_instrument_types().contains(&instrument_type))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
