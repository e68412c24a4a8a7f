use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::CoreError;

/// The kind of a tracked instrument.
/// Determines which price sources are asked for its history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentType {
    /// Listed A-share equities (East Money, then Tencent, then Sina)
    Stock,
    /// Exchange-traded funds (East Money composite fund source)
    Fund,
}

impl std::fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstrumentType::Stock => write!(f, "stock"),
            InstrumentType::Fund => write!(f, "fund"),
        }
    }
}

impl FromStr for InstrumentType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stock" => Ok(InstrumentType::Stock),
            "fund" => Ok(InstrumentType::Fund),
            other => Err(CoreError::ValidationError(format!(
                "Unsupported instrument type: {other:?} (expected \"stock\" or \"fund\")"
            ))),
        }
    }
}

/// A tradable security, identified by its exchange code (e.g. "600519").
///
/// Instruments referenced by a transaction before they were ever synced are
/// created with an empty name; the name is filled in by the first successful sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Exchange code, unique across the ledger
    pub symbol: String,

    /// Display name (e.g. "贵州茅台"); empty until resolved
    pub name: String,

    pub instrument_type: InstrumentType,
}

impl Instrument {
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        instrument_type: InstrumentType,
    ) -> Self {
        Self {
            symbol: normalize_symbol(&symbol.into()),
            name: name.into(),
            instrument_type,
        }
    }

    /// Placeholder for an instrument first seen in a transaction.
    pub fn unnamed(symbol: impl Into<String>, instrument_type: InstrumentType) -> Self {
        Self::new(symbol, String::new(), instrument_type)
    }

    pub fn stock(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(symbol, name, InstrumentType::Stock)
    }

    pub fn fund(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(symbol, name, InstrumentType::Fund)
    }

    /// Whether the instrument has a usable display name.
    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// Canonical form of a symbol: trimmed, and all-digit codes left-padded to six digits
/// (spreadsheets routinely strip the leading zeros of Shenzhen codes).
pub fn normalize_symbol(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.is_empty() && trimmed.len() < 6 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        format!("{trimmed:0>6}")
    } else {
        trimmed.to_uppercase()
    }
}

/// What an instrument deletion removed along with the instrument itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedInstrument {
    pub symbol: String,
    pub prices_removed: usize,
    pub transactions_removed: usize,
}
