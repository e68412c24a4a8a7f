pub mod chart;
pub mod instrument;
pub mod ledger;
pub mod price;
pub mod settings;
pub mod transaction;
pub mod valuation;
