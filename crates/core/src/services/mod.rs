pub mod import_service;
pub mod portfolio_service;
pub mod price_service;
pub mod sync_service;
pub mod valuation_service;
