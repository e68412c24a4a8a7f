pub mod normalize;
pub mod registry;
pub mod traits;

// Market-data source implementations
pub mod eastmoney;
pub mod sina;
pub mod tencent;

use reqwest::Client;
use std::time::Duration;

use crate::models::settings::SourceSettings;

/// HTTP client shared by the sources, with the configured per-request timeout.
pub(crate) fn http_client(settings: &SourceSettings) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()
        .unwrap_or_else(|_| Client::new())
}
