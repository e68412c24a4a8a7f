// ═══════════════════════════════════════════════════════════════════
// Source Tests — HTTP adapters against wiremock servers
// ═══════════════════════════════════════════════════════════════════

use chrono::NaiveDate;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tradewise_core::errors::CoreError;
use tradewise_core::models::instrument::InstrumentType;
use tradewise_core::models::settings::SourceSettings;
use tradewise_core::providers::eastmoney::{
    EastMoneyFundSource, EastMoneyNameResolver, EastMoneyStockSource,
};
use tradewise_core::providers::sina::SinaSource;
use tradewise_core::providers::tencent::TencentSource;
use tradewise_core::providers::traits::{NameResolver, PriceSource};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn settings() -> SourceSettings {
    SourceSettings {
        timeout_secs: 5,
        ..SourceSettings::default()
    }
}

fn json(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

async fn mount_kline(server: &MockServer, fqt: &str, klines: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/kline"))
        .and(query_param("fqt", fqt))
        .respond_with(json(serde_json::json!({
            "rc": 0,
            "data": { "code": "600519", "klines": klines }
        })))
        .mount(server)
        .await;
}

// ═══════════════════════════════════════════════════════════════════
// East Money
// ═══════════════════════════════════════════════════════════════════

mod eastmoney {
    use super::*;

    #[tokio::test]
    async fn joins_three_series_on_date() {
        let server = MockServer::start().await;
        mount_kline(
            &server,
            "0",
            &[
                "2024-01-02,100.0,101.0,102.0,99.0,3000,303000.0",
                "2024-01-03,101.0,103.0,104.0,100.0,4000,412000.0",
            ],
        )
        .await;
        mount_kline(
            &server,
            "1",
            &[
                "2024-01-02,95.0,96.0,97.0,94.0,3000,303000.0",
                "2024-01-03,96.0,98.0,99.0,95.0,4000,412000.0",
            ],
        )
        .await;
        // Back-adjusted series has an extra trailing day
        mount_kline(
            &server,
            "2",
            &[
                "2024-01-02,900.0,910.0,920.0,890.0,3000,303000.0",
                "2024-01-03,910.0,930.0,940.0,900.0,4000,412000.0",
                "2024-01-04,930.0,940.0,950.0,920.0,5000,470000.0",
            ],
        )
        .await;

        let source = EastMoneyStockSource::new(&settings())
            .with_base_url(format!("{}/kline", server.uri()));
        let records = source.fetch("600519", d(2024, 1, 1)).await.unwrap();

        assert_eq!(records.len(), 3);
        let first = &records[0];
        assert_eq!(first.date, d(2024, 1, 2));
        assert_eq!(first.raw.open, Some(100.0));
        assert_eq!(first.raw.close, Some(101.0));
        assert_eq!(first.raw.high, Some(102.0));
        assert_eq!(first.raw.low, Some(99.0));
        assert_eq!(first.qfq.close, Some(96.0));
        assert_eq!(first.hfq.close, Some(910.0));
        assert_eq!(first.volume, Some(3000.0));

        let last = &records[2];
        assert!(last.raw.is_empty());
        assert_eq!(last.hfq.close, Some(940.0));
        assert_eq!(last.volume, None);
    }

    #[tokio::test]
    async fn empty_sub_series_fails_the_source() {
        let server = MockServer::start().await;
        mount_kline(&server, "0", &["2024-01-02,100.0,101.0,102.0,99.0,3000,303000.0"]).await;
        mount_kline(&server, "1", &[]).await;
        mount_kline(&server, "2", &["2024-01-02,900.0,910.0,920.0,890.0,3000,303000.0"]).await;

        let source = EastMoneyStockSource::new(&settings())
            .with_base_url(format!("{}/kline", server.uri()));
        let err = source.fetch("600519", d(2024, 1, 1)).await.unwrap_err();
        assert!(matches!(err, CoreError::Api { ref message, .. } if message.contains("qfq")));
    }

    #[tokio::test]
    async fn null_data_fails_the_source() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kline"))
            .respond_with(json(serde_json::json!({ "rc": 0, "data": null })))
            .mount(&server)
            .await;

        let source = EastMoneyStockSource::new(&settings())
            .with_base_url(format!("{}/kline", server.uri()));
        assert!(source.fetch("600519", d(2024, 1, 1)).await.is_err());
    }

    #[tokio::test]
    async fn http_error_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kline"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = EastMoneyStockSource::new(&settings())
            .with_base_url(format!("{}/kline", server.uri()));
        let err = source.fetch("600519", d(2024, 1, 1)).await.unwrap_err();
        assert!(matches!(err, CoreError::Network(_)));
    }

    #[tokio::test]
    async fn fund_source_takes_volume_from_qfq() {
        let server = MockServer::start().await;
        mount_kline(&server, "0", &["2024-01-02,4.0,4.1,4.2,3.9,100,41000.0"]).await;
        mount_kline(&server, "1", &["2024-01-02,3.8,3.9,4.0,3.7,250,97500.0"]).await;
        mount_kline(&server, "2", &["2024-01-02,5.0,5.1,5.2,4.9,100,51000.0"]).await;

        let source = EastMoneyFundSource::new(&settings())
            .with_base_url(format!("{}/kline", server.uri()));
        assert_eq!(source.supported_instrument_types(), vec![InstrumentType::Fund]);

        let records = source.fetch("510300", d(2024, 1, 1)).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].volume, Some(250.0));
        assert_eq!(records[0].raw.close, Some(4.1));
    }

    #[tokio::test]
    async fn name_resolver_reads_short_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .and(query_param("secid", "1.600519"))
            .respond_with(json(serde_json::json!({
                "rc": 0,
                "data": { "f57": "600519", "f58": "贵州茅台" }
            })))
            .mount(&server)
            .await;

        let resolver = EastMoneyNameResolver::new(&settings())
            .with_base_url(format!("{}/quote", server.uri()));
        let name = resolver
            .resolve_name("600519", InstrumentType::Stock)
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("贵州茅台"));
    }

    #[tokio::test]
    async fn name_resolver_unknown_symbol_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(json(serde_json::json!({ "rc": 100, "data": null })))
            .mount(&server)
            .await;

        let resolver = EastMoneyNameResolver::new(&settings())
            .with_base_url(format!("{}/quote", server.uri()));
        let name = resolver
            .resolve_name("999999", InstrumentType::Stock)
            .await
            .unwrap();
        assert!(name.is_none());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Tencent
// ═══════════════════════════════════════════════════════════════════

mod tencent {
    use super::*;

    async fn mount(server: &MockServer, mode: &str, key: &str, rows: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/fqkline"))
            .and(query_param(
                "param",
                format!("sh600519,day,2024-01-01,2050-12-31,10000,{mode}"),
            ))
            .respond_with(json(serde_json::json!({
                "code": 0,
                "msg": "",
                "data": {
                    "sh600519": {
                        key: rows,
                        "qt": {},
                        "prec": "1670.00",
                        "version": "14"
                    }
                }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn raw_copied_from_qfq_and_volume_derived() {
        let server = MockServer::start().await;
        mount(
            &server,
            "qfq",
            "qfqday",
            serde_json::json!([
                ["2024-01-02", "10.00", "20.00", "21.00", "9.50", "1000000.00"],
                ["2024-01-03", "20.00", "25.00", "26.00", "19.00", "500000.00"]
            ]),
        )
        .await;
        mount(
            &server,
            "hfq",
            "hfqday",
            serde_json::json!([
                ["2024-01-02", "100.00", "200.00", "210.00", "95.00", "1000000.00"],
                ["2024-01-03", "200.00", "250.00", "260.00", "190.00", "500000.00"]
            ]),
        )
        .await;

        let source = TencentSource::new(&settings())
            .with_base_url(format!("{}/fqkline", server.uri()));
        let records = source.fetch("600519", d(2024, 1, 1)).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].raw, records[0].qfq);
        assert_eq!(records[0].raw.close, Some(20.0));
        assert_eq!(records[0].hfq.close, Some(200.0));
        // 1_000_000 / 20 / 100
        assert_eq!(records[0].volume, Some(500.0));
        // 500_000 / 25 / 100
        assert_eq!(records[1].volume, Some(200.0));
    }

    #[tokio::test]
    async fn missing_hfq_fails_the_source() {
        let server = MockServer::start().await;
        mount(
            &server,
            "qfq",
            "qfqday",
            serde_json::json!([["2024-01-02", "10.00", "20.00", "21.00", "9.50", "1000000.00"]]),
        )
        .await;
        mount(&server, "hfq", "hfqday", serde_json::json!([])).await;

        let source = TencentSource::new(&settings())
            .with_base_url(format!("{}/fqkline", server.uri()));
        let err = source.fetch("600519", d(2024, 1, 1)).await.unwrap_err();
        assert!(matches!(err, CoreError::Api { ref provider, .. } if provider == "Tencent"));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Sina
// ═══════════════════════════════════════════════════════════════════

mod sina {
    use super::*;

    #[tokio::test]
    async fn adjusted_series_copied_from_raw() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kline"))
            .and(query_param("symbol", "sz000001"))
            .respond_with(json(serde_json::json!([
                { "day": "2023-12-29", "open": "9.30", "high": "9.40", "low": "9.20", "close": "9.39", "volume": "100" },
                { "day": "2024-01-02", "open": "9.39", "high": "9.42", "low": "9.21", "close": "9.21", "volume": "115800000" },
                { "day": "2024-01-03", "open": "9.19", "high": "9.22", "low": "9.15", "close": "9.20" }
            ])))
            .mount(&server)
            .await;

        let source = SinaSource::new(&settings()).with_base_url(format!("{}/kline", server.uri()));
        let records = source.fetch("000001", d(2024, 1, 1)).await.unwrap();

        // Rows before the start date are dropped
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, d(2024, 1, 2));
        assert_eq!(records[0].raw.close, Some(9.21));
        assert_eq!(records[0].qfq, records[0].raw);
        assert_eq!(records[0].hfq, records[0].raw);
        assert_eq!(records[0].volume, Some(115_800_000.0));
        assert_eq!(records[1].volume, Some(0.0));
    }

    #[tokio::test]
    async fn null_body_fails_the_source() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kline"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("null", "application/json"))
            .mount(&server)
            .await;

        let source = SinaSource::new(&settings()).with_base_url(format!("{}/kline", server.uri()));
        let err = source.fetch("000001", d(2024, 1, 1)).await.unwrap_err();
        assert!(matches!(err, CoreError::Api { ref provider, .. } if provider == "Sina"));
    }
}
