//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::json;

use energy_feeds::EnergyFeeds;
use energy_feeds::clock::ManualClock;
use energy_feeds::config::FeedsConfig;
use energy_feeds::http::{FixtureTransport, HttpResponse};

pub const EIA_BASE: &str = "http://eia.test/v2";
pub const EIA_PRODUCTION_URL: &str = "http://eia.test/v2/petroleum/crd/crpdn/data";
pub const EIA_RESERVES_URL: &str = "http://eia.test/v2/petroleum/crd/pres/data";
pub const CER_CSV_URL: &str = "http://cer.test/estimated-monthly-production.csv";

/// Config pointing both upstreams at fixture URLs, with an inline EIA key.
pub fn test_config() -> FeedsConfig {
    let mut config = FeedsConfig::defaults();
    config.eia.base_url = EIA_BASE.to_string();
    config.eia.api_key = Some("test-key".to_string());
    config.eia.api_key_env = "ENERGY_FEEDS_TEST_UNSET_VAR".to_string();
    config.cer.csv_url = CER_CSV_URL.to_string();
    config
}

/// Clock fixed at 2024-05-01T00:00:00Z.
pub fn test_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
    ))
}

pub fn feeds_with(config: &FeedsConfig, transport: Arc<FixtureTransport>, clock: Arc<ManualClock>) -> EnergyFeeds {
    EnergyFeeds::new(config, transport, clock)
}

/// EIA v2 response body with one `(period, value)` row per entry.
pub fn eia_body(rows: &[(&str, f64)]) -> HttpResponse {
    let data: Vec<_> = rows
        .iter()
        .map(|(period, value)| json!({"period": period, "value": value.to_string()}))
        .collect();
    HttpResponse::ok(json!({"response": {"total": data.len(), "data": data}}).to_string())
}

/// Registers a latest-production response for one state.
pub fn eia_state(transport: &FixtureTransport, code: &str, period: &str, value: f64) {
    transport.respond_when(
        EIA_PRODUCTION_URL,
        &[("facets[du][]", code)],
        eia_body(&[(period, value)]),
    );
}

/// CER CSV with the upstream header and the given data lines.
pub fn cer_csv(lines: &[&str]) -> HttpResponse {
    let mut body = String::from("Date,Unit,Region,Type,Value");
    for line in lines {
        body.push('\n');
        body.push_str(line);
    }
    HttpResponse::ok(body)
}

/// A realistic CER extract: metric and imperial rows, a `Total` roll-up and
/// bitumen sub-totals for Alberta and Saskatchewan over two months.
pub fn cer_sample() -> HttpResponse {
    cer_csv(&[
        "12/1/2023,Cubic meres per day,AB,Light,60000",
        "12/1/2023,Cubic meres per day,AB,Heavy,40000",
        "12/1/2023,Cubic meres per day,AB,Upgraded,150000",
        "12/1/2023,Cubic meres per day,AB,Non-upgraded,300000",
        "12/1/2023,Cubic meres per day,AB,In situ bitumen,280000",
        "12/1/2023,Cubic meres per day,AB,Total,550000",
        "12/1/2023,Barrels per day,AB,Light,377389",
        "1/1/2024,Cubic meres per day,AB,Light,61000",
        "1/1/2024,Cubic meres per day,AB,Heavy,41000",
        "1/1/2024,Cubic meres per day,AB,Upgraded,152000",
        "1/1/2024,Cubic meres per day,AB,Non-upgraded,301000",
        "1/1/2024,Cubic meres per day,AB,Total,555000",
        "12/1/2023,Cubic meres per day,SK,Light,30000",
        "12/1/2023,Cubic meres per day,SK,Heavy,45000",
        "1/1/2024,Cubic meres per day,SK,Light,31000",
        "1/1/2024,Cubic meres per day,SK,Heavy,44000",
        "1/1/2024,Cubic meres per day,NL,Light,38000",
    ])
}

/// Cubic metres per day to thousand barrels per day.
pub fn kbbl(cubic_metres: f64) -> f64 {
    cubic_metres * 6.28981 / 1000.0
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}
