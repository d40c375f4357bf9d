//! Push/REST ingestion from a JSON endpoint.
//!
//! The endpoint returns either a bare array of records or an object with a
//! `data` array.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::clock::Clock;
use crate::error::ConnectorError;
use crate::http::HttpTransport;
use crate::ingestion::record::parse_timestamp;
use crate::ingestion::{
    ConnectorKind, FetchOptions, IngestionConnector, IngestionResult, Measurement,
    ProductionRecord, RawRecord, SourceSystem, collect_records, text_field,
};

pub struct RestConnector {
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
}

impl RestConnector {
    pub fn new(transport: Arc<dyn HttpTransport>, clock: Arc<dyn Clock>) -> Self {
        Self { transport, clock }
    }
}

/// Extracts the record list from a decoded body.
fn records_of(body: Value) -> Result<Vec<Value>, ConnectorError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => match obj.remove("data") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(ConnectorError::Schema("`data` is not an array".to_string())),
        },
        _ => Err(ConnectorError::Schema(
            "expected a JSON array or an object with `data`".to_string(),
        )),
    }
}

/// Accepts JSON numbers and numeric strings; `null` reads as zero.
fn record_value(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Null => Some(0.0),
        _ => None,
    };
    v.filter(|v| v.is_finite())
}

#[async_trait]
impl IngestionConnector for RestConnector {
    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Rest
    }

    async fn fetch(&self, source: &str, options: &FetchOptions) -> Result<IngestionResult, ConnectorError> {
        info!(url = source, "pulling production records");
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        headers.extend(options.headers.iter().cloned());

        let response = self.transport.get(source, &[], &headers).await?;
        if !response.is_success() {
            return Err(ConnectorError::Upstream(format!(
                "HTTP error {} from {source}",
                response.status
            )));
        }
        let body: Value = serde_json::from_str(&response.body)
            .map_err(|e| ConnectorError::Schema(format!("invalid JSON from {source}: {e}")))?;
        let records = records_of(body)?;

        Ok(collect_records(self, records, source, self.clock.now(), |idx| {
            format!("Record {idx}: validation failed")
        }))
    }

    fn validate(&self, record: &RawRecord) -> bool {
        text_field(record, "asset_id").is_some()
            && text_field(record, "timestamp").is_some()
            && record.contains_key("value")
    }

    fn normalize(&self, record: &RawRecord) -> Option<ProductionRecord> {
        if !self.validate(record) {
            return None;
        }
        let asset_id = text_field(record, "asset_id")?;
        let timestamp = parse_timestamp(text_field(record, "timestamp")?)?;
        let value = record_value(record.get("value")?)?;

        let measurement_label = text_field(record, "measurement");
        let measurement = measurement_label
            .and_then(Measurement::from_label)
            .unwrap_or(Measurement::OilRate);
        let series_id = text_field(record, "series_id").map_or_else(
            || format!("{asset_id}-{}", measurement_label.unwrap_or("unknown")),
            str::to_string,
        );
        let quality_flags = record
            .get("quality_flags")
            .and_then(Value::as_array)
            .map(|flags| flags.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();
        let tags = record
            .get("tags")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        Some(ProductionRecord {
            asset_id: asset_id.to_string(),
            series_id,
            timestamp,
            value,
            measurement,
            unit: text_field(record, "unit").unwrap_or("bbl/d").to_string(),
            source_system: SourceSystem::RestApi,
            ingested_at: self.clock.now(),
            quality_flags,
            tags,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;
    use crate::clock::ManualClock;
    use crate::http::{FixtureTransport, HttpResponse};

    const URL: &str = "http://scada.test/production";

    fn connector(transport: Arc<FixtureTransport>) -> RestConnector {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        ));
        RestConnector::new(transport, clock)
    }

    #[tokio::test]
    async fn wrapped_data_array_is_ingested() {
        let transport = Arc::new(FixtureTransport::new());
        transport.respond(
            URL,
            HttpResponse::ok(
                json!({"data": [
                    {"asset_id": "W-9", "timestamp": "2024-05-01T00:00:00Z", "value": "41.5",
                     "measurement": "GAS_RATE", "unit": "mcf/d", "quality_flags": ["estimated"],
                     "tags": {"field": "Permian"}},
                    {"asset_id": "W-9", "value": 3},
                    "not an object"
                ]})
                .to_string(),
            ),
        );
        let rest = connector(transport);
        let result = rest.fetch(URL, &FetchOptions::default()).await.unwrap();

        assert_eq!(result.metadata.total_records, 3);
        assert_eq!(result.metadata.valid_records, 1);
        assert_eq!(result.errors, vec!["Record 1: validation failed", "Record 2: validation failed"]);
        let rec = &result.data[0];
        assert_eq!(rec.series_id, "W-9-GAS_RATE");
        assert_eq!(rec.measurement, Measurement::GasRate);
        assert_eq!(rec.value, 41.5);
        assert_eq!(rec.quality_flags, vec!["estimated".to_string()]);
        assert_eq!(rec.tags.get("field"), Some(&json!("Permian")));
        assert_eq!(result.metadata.source, URL);
    }

    #[tokio::test]
    async fn bare_array_with_defaults() {
        let transport = Arc::new(FixtureTransport::new());
        transport.respond(
            URL,
            HttpResponse::ok(json!([{"asset_id": "W-1", "timestamp": "2024-05-01", "value": 10}]).to_string()),
        );
        let result = connector(transport).fetch(URL, &FetchOptions::default()).await.unwrap();
        let rec = &result.data[0];
        assert_eq!(rec.series_id, "W-1-unknown");
        assert_eq!(rec.unit, "bbl/d");
        assert_eq!(rec.source_system, SourceSystem::RestApi);
    }

    #[tokio::test]
    async fn non_success_status_raises() {
        let transport = Arc::new(FixtureTransport::new());
        transport.respond(URL, HttpResponse { status: 502, body: String::new() });
        let result = connector(transport).fetch(URL, &FetchOptions::default()).await;
        assert!(matches!(result, Err(ConnectorError::Upstream(_))));
    }

    #[tokio::test]
    async fn malformed_top_level_raises_schema_error() {
        let transport = Arc::new(FixtureTransport::new());
        transport.respond(URL, HttpResponse::ok("42"));
        let result = connector(transport.clone()).fetch(URL, &FetchOptions::default()).await;
        assert!(matches!(result, Err(ConnectorError::Schema(_))));

        transport.respond(URL, HttpResponse::ok("{not json"));
        let result = connector(transport).fetch(URL, &FetchOptions::default()).await;
        assert!(matches!(result, Err(ConnectorError::Schema(_))));
    }

    #[test]
    fn validate_requires_identity_time_and_value() {
        let rest = connector(Arc::new(FixtureTransport::new()));
        let ok = json!({"asset_id": "A", "timestamp": "2024-01-01", "value": null});
        let missing = json!({"asset_id": "A", "timestamp": "2024-01-01"});
        assert!(rest.validate(ok.as_object().unwrap()));
        assert!(!rest.validate(missing.as_object().unwrap()));
    }
}
