//! Batch-file ingestion of well production CSVs.
//!
//! Expected columns: `asset_id`, `date`, `value`, `measure`, and optionally
//! `unit`. Header names are matched exactly after trimming.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::error::ConnectorError;
use crate::ingestion::record::parse_timestamp;
use crate::ingestion::{
    ConnectorKind, FetchOptions, IngestionConnector, IngestionResult, Measurement,
    ProductionRecord, RawRecord, SourceSystem, collect_records, text_field,
};

pub struct CsvConnector {
    clock: Arc<dyn Clock>,
}

impl CsvConnector {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Ingests CSV `content` already in memory, labelling the result with
    /// `source`.
    pub fn ingest_str(&self, content: &str, source: &str) -> IngestionResult {
        let records = read_records(content);
        collect_records(self, records, source, self.clock.now(), |idx| {
            format!("Row {}: invalid data format", idx + 2)
        })
    }
}

/// Reads every data row as a JSON object keyed by header. Rows whose field
/// count does not match the header, or that cannot be decoded, become
/// `Value::Null` so they are counted as failures.
fn read_records(content: &str) -> Vec<Value> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = match rdr.headers() {
        Ok(h) => h.clone(),
        Err(e) => {
            warn!(error = %e, "unreadable CSV header");
            return Vec::new();
        }
    };

    rdr.records()
        .map(|record| match record {
            Ok(row) if row.len() == headers.len() => Value::Object(
                headers
                    .iter()
                    .zip(row.iter())
                    .map(|(h, v)| (h.to_string(), Value::String(v.to_string())))
                    .collect(),
            ),
            Ok(_) | Err(_) => Value::Null,
        })
        .collect()
}

#[async_trait]
impl IngestionConnector for CsvConnector {
    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Csv
    }

    async fn fetch(&self, source: &str, _options: &FetchOptions) -> Result<IngestionResult, ConnectorError> {
        info!(path = source, "reading production CSV");
        let content = tokio::fs::read_to_string(source)
            .await
            .map_err(|e| ConnectorError::Upstream(format!("cannot read {source}: {e}")))?;
        Ok(self.ingest_str(&content, source))
    }

    fn validate(&self, record: &RawRecord) -> bool {
        ["asset_id", "date", "value", "measure"]
            .iter()
            .all(|key| text_field(record, key).is_some())
    }

    fn normalize(&self, record: &RawRecord) -> Option<ProductionRecord> {
        if !self.validate(record) {
            return None;
        }
        let asset_id = text_field(record, "asset_id")?;
        let measure = text_field(record, "measure")?;
        let value = text_field(record, "value")?
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())?;
        let timestamp = parse_timestamp(text_field(record, "date")?)?;

        let measurement = Measurement::from_label(measure).unwrap_or(Measurement::OilRate);
        let unit = text_field(record, "unit").map_or_else(
            || match measurement {
                Measurement::GasRate => "mcf".to_string(),
                _ => "bbl".to_string(),
            },
            str::to_string,
        );

        Some(ProductionRecord {
            asset_id: asset_id.to_string(),
            series_id: format!("{asset_id}-{measure}"),
            timestamp,
            value,
            measurement,
            unit,
            source_system: SourceSystem::CsvUpload,
            ingested_at: self.clock.now(),
            quality_flags: Vec::new(),
            tags: Default::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::clock::ManualClock;
    use crate::ingestion::IngestionStatus;

    fn connector() -> CsvConnector {
        CsvConnector::new(Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        )))
    }

    #[test]
    fn valid_rows_are_normalized() {
        let csv = "asset_id,date,value,measure,unit\n\
                   W-1,2024-03-01,120.5,oil,\n\
                   W-1,2024-03-01,900,gas,\n\
                   W-2,2024-03-01,12,water,m3\n";
        let result = connector().ingest_str(csv, "upload.csv");

        assert_eq!(result.status, IngestionStatus::Complete);
        assert_eq!(result.metadata.valid_records, 3);
        let oil = &result.data[0];
        assert_eq!(oil.series_id, "W-1-oil");
        assert_eq!(oil.measurement, Measurement::OilRate);
        assert_eq!(oil.unit, "bbl");
        assert_eq!(result.data[1].unit, "mcf");
        assert_eq!(result.data[2].unit, "m3");
        assert_eq!(oil.source_system, SourceSystem::CsvUpload);
    }

    #[test]
    fn bad_rows_are_counted_not_raised() {
        let csv = "asset_id,date,value,measure\n\
                   W-1,2024-03-01,10,oil\n\
                   ,2024-03-01,10,oil\n\
                   W-3,2024-03-01,abc,oil\n\
                   W-4,not a date,10,oil\n\
                   W-5,2024-03-01\n";
        let result = connector().ingest_str(csv, "upload.csv");

        assert_eq!(result.metadata.total_records, 5);
        assert_eq!(result.metadata.valid_records, 1);
        assert_eq!(result.metadata.failed_records, 4);
        assert_eq!(result.errors[0], "Row 3: invalid data format");
    }

    #[test]
    fn unknown_measure_defaults_to_oil() {
        let csv = "asset_id,date,value,measure\nW-1,2024-03-01,10,condensate\n";
        let result = connector().ingest_str(csv, "upload.csv");
        assert_eq!(result.data[0].measurement, Measurement::OilRate);
    }

    #[test]
    fn header_only_is_empty_batch() {
        let result = connector().ingest_str("asset_id,date,value,measure\n", "empty.csv");
        assert_eq!(result.metadata.total_records, 0);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_connector_error() {
        let result = connector()
            .fetch("/nonexistent/production.csv", &FetchOptions::default())
            .await;
        assert!(matches!(result, Err(ConnectorError::Upstream(_))));
    }
}
