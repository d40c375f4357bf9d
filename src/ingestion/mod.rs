//! Generic ingestion connectors for well-level production data.
//!
//! Every source type implements [`IngestionConnector`]: `fetch` pulls a batch
//! and reports per-record problems in the result instead of failing, while
//! `validate` and `normalize` work on one raw record at a time. Connectors
//! for protocols that are not wired up yet return an
//! [`IngestionStatus::Unimplemented`] result, never an empty success.

pub mod csv_file;
pub mod record;
pub mod registry;
pub mod rest;
pub mod stubs;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ConnectorError;

pub use csv_file::CsvConnector;
pub use record::{Measurement, ProductionRecord, SourceSystem};
pub use registry::{ConnectorKind, IngestionRegistry};
pub use rest::RestConnector;
pub use stubs::{MqttConnector, OpcUaConnector, WitsmlConnector};

/// A record as it arrived, keyed by source field name.
pub type RawRecord = Map<String, Value>;

/// Per-call options for [`IngestionConnector::fetch`].
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Extra request headers, used by network-backed connectors.
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionStatus {
    /// The source was read; `data` and `errors` describe every record.
    Complete,
    /// The connector for this source type is not implemented.
    Unimplemented,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionMetadata {
    pub total_records: usize,
    pub valid_records: usize,
    pub failed_records: usize,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of one batch ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionResult {
    pub data: Vec<ProductionRecord>,
    pub errors: Vec<String>,
    pub metadata: IngestionMetadata,
    pub status: IngestionStatus,
}

#[async_trait]
pub trait IngestionConnector: Send + Sync {
    fn kind(&self) -> ConnectorKind;

    /// Reads one batch from `source` (a path, URL or endpoint, depending on
    /// the connector).
    ///
    /// # Errors
    ///
    /// Only for connector-level failures: unreachable source or a malformed
    /// top-level payload. Bad records are reported in the result.
    async fn fetch(&self, source: &str, options: &FetchOptions) -> Result<IngestionResult, ConnectorError>;

    fn validate(&self, record: &RawRecord) -> bool;

    /// Maps a raw record to the canonical shape, or `None` if it is invalid.
    fn normalize(&self, record: &RawRecord) -> Option<ProductionRecord>;
}

/// Normalizes every value in `records`, counting non-objects and records
/// that fail normalization as failures. `describe` renders the error for the
/// record at a zero-based index.
pub(crate) fn collect_records(
    connector: &dyn IngestionConnector,
    records: Vec<Value>,
    source: &str,
    now: DateTime<Utc>,
    describe: impl Fn(usize) -> String,
) -> IngestionResult {
    let total = records.len();
    let mut data = Vec::with_capacity(total);
    let mut errors = Vec::new();
    for (idx, value) in records.into_iter().enumerate() {
        let normalized = match &value {
            Value::Object(raw) => connector.normalize(raw),
            _ => None,
        };
        match normalized {
            Some(record) => data.push(record),
            None => errors.push(describe(idx)),
        }
    }
    debug!(
        kind = %connector.kind(),
        source,
        total,
        failed = errors.len(),
        "ingested batch"
    );
    IngestionResult {
        metadata: IngestionMetadata {
            total_records: total,
            valid_records: data.len(),
            failed_records: errors.len(),
            source: source.to_string(),
            timestamp: now,
        },
        data,
        errors,
        status: IngestionStatus::Complete,
    }
}

/// Non-empty string field, if present.
pub(crate) fn text_field<'a>(record: &'a RawRecord, key: &str) -> Option<&'a str> {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
