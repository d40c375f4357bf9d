//! Canonical production record produced by every ingestion connector.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Measurement {
    OilRate,
    GasRate,
    WaterRate,
    PressureTubing,
}

impl Measurement {
    /// Maps either a short label (`oil`, `gas`, `water`, `pressure`) or the
    /// canonical name (`OIL_RATE`, ...) to a measurement.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "oil" | "oil_rate" => Some(Self::OilRate),
            "gas" | "gas_rate" => Some(Self::GasRate),
            "water" | "water_rate" => Some(Self::WaterRate),
            "pressure" | "pressure_tubing" => Some(Self::PressureTubing),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OilRate => "OIL_RATE",
            Self::GasRate => "GAS_RATE",
            Self::WaterRate => "WATER_RATE",
            Self::PressureTubing => "PRESSURE_TUBING",
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// System a record was ingested through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceSystem {
    CsvUpload,
    RestApi,
}

/// One normalized measurement for one asset at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRecord {
    pub asset_id: String,
    pub series_id: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub measurement: Measurement,
    pub unit: String,
    pub source_system: SourceSystem,
    pub ingested_at: DateTime<Utc>,
    pub quality_flags: Vec<String>,
    pub tags: Map<String, Value>,
}

/// Parses the timestamp shapes seen in uploads: RFC 3339, naive date-times,
/// and plain dates (taken as midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}
