//! Canonical time-series, provenance, and region types.
//!
//! Every connector normalizes its upstream shape into these types. Field
//! names are the public JSON contract consumed by the route layer.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One observation in a series.
///
/// `period` is `YYYY-MM` for monthly data and `YYYY` for annual data, so
/// plain string ordering is chronological ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub period: String,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(period: impl Into<String>, value: f64) -> Self {
        Self {
            period: period.into(),
            value,
        }
    }
}

/// Source attestation attached to every emitted series, including failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Short upstream name (`"EIA"`, `"CER"`).
    pub source_name: String,
    /// Documentation or download URL of the upstream.
    pub source_url: String,
    /// When this process retrieved (or attempted to retrieve) the data.
    pub retrieved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_fingerprint: Option<String>,
}

impl Provenance {
    pub fn new(
        source_name: impl Into<String>,
        source_url: impl Into<String>,
        retrieved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            source_url: source_url.into(),
            retrieved_at,
            notes: None,
            cache_policy: None,
            request_fingerprint: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_cache_policy(mut self, policy: impl Into<String>) -> Self {
        self.cache_policy = Some(policy.into());
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.request_fingerprint = Some(fingerprint.into());
        self
    }
}

/// Jurisdiction family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegionKind {
    UsState,
    CaProvince,
}

impl RegionKind {
    /// Wire name, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UsState => "US_STATE",
            Self::CaProvince => "CA_PROVINCE",
        }
    }

    /// Upstream that serves this region family.
    pub fn source_name(self) -> &'static str {
        match self {
            Self::UsState => "EIA",
            Self::CaProvince => "CER",
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "US_STATE" => Ok(Self::UsState),
            "CA_PROVINCE" => Ok(Self::CaProvince),
            other => Err(format!(
                "unknown region kind \"{other}\", expected US_STATE or CA_PROVINCE"
            )),
        }
    }
}

/// A jurisdiction resolved from the static region catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionRef {
    pub kind: RegionKind,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Commodity {
    CrudeOil,
}

/// Reporting cadence of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Monthly,
    Annual,
}

/// Optional inclusive period bounds, compared lexicographically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl DateRange {
    pub fn new(start: Option<String>, end: Option<String>) -> Self {
        Self { start, end }
    }

    /// Returns `true` when `period` lies inside both bounds.
    pub fn contains(&self, period: &str) -> bool {
        let after_start = self.start.as_deref().is_none_or(|s| period >= s);
        let before_end = self.end.as_deref().is_none_or(|e| period <= e);
        after_start && before_end
    }

    /// Stable text form used in request fingerprints.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}-{}",
            self.start.as_deref().unwrap_or("none"),
            self.end.as_deref().unwrap_or("none")
        )
    }
}

/// One region's production or reserves series.
///
/// `series` is sorted descending by `period`; `units` and `frequency` apply
/// to every point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesResponse {
    pub region: RegionRef,
    pub commodity: Commodity,
    pub series: Vec<TimeSeriesPoint>,
    pub units: String,
    pub frequency: Frequency,
    pub provenance: Provenance,
    /// Period strings passed through unnormalized because their source date
    /// could not be parsed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anomalous_periods: Vec<String>,
}

impl SeriesResponse {
    /// Most recent point with a normalised period, if any.
    pub fn latest(&self) -> Option<LatestReading> {
        self.series
            .iter()
            .find(|p| !self.anomalous_periods.contains(&p.period))
            .map(|p| LatestReading {
                period: p.period.clone(),
                value: p.value,
                units: self.units.clone(),
            })
    }
}

/// Single most-recent reading used for polling and ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestReading {
    pub period: String,
    pub value: f64,
    pub units: String,
}

/// One region's latest reading, ranked after period selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopProducerRow {
    pub region: RegionRef,
    pub latest_period: String,
    pub latest_value: f64,
    pub units: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,
}

impl TopProducerRow {
    pub fn from_reading(region: RegionRef, reading: LatestReading) -> Self {
        Self {
            region,
            latest_period: reading.period,
            latest_value: reading.value,
            units: reading.units,
            rank: None,
        }
    }
}

/// Ranked producers for one region family and one selected period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopProducersResponse {
    pub kind: RegionKind,
    pub commodity: Commodity,
    pub latest_period: String,
    pub units: String,
    pub rows: Vec<TopProducerRow>,
    pub provenance: Provenance,
}

/// Coerces a loosely typed upstream value to a finite number.
///
/// Numbers pass through, numeric strings are parsed, and everything else
/// (null, empty or non-numeric strings, NaN) becomes `0.0`. Upstream feeds
/// carry sparse placeholder rows, so a single bad cell must not reject the
/// whole response. This can report a genuinely missing value as zero
/// production; callers aggregating across rows inherit that.
pub fn coerce_number(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}
