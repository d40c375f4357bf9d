//! CER connector for Canadian provincial crude production.
//!
//! The CER publishes one country-wide CSV of estimated monthly production by
//! province and crude category, in both metric and imperial units. This
//! module downloads it into a process-wide [`TtlCache`], keeps only metric
//! rows of non-overlapping categories, converts them to thousand barrels per
//! day, and sums them per month.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::aggregate::LatestProduction;
use crate::cache::{Snapshot, TtlCache};
use crate::clock::Clock;
use crate::config::CerConfig;
use crate::error::ConnectorError;
use crate::http::HttpTransport;
use crate::model::{
    Commodity, DateRange, Frequency, LatestReading, Provenance, RegionKind, RegionRef,
    SeriesResponse, TimeSeriesPoint,
};
use crate::regions;

const SOURCE_NAME: &str = "CER";
pub const PRODUCTION_UNITS: &str = "MBBL/d";

/// Barrels in one cubic metre.
pub const CUBIC_METRES_TO_BARRELS: f64 = 6.28981;

/// Metric unit labels accepted from the CSV. The upstream file spells it
/// "Cubic meres per day"; the corrected spellings are accepted too.
const METRIC_UNIT_LABELS: &[&str] = &[
    "cubic meres per day",
    "cubic metres per day",
    "cubic meters per day",
];

/// Category labels that already aggregate other rows. Summing any of these
/// alongside their constituents double counts production.
const AGGREGATE_CATEGORY_LABELS: &[&str] = &["total", "mined bitumen", "in situ bitumen"];

/// Date layouts observed in the CSV, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d-%b-%Y", "%B %d, %Y"];

/// One structurally valid CSV row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CerRow {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Unit")]
    pub unit: String,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Type")]
    pub category: String,
    #[serde(rename = "Value")]
    pub value: String,
}

/// Result of a tolerant parse: the rows that decoded, and how many did not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCsv {
    pub rows: Vec<CerRow>,
    pub rejected: usize,
}

/// Distinct, non-overlapping physical categories of crude production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrudeCategory {
    Light,
    Heavy,
    Condensate,
    Upgraded,
    NonUpgraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Summed into the provincial total.
    Constituent(CrudeCategory),
    /// A roll-up of other rows; never summed.
    Aggregate,
    Unknown,
}

/// Classifies a CSV `Type` label.
pub fn classify(label: &str) -> Classification {
    let normalized = normalize_label(label);
    if normalized.starts_with("total") || AGGREGATE_CATEGORY_LABELS.contains(&normalized.as_str()) {
        return Classification::Aggregate;
    }
    // "non upgraded" must be tested before "upgraded".
    let category = if normalized.starts_with("non upgraded") || normalized.starts_with("nonupgraded") {
        CrudeCategory::NonUpgraded
    } else if normalized.starts_with("upgraded") {
        CrudeCategory::Upgraded
    } else if normalized.starts_with("light") {
        CrudeCategory::Light
    } else if normalized.starts_with("heavy") {
        CrudeCategory::Heavy
    } else if normalized.starts_with("condensate") {
        CrudeCategory::Condensate
    } else {
        return Classification::Unknown;
    };
    Classification::Constituent(category)
}

fn normalize_label(label: &str) -> String {
    label
        .to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn is_metric_unit(unit: &str) -> bool {
    let normalized = normalize_label(unit);
    METRIC_UNIT_LABELS.contains(&normalized.as_str())
}

/// Converts cubic metres per day to thousand barrels per day.
pub fn cubic_metres_to_kbbl(cubic_metres_per_day: f64) -> f64 {
    cubic_metres_per_day * CUBIC_METRES_TO_BARRELS / 1000.0
}

/// A normalized period, or the raw date string when it could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodKey {
    Month(String),
    Unparsed(String),
}

impl PeriodKey {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Month(p) | Self::Unparsed(p) => p,
        }
    }
}

/// Normalizes a CSV date to `YYYY-MM`.
pub fn normalize_period(raw: &str) -> PeriodKey {
    let s = raw.trim();
    let month = |d: NaiveDate| PeriodKey::Month(d.format("%Y-%m").to_string());

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return month(d);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
        return month(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return month(dt.naive_utc().date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return month(dt.date());
    }
    PeriodKey::Unparsed(raw.to_string())
}

/// Parses the CSV, discarding rows that fail to decode.
///
/// # Errors
///
/// Returns [`ConnectorError::Schema`] when rows were present but none of
/// them decoded (for example, the header changed).
pub fn parse_csv(text: &str) -> Result<ParsedCsv, ConnectorError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut parsed = ParsedCsv::default();
    let mut first_error = None;
    for (idx, record) in rdr.deserialize::<CerRow>().enumerate() {
        match record {
            Ok(row) => parsed.rows.push(row),
            Err(e) => {
                parsed.rejected += 1;
                debug!(row = idx + 2, error = %e, "CER row rejected");
                first_error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    if parsed.rows.is_empty() {
        if let Some(e) = first_error {
            return Err(ConnectorError::Schema(format!("CER CSV parse error: {e}")));
        }
    }
    Ok(parsed)
}

/// Monthly production for one province.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProvinceSeries {
    pub series: Vec<TimeSeriesPoint>,
    pub anomalous_periods: Vec<String>,
}

/// Sums converted constituent rows per period for `province_code`, newest
/// first, within `range`.
///
/// Points whose date could not be normalised follow every monthly point and
/// are only kept when `range` has no bounds.
pub fn aggregate_province(rows: &[CerRow], province_code: &str, range: &DateRange) -> ProvinceSeries {
    let mut months: BTreeMap<String, f64> = BTreeMap::new();
    let mut unparsed: BTreeMap<String, f64> = BTreeMap::new();

    for row in rows {
        if !row.region.trim().eq_ignore_ascii_case(province_code) {
            continue;
        }
        if !is_metric_unit(&row.unit) {
            continue;
        }
        match classify(&row.category) {
            Classification::Constituent(_) => {}
            Classification::Aggregate => continue,
            Classification::Unknown => {
                debug!(category = %row.category, "unrecognised CER category ignored");
                continue;
            }
        }

        let kbbl = cubic_metres_to_kbbl(parse_cell(&row.value));
        let bucket = match normalize_period(&row.date) {
            PeriodKey::Month(period) => months.entry(period),
            PeriodKey::Unparsed(raw) => unparsed.entry(raw),
        };
        *bucket.or_insert(0.0) += kbbl;
    }

    let unbounded = range.start.is_none() && range.end.is_none();
    let anomalous_periods: Vec<String> = unparsed.keys().cloned().collect();
    let series = months
        .into_iter()
        .rev()
        .filter(|(period, _)| range.contains(period))
        .chain(unparsed.into_iter().filter(|_| unbounded))
        .map(|(period, value)| TimeSeriesPoint::new(period, value))
        .collect();

    ProvinceSeries {
        series,
        anomalous_periods,
    }
}

/// Reads a numeric cell. Thousands separators are stripped; anything else
/// that does not parse counts as zero, the same fallback as the EIA side.
fn parse_cell(raw: &str) -> f64 {
    raw.trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Canadian provincial production from the CER bulk CSV.
pub struct CerConnector {
    config: CerConfig,
    transport: Arc<dyn HttpTransport>,
    cache: TtlCache<ParsedCsv>,
}

impl CerConnector {
    pub fn new(config: CerConfig, transport: Arc<dyn HttpTransport>, clock: Arc<dyn Clock>) -> Self {
        let ttl = i64::try_from(config.cache_ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        Self {
            config,
            transport,
            cache: TtlCache::new(ttl, clock),
        }
    }

    /// Monthly production for one province in thousand barrels per day,
    /// newest period first.
    ///
    /// # Errors
    ///
    /// * [`ConnectorError::UnknownRegion`] for a code outside the catalog
    /// * [`ConnectorError::Upstream`] / [`ConnectorError::Schema`] when the
    ///   CSV cannot be downloaded or decoded
    pub async fn fetch_province_production(
        &self,
        province_code: &str,
        range: &DateRange,
    ) -> Result<SeriesResponse, ConnectorError> {
        let region = resolve_province(province_code)?;
        let snapshot = self.snapshot().await?;
        let aggregated = aggregate_province(&snapshot.value.rows, &region.code, range);
        if !aggregated.anomalous_periods.is_empty() {
            warn!(
                province = %region.code,
                periods = ?aggregated.anomalous_periods,
                "CER dates passed through unnormalized"
            );
        }

        let provenance = Provenance::new(SOURCE_NAME, self.config.csv_url.clone(), snapshot.fetched_at)
            .with_notes("Estimated Monthly Production (Converted from m3/d to MBBL/d)")
            .with_fingerprint(format!(
                "production-{}-{}-{}",
                RegionKind::CaProvince,
                region.code,
                range.fingerprint()
            ));

        Ok(SeriesResponse {
            region,
            commodity: Commodity::CrudeOil,
            series: aggregated.series,
            units: PRODUCTION_UNITS.to_string(),
            frequency: Frequency::Monthly,
            provenance,
            anomalous_periods: aggregated.anomalous_periods,
        })
    }

    /// Most recent monthly reading for one province, or `None` when the
    /// province has no matching rows.
    ///
    /// # Errors
    ///
    /// Same as [`CerConnector::fetch_province_production`].
    pub async fn fetch_province_production_latest(
        &self,
        province_code: &str,
    ) -> Result<Option<LatestReading>, ConnectorError> {
        let response = self
            .fetch_province_production(province_code, &DateRange::default())
            .await?;
        Ok(response.latest())
    }

    /// Provincial proved reserves are not offered by any stable CER feed.
    ///
    /// # Errors
    ///
    /// Always fails: [`ConnectorError::UnknownRegion`] for a bad code,
    /// otherwise [`ConnectorError::NotAvailable`]. No request is made.
    pub fn fetch_province_reserves(&self, province_code: &str) -> Result<SeriesResponse, ConnectorError> {
        let region = resolve_province(province_code)?;
        Err(ConnectorError::NotAvailable(format!(
            "provincial proved reserves for {} are not available via a stable public feed",
            region.name
        )))
    }

    /// Forces a fresh download, replacing the cached snapshot on success.
    ///
    /// # Errors
    ///
    /// Propagates download or parse failures; the previous snapshot is kept.
    pub async fn refresh(&self) -> Result<Arc<Snapshot<ParsedCsv>>, ConnectorError> {
        self.cache.refresh(|| self.download()).await
    }

    async fn snapshot(&self) -> Result<Arc<Snapshot<ParsedCsv>>, ConnectorError> {
        self.cache.get_or_refresh(|| self.download()).await
    }

    async fn download(&self) -> Result<ParsedCsv, ConnectorError> {
        info!(url = %self.config.csv_url, "downloading CER production CSV");
        let response = self.transport.get(&self.config.csv_url, &[], &[]).await?;
        if !response.is_success() {
            return Err(ConnectorError::Upstream(format!(
                "CER CSV fetch error: HTTP {}",
                response.status
            )));
        }
        let parsed = parse_csv(&response.body)?;
        if parsed.rejected > 0 {
            warn!(
                accepted = parsed.rows.len(),
                rejected = parsed.rejected,
                "CER CSV contained malformed rows"
            );
        }
        Ok(parsed)
    }
}

#[async_trait]
impl LatestProduction for CerConnector {
    fn kind(&self) -> RegionKind {
        RegionKind::CaProvince
    }

    fn source_url(&self) -> &str {
        &self.config.csv_url
    }

    async fn latest_production(&self, code: &str) -> Result<Option<LatestReading>, ConnectorError> {
        self.fetch_province_production_latest(code).await
    }
}

fn resolve_province(code: &str) -> Result<RegionRef, ConnectorError> {
    regions::resolve(RegionKind::CaProvince, code).ok_or_else(|| ConnectorError::UnknownRegion {
        kind: RegionKind::CaProvince,
        code: code.to_string(),
    })
}
