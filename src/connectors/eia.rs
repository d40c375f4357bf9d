//! EIA v2 connector for US state crude production and proved reserves.
//!
//! Queries one route per series, filtered by the `du` (state) facet, sorted
//! descending by period, with a bounded page length. Values are coerced to
//! numbers with the zero fallback of [`coerce_number`].

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::aggregate::LatestProduction;
use crate::clock::Clock;
use crate::config::EiaConfig;
use crate::error::ConnectorError;
use crate::http::{HttpTransport, redacted_query};
use crate::model::{
    Commodity, DateRange, Frequency, LatestReading, Provenance, RegionKind, RegionRef,
    SeriesResponse, TimeSeriesPoint, coerce_number,
};
use crate::regions;

const PRODUCTION_ROUTE: &str = "/petroleum/crd/crpdn/data";
const RESERVES_ROUTE: &str = "/petroleum/crd/pres/data";
const SOURCE_NAME: &str = "EIA";
const SOURCE_URL: &str = "https://www.eia.gov/opendata/";

/// Thousand barrels per day.
pub const PRODUCTION_UNITS: &str = "MBBL/d";
/// Million barrels.
pub const RESERVES_UNITS: &str = "MMbbl";

#[derive(Debug, Deserialize)]
struct EiaPayload {
    response: EiaBody,
}

#[derive(Debug, Deserialize)]
struct EiaBody {
    data: Vec<Value>,
    #[serde(default)]
    total: Option<Value>,
}

/// Which series to query and how to label it.
#[derive(Debug, Clone, Copy)]
struct SeriesSpec {
    route: &'static str,
    frequency: Frequency,
    units: &'static str,
    notes: &'static str,
    label: &'static str,
}

const PRODUCTION: SeriesSpec = SeriesSpec {
    route: PRODUCTION_ROUTE,
    frequency: Frequency::Monthly,
    units: PRODUCTION_UNITS,
    notes: "Crude Oil Production",
    label: "production",
};

const RESERVES: SeriesSpec = SeriesSpec {
    route: RESERVES_ROUTE,
    frequency: Frequency::Annual,
    units: RESERVES_UNITS,
    notes: "Proved Reserves, Crude Oil",
    label: "reserves",
};

/// US state production and reserves from the EIA time-series API.
///
/// Failures are returned to the caller as [`ConnectorError`]; this type never
/// builds degraded envelopes itself.
pub struct EiaConnector {
    config: EiaConfig,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
}

impl EiaConnector {
    pub fn new(config: EiaConfig, transport: Arc<dyn HttpTransport>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            transport,
            clock,
        }
    }

    /// Monthly crude production for one state, newest period first.
    ///
    /// # Errors
    ///
    /// * [`ConnectorError::UnknownRegion`] for a code outside the catalog
    /// * [`ConnectorError::Configuration`] when no API key is configured
    /// * [`ConnectorError::Upstream`] / [`ConnectorError::Schema`] on upstream failure
    pub async fn fetch_state_production(
        &self,
        state_code: &str,
        range: &DateRange,
    ) -> Result<SeriesResponse, ConnectorError> {
        self.fetch_series(PRODUCTION, state_code, range).await
    }

    /// Annual proved reserves for one state, newest period first.
    ///
    /// # Errors
    ///
    /// Same as [`EiaConnector::fetch_state_production`].
    pub async fn fetch_state_reserves(
        &self,
        state_code: &str,
        range: &DateRange,
    ) -> Result<SeriesResponse, ConnectorError> {
        self.fetch_series(RESERVES, state_code, range).await
    }

    /// Most recent monthly production reading, requesting a single row.
    ///
    /// Returns `Ok(None)` when the upstream has no rows for the state.
    ///
    /// # Errors
    ///
    /// Same as [`EiaConnector::fetch_state_production`].
    pub async fn fetch_state_production_latest(
        &self,
        state_code: &str,
    ) -> Result<Option<LatestReading>, ConnectorError> {
        let region = resolve_state(state_code)?;
        let items = self
            .query(PRODUCTION, &region, &DateRange::default(), 1)
            .await?;
        Ok(parse_points(&items).into_iter().next().map(|p| LatestReading {
            period: p.period,
            value: p.value,
            units: PRODUCTION_UNITS.to_string(),
        }))
    }

    async fn fetch_series(
        &self,
        spec: SeriesSpec,
        state_code: &str,
        range: &DateRange,
    ) -> Result<SeriesResponse, ConnectorError> {
        let region = resolve_state(state_code)?;
        let items = self
            .query(spec, &region, range, self.config.page_length)
            .await?;

        // Bounds are inclusive here whatever the upstream does with them.
        let series: Vec<TimeSeriesPoint> = parse_points(&items)
            .into_iter()
            .filter(|p| range.contains(&p.period))
            .collect();

        let provenance = Provenance::new(SOURCE_NAME, SOURCE_URL, self.clock.now())
            .with_notes(spec.notes)
            .with_fingerprint(format!(
                "{}-{}-{}-{}",
                spec.label,
                RegionKind::UsState,
                region.code,
                range.fingerprint()
            ));

        Ok(SeriesResponse {
            region,
            commodity: Commodity::CrudeOil,
            series,
            units: spec.units.to_string(),
            frequency: spec.frequency,
            provenance,
            anomalous_periods: Vec::new(),
        })
    }

    async fn query(
        &self,
        spec: SeriesSpec,
        region: &RegionRef,
        range: &DateRange,
        length: usize,
    ) -> Result<Vec<Value>, ConnectorError> {
        let api_key = self.config.resolve_api_key()?;
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), spec.route);
        let params = build_query(&api_key, &region.code, spec.frequency, range, length);
        debug!(url = %url, query = %redacted_query(&params), "querying EIA");

        let headers = [("Accept".to_string(), "application/json".to_string())];
        let response = self.transport.get(&url, &params, &headers).await?;
        if !response.is_success() {
            return Err(ConnectorError::Upstream(format!(
                "EIA API error: HTTP {} for {}",
                response.status, spec.route
            )));
        }

        let payload: EiaPayload = serde_json::from_str(&response.body)
            .map_err(|e| ConnectorError::Schema(format!("unexpected EIA payload: {e}")))?;
        debug!(
            rows = payload.response.data.len(),
            total = ?payload.response.total,
            state = %region.code,
            "EIA response"
        );
        Ok(payload.response.data)
    }
}

#[async_trait]
impl LatestProduction for EiaConnector {
    fn kind(&self) -> RegionKind {
        RegionKind::UsState
    }

    fn source_url(&self) -> &str {
        SOURCE_URL
    }

    async fn latest_production(&self, code: &str) -> Result<Option<LatestReading>, ConnectorError> {
        self.fetch_state_production_latest(code).await
    }
}

fn resolve_state(code: &str) -> Result<RegionRef, ConnectorError> {
    regions::resolve(RegionKind::UsState, code).ok_or_else(|| ConnectorError::UnknownRegion {
        kind: RegionKind::UsState,
        code: code.to_string(),
    })
}

fn build_query(
    api_key: &str,
    state_code: &str,
    frequency: Frequency,
    range: &DateRange,
    length: usize,
) -> Vec<(String, String)> {
    let freq = match frequency {
        Frequency::Monthly => "M",
        Frequency::Annual => "A",
    };
    let mut params = vec![
        ("api_key".to_string(), api_key.to_string()),
        ("frequency".to_string(), freq.to_string()),
        ("data[0]".to_string(), "value".to_string()),
        ("facets[du][]".to_string(), state_code.to_string()),
        ("sort[0][column]".to_string(), "period".to_string()),
        ("sort[0][direction]".to_string(), "desc".to_string()),
        ("offset".to_string(), "0".to_string()),
        ("length".to_string(), length.to_string()),
    ];
    if let Some(start) = &range.start {
        params.push(("start".to_string(), start.clone()));
    }
    if let Some(end) = &range.end {
        params.push(("end".to_string(), end.clone()));
    }
    params
}

/// Converts raw EIA rows into points sorted descending by period.
///
/// Rows without a string `period` are dropped; a repeated period keeps its
/// first occurrence.
fn parse_points(items: &[Value]) -> Vec<TimeSeriesPoint> {
    let mut seen = HashSet::with_capacity(items.len());
    let mut points: Vec<TimeSeriesPoint> = Vec::with_capacity(items.len());
    for item in items {
        let Some(period) = item.get("period").and_then(Value::as_str) else {
            warn!(row = %item, "EIA row without period skipped");
            continue;
        };
        if !seen.insert(period) {
            continue;
        }
        let value = item.get("value").map_or(0.0, coerce_number);
        points.push(TimeSeriesPoint::new(period, value));
    }
    points.sort_by(|a, b| b.period.cmp(&a.period));
    points
}
