//! Service façade over the regional connectors, the top-producers pipeline
//! and the ingestion registry.
//!
//! The plain methods return `Result`s and leave the user-facing shape to the
//! caller. The envelope methods race the same calls against the configured
//! upstream deadline and fold every outcome into a [`ResultEnvelope`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use crate::aggregate::TopProducers;
use crate::clock::{Clock, SystemClock};
use crate::config::FeedsConfig;
use crate::connectors::{CerConnector, EiaConnector};
use crate::error::ConnectorError;
use crate::http::{HttpTransport, ReqwestTransport};
use crate::ingestion::{FetchOptions, IngestionRegistry, IngestionResult};
use crate::model::{
    DateRange, ErrorCode, HasProvenance, LatestReading, RegionKind, RegionRef, ResultEnvelope,
    SeriesResponse, TopProducersResponse, fallback_provenance,
};
use crate::regions;

pub const PRODUCTION_CACHE_POLICY: &str = "6 hours";
pub const RESERVES_CACHE_POLICY: &str = "7 days";
pub const REGIONS_CACHE_POLICY: &str = "7 days";
pub const TOP_PRODUCERS_CACHE_POLICY: &str = "12 hours";

pub struct EnergyFeeds {
    eia: EiaConnector,
    cer: CerConnector,
    top_producers: TopProducers,
    ingestion: IngestionRegistry,
    clock: Arc<dyn Clock>,
    upstream_timeout: Duration,
}

impl EnergyFeeds {
    pub fn new(config: &FeedsConfig, transport: Arc<dyn HttpTransport>, clock: Arc<dyn Clock>) -> Self {
        Self {
            eia: EiaConnector::new(config.eia.clone(), transport.clone(), clock.clone()),
            cer: CerConnector::new(config.cer.clone(), transport.clone(), clock.clone()),
            top_producers: TopProducers::new(config.aggregator.clone(), clock.clone()),
            ingestion: IngestionRegistry::new(transport, clock.clone()),
            clock,
            upstream_timeout: config.service.upstream_timeout(),
        }
    }

    /// Wires the live HTTP client and the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Configuration`] if the HTTP client cannot be
    /// built.
    pub fn from_config(config: &FeedsConfig) -> Result<Self, ConnectorError> {
        let transport = ReqwestTransport::new(config.http.timeout(), &config.http.user_agent)?;
        Ok(Self::new(config, Arc::new(transport), Arc::new(SystemClock)))
    }

    pub fn eia(&self) -> &EiaConnector {
        &self.eia
    }

    pub fn cer(&self) -> &CerConnector {
        &self.cer
    }

    pub fn ingestion(&self) -> &IngestionRegistry {
        &self.ingestion
    }

    pub fn list_us_states(&self) -> Vec<RegionRef> {
        regions::list_us_states()
    }

    pub fn list_ca_provinces(&self) -> Vec<RegionRef> {
        regions::list_ca_provinces()
    }

    /// # Errors
    ///
    /// See [`EiaConnector::fetch_state_production`].
    pub async fn fetch_us_state_production(
        &self,
        code: &str,
        range: &DateRange,
    ) -> Result<SeriesResponse, ConnectorError> {
        self.eia.fetch_state_production(code, range).await
    }

    /// # Errors
    ///
    /// See [`EiaConnector::fetch_state_reserves`].
    pub async fn fetch_us_state_reserves(
        &self,
        code: &str,
        range: &DateRange,
    ) -> Result<SeriesResponse, ConnectorError> {
        self.eia.fetch_state_reserves(code, range).await
    }

    /// # Errors
    ///
    /// See [`CerConnector::fetch_province_production`].
    pub async fn fetch_ca_province_production(
        &self,
        code: &str,
        range: &DateRange,
    ) -> Result<SeriesResponse, ConnectorError> {
        self.cer.fetch_province_production(code, range).await
    }

    /// # Errors
    ///
    /// Always; see [`CerConnector::fetch_province_reserves`].
    pub fn fetch_ca_province_reserves(&self, code: &str) -> Result<SeriesResponse, ConnectorError> {
        self.cer.fetch_province_reserves(code)
    }

    /// # Errors
    ///
    /// See [`EiaConnector::fetch_state_production_latest`].
    pub async fn fetch_us_state_production_latest(
        &self,
        code: &str,
    ) -> Result<Option<LatestReading>, ConnectorError> {
        self.eia.fetch_state_production_latest(code).await
    }

    /// # Errors
    ///
    /// See [`CerConnector::fetch_province_production_latest`].
    pub async fn fetch_ca_province_production_latest(
        &self,
        code: &str,
    ) -> Result<Option<LatestReading>, ConnectorError> {
        self.cer.fetch_province_production_latest(code).await
    }

    /// Ranks the regions of `kind`; `limit` defaults to the configured value.
    ///
    /// # Errors
    ///
    /// See [`TopProducers::get_top_producers`].
    pub async fn get_top_producers(
        &self,
        kind: RegionKind,
        limit: Option<usize>,
    ) -> Result<TopProducersResponse, ConnectorError> {
        let limit = limit.unwrap_or_else(|| self.top_producers.default_limit());
        match kind {
            RegionKind::UsState => self.top_producers.get_top_producers(&self.eia, limit).await,
            RegionKind::CaProvince => self.top_producers.get_top_producers(&self.cer, limit).await,
        }
    }

    /// Runs one batch through the connector registered under `connector`.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::UnsupportedConnector`] for an unknown type name, or
    /// the connector's own connector-level failure.
    pub async fn ingest(
        &self,
        connector: &str,
        source: &str,
        options: &FetchOptions,
    ) -> Result<IngestionResult, ConnectorError> {
        self.ingestion.get_by_name(connector)?.fetch(source, options).await
    }

    pub fn regions(&self, kind: RegionKind) -> ResultEnvelope<Vec<RegionRef>> {
        let provenance = fallback_provenance(kind, self.clock.now()).with_cache_policy(REGIONS_CACHE_POLICY);
        ResultEnvelope::ok(regions::list(kind), Some(provenance))
    }

    pub async fn production(
        &self,
        kind: RegionKind,
        code: &str,
        range: &DateRange,
    ) -> ResultEnvelope<SeriesResponse> {
        let call = async {
            match kind {
                RegionKind::UsState => self.fetch_us_state_production(code, range).await,
                RegionKind::CaProvince => self.fetch_ca_province_production(code, range).await,
            }
        };
        self.enveloped(kind, PRODUCTION_CACHE_POLICY, call).await
    }

    pub async fn reserves(
        &self,
        kind: RegionKind,
        code: &str,
        range: &DateRange,
    ) -> ResultEnvelope<SeriesResponse> {
        let call = async {
            match kind {
                RegionKind::UsState => self.fetch_us_state_reserves(code, range).await,
                RegionKind::CaProvince => self.fetch_ca_province_reserves(code),
            }
        };
        self.enveloped(kind, RESERVES_CACHE_POLICY, call).await
    }

    pub async fn latest_production(
        &self,
        kind: RegionKind,
        code: &str,
    ) -> ResultEnvelope<Option<LatestReading>> {
        let call = async {
            match kind {
                RegionKind::UsState => self.fetch_us_state_production_latest(code).await,
                RegionKind::CaProvince => self.fetch_ca_province_production_latest(code).await,
            }
        };
        self.enveloped(kind, PRODUCTION_CACHE_POLICY, call).await
    }

    pub async fn top_producers(
        &self,
        kind: RegionKind,
        limit: Option<usize>,
    ) -> ResultEnvelope<TopProducersResponse> {
        self.enveloped(kind, TOP_PRODUCERS_CACHE_POLICY, self.get_top_producers(kind, limit))
            .await
    }

    /// Races `call` against the upstream deadline. A call that misses it is
    /// dropped and reported as `UPSTREAM_TIMEOUT`.
    async fn enveloped<T, Fut>(&self, kind: RegionKind, cache_policy: &str, call: Fut) -> ResultEnvelope<T>
    where
        T: HasProvenance,
        Fut: Future<Output = Result<T, ConnectorError>>,
    {
        match tokio::time::timeout(self.upstream_timeout, call).await {
            Ok(Ok(mut data)) => {
                let provenance = data.provenance_mut().map(|p| {
                    p.cache_policy = Some(cache_policy.to_string());
                    p.clone()
                });
                ResultEnvelope::ok(data, provenance)
            }
            Ok(Err(e)) => {
                if e.is_fatal() {
                    error!(%kind, error = %e, "connector misconfigured");
                } else {
                    warn!(%kind, error = %e, "connector call failed");
                }
                ResultEnvelope::from_error(&e, kind, self.clock.now())
            }
            Err(_) => {
                warn!(%kind, timeout = ?self.upstream_timeout, "upstream deadline exceeded");
                ResultEnvelope::degraded(
                    ErrorCode::UpstreamTimeout,
                    format!(
                        "upstream did not respond within {}s",
                        self.upstream_timeout.as_secs_f64()
                    ),
                    fallback_provenance(kind, self.clock.now()),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::clock::ManualClock;
    use crate::http::{FixtureTransport, HttpResponse};
    use crate::model::EnvelopeStatus;

    const CSV_URL: &str = "http://cer.test/production.csv";

    fn feeds(transport: Arc<FixtureTransport>, timeout_secs: u64) -> EnergyFeeds {
        let mut config = FeedsConfig::defaults();
        config.eia.base_url = "http://eia.test/v2".to_string();
        config.eia.api_key = None;
        config.eia.api_key_env = "ENERGY_FEEDS_TEST_UNSET_VAR".to_string();
        config.cer.csv_url = CSV_URL.to_string();
        config.service.upstream_timeout_secs = timeout_secs;
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        ));
        EnergyFeeds::new(&config, transport, clock)
    }

    #[tokio::test]
    async fn missing_key_is_configuration_envelope() {
        let feeds = feeds(Arc::new(FixtureTransport::new()), 5);
        let env = feeds
            .production(RegionKind::UsState, "TX", &DateRange::default())
            .await;
        assert_eq!(env.status, EnvelopeStatus::Degraded);
        assert_eq!(env.error.map(|e| e.code), Some(ErrorCode::ConfigurationError));
        assert_eq!(env.provenance.map(|p| p.source_name), Some("EIA".to_string()));
    }

    #[tokio::test]
    async fn canadian_reserves_are_not_available() {
        let feeds = feeds(Arc::new(FixtureTransport::new()), 5);
        let env = feeds
            .reserves(RegionKind::CaProvince, "AB", &DateRange::default())
            .await;
        assert_eq!(env.error.map(|e| e.code), Some(ErrorCode::NotAvailable));
    }

    #[tokio::test]
    async fn ok_envelope_carries_cache_policy() {
        let transport = Arc::new(FixtureTransport::new());
        transport.respond(
            CSV_URL,
            HttpResponse::ok("Date,Unit,Region,Type,Value\n2024-01-01,Cubic meres per day,AB,Light,1000"),
        );
        let feeds = feeds(transport, 5);
        let env = feeds
            .production(RegionKind::CaProvince, "AB", &DateRange::default())
            .await;
        assert!(env.is_ok());
        assert_eq!(
            env.provenance.and_then(|p| p.cache_policy),
            Some(PRODUCTION_CACHE_POLICY.to_string())
        );
    }

    #[tokio::test]
    async fn unknown_region_is_bad_request() {
        let feeds = feeds(Arc::new(FixtureTransport::new()), 5);
        let env = feeds.latest_production(RegionKind::CaProvince, "ZZ").await;
        assert_eq!(env.error.map(|e| e.code), Some(ErrorCode::BadRequest));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_upstream_times_out() {
        let feeds = feeds(Arc::new(FixtureTransport::new()), 1);
        let never = std::future::pending::<Result<SeriesResponse, ConnectorError>>();
        let env = feeds.enveloped(RegionKind::UsState, PRODUCTION_CACHE_POLICY, never).await;
        assert_eq!(env.error.map(|e| e.code), Some(ErrorCode::UpstreamTimeout));
    }

    #[tokio::test]
    async fn unknown_ingestion_connector_is_rejected() {
        let feeds = feeds(Arc::new(FixtureTransport::new()), 5);
        let result = feeds.ingest("SOAP", "x", &FetchOptions::default()).await;
        assert!(matches!(result, Err(ConnectorError::UnsupportedConnector(_))));
    }
}
