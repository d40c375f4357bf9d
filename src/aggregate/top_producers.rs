//! Ranked list of the highest-producing regions in one family.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::aggregate::LatestProduction;
use crate::aggregate::pool::drain_bounded;
use crate::aggregate::ranking::{rank_rows, select_period};
use crate::clock::Clock;
use crate::config::AggregatorConfig;
use crate::error::ConnectorError;
use crate::model::{Commodity, Provenance, TopProducerRow, TopProducersResponse};
use crate::regions;

pub struct TopProducers {
    config: AggregatorConfig,
    clock: Arc<dyn Clock>,
}

impl TopProducers {
    pub fn new(config: AggregatorConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    pub fn default_limit(&self) -> usize {
        self.config.default_limit
    }

    /// Ranks every catalog region of `source.kind()` by latest production.
    ///
    /// Each region's latest reading is fetched through a bounded pool.
    /// Regions that fail or report nothing are left out; the ranking uses the
    /// period chosen by [`select_period`].
    ///
    /// # Errors
    ///
    /// * a fatal error (missing credential) from any region is returned as is
    /// * [`ConnectorError::NoData`] when no region produced a reading
    pub async fn get_top_producers(
        &self,
        source: &dyn LatestProduction,
        limit: usize,
    ) -> Result<TopProducersResponse, ConnectorError> {
        let kind = source.kind();
        let catalog = regions::list(kind);
        info!(
            %kind,
            regions = catalog.len(),
            concurrency = self.config.concurrency,
            "collecting latest production"
        );

        let outcomes = drain_bounded(catalog, self.config.concurrency, move |region| async move {
            let result = source.latest_production(&region.code).await;
            (region, result)
        })
        .await;

        let mut rows = Vec::with_capacity(outcomes.len());
        let mut failed = 0usize;
        for (region, outcome) in outcomes {
            match outcome {
                Ok(Some(reading)) => rows.push(TopProducerRow::from_reading(region, reading)),
                Ok(None) => debug!(region = %region.code, "no production reported"),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    failed += 1;
                    warn!(region = %region.code, error = %e, "latest production fetch failed");
                }
            }
        }

        let Some(period) = select_period(&rows, self.config.coverage_threshold) else {
            return Err(ConnectorError::NoData(format!(
                "no production data available for {kind}"
            )));
        };
        info!(
            %kind,
            %period,
            collected = rows.len(),
            failed,
            "selected ranking period"
        );

        let units = rows
            .first()
            .map(|r| r.units.clone())
            .unwrap_or_default();
        let ranked = rank_rows(rows, &period, limit);

        let provenance = Provenance::new(kind.source_name(), source.source_url(), self.clock.now())
            .with_notes(format!("Ranking based on production in {period}."))
            .with_fingerprint(format!("top-producers-{kind}-{limit}"));

        Ok(TopProducersResponse {
            kind,
            commodity: Commodity::CrudeOil,
            latest_period: period,
            units,
            rows: ranked,
            provenance,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::clock::ManualClock;
    use crate::model::{LatestReading, RegionKind};

    /// Serves canned readings by region code; unlisted codes report nothing.
    struct CannedSource {
        kind: RegionKind,
        readings: HashMap<&'static str, Result<Option<LatestReading>, ConnectorError>>,
        calls: AtomicUsize,
    }

    impl CannedSource {
        fn new(kind: RegionKind) -> Self {
            Self {
                kind,
                readings: HashMap::new(),
                calls: AtomicUsize::new(0),
            }
        }

        fn with(mut self, code: &'static str, period: &str, value: f64) -> Self {
            self.readings.insert(
                code,
                Ok(Some(LatestReading {
                    period: period.to_string(),
                    value,
                    units: "MBBL/d".to_string(),
                })),
            );
            self
        }

        fn failing(mut self, code: &'static str, err: ConnectorError) -> Self {
            self.readings.insert(code, Err(err));
            self
        }
    }

    #[async_trait]
    impl LatestProduction for CannedSource {
        fn kind(&self) -> RegionKind {
            self.kind
        }

        fn source_url(&self) -> &str {
            "http://canned.test"
        }

        async fn latest_production(&self, code: &str) -> Result<Option<LatestReading>, ConnectorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.readings.get(code).cloned().unwrap_or(Ok(None))
        }
    }

    fn aggregator(concurrency: usize) -> TopProducers {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        ));
        let config = AggregatorConfig {
            concurrency,
            ..AggregatorConfig::default()
        };
        TopProducers::new(config, clock)
    }

    #[tokio::test]
    async fn ranks_regions_in_the_covered_period() {
        let source = CannedSource::new(RegionKind::UsState)
            .with("TX", "2024-01", 5600.0)
            .with("NM", "2024-01", 1800.0)
            .with("ND", "2024-01", 1200.0)
            .with("OK", "2024-01", 400.0)
            .with("AK", "2023-12", 420.0)
            .failing("CO", ConnectorError::Upstream("HTTP 503".into()));

        let resp = aggregator(5).get_top_producers(&source, 3).await.unwrap();

        assert_eq!(resp.latest_period, "2024-01");
        assert_eq!(resp.units, "MBBL/d");
        let codes: Vec<_> = resp.rows.iter().map(|r| r.region.code.as_str()).collect();
        assert_eq!(codes, vec!["TX", "NM", "ND"]);
        assert_eq!(resp.rows[2].rank, Some(3));
        assert_eq!(
            resp.provenance.notes.as_deref(),
            Some("Ranking based on production in 2024-01.")
        );
    }

    #[tokio::test]
    async fn every_catalog_region_is_tried_once() {
        let source = CannedSource::new(RegionKind::CaProvince).with("AB", "2024-02", 3900.0);
        aggregator(2).get_top_producers(&source, 10).await.unwrap();
        assert_eq!(
            source.calls.load(Ordering::SeqCst),
            regions::list(RegionKind::CaProvince).len()
        );
    }

    #[tokio::test]
    async fn nothing_collected_is_no_data() {
        let source = CannedSource::new(RegionKind::CaProvince)
            .failing("AB", ConnectorError::Upstream("down".into()));
        let result = aggregator(5).get_top_producers(&source, 10).await;
        assert!(matches!(result, Err(ConnectorError::NoData(_))));
    }

    #[tokio::test]
    async fn configuration_error_is_not_absorbed() {
        let source = CannedSource::new(RegionKind::UsState)
            .with("TX", "2024-01", 5600.0)
            .failing("NM", ConnectorError::Configuration("EIA_API_KEY is not set".into()));
        let result = aggregator(5).get_top_producers(&source, 10).await;
        assert!(matches!(result, Err(ConnectorError::Configuration(_))));
    }
}
