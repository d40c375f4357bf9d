//! Field-telemetry and equipment-log protocols that are not wired up yet.
//!
//! Each connector answers `fetch` with an [`IngestionStatus::Unimplemented`]
//! result carrying one explanatory error, so callers can tell "not
//! connected" apart from "no data".

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::clock::Clock;
use crate::error::ConnectorError;
use crate::ingestion::{
    ConnectorKind, FetchOptions, IngestionConnector, IngestionMetadata, IngestionResult,
    IngestionStatus, ProductionRecord, RawRecord,
};

fn unimplemented_result(kind: ConnectorKind, source: &str, clock: &dyn Clock) -> IngestionResult {
    warn!(%kind, source, "ingestion connector is not implemented");
    IngestionResult {
        data: Vec::new(),
        errors: vec![format!("{} connector is not implemented", kind.display_name())],
        metadata: IngestionMetadata {
            total_records: 0,
            valid_records: 0,
            failed_records: 0,
            source: source.to_string(),
            timestamp: clock.now(),
        },
        status: IngestionStatus::Unimplemented,
    }
}

macro_rules! protocol_stub {
    ($(#[$doc:meta])* $name:ident, $kind:expr) => {
        $(#[$doc])*
        pub struct $name {
            clock: Arc<dyn Clock>,
        }

        impl $name {
            pub fn new(clock: Arc<dyn Clock>) -> Self {
                Self { clock }
            }
        }

        #[async_trait]
        impl IngestionConnector for $name {
            fn kind(&self) -> ConnectorKind {
                $kind
            }

            async fn fetch(
                &self,
                source: &str,
                _options: &FetchOptions,
            ) -> Result<IngestionResult, ConnectorError> {
                Ok(unimplemented_result($kind, source, self.clock.as_ref()))
            }

            fn validate(&self, _record: &RawRecord) -> bool {
                false
            }

            fn normalize(&self, _record: &RawRecord) -> Option<ProductionRecord> {
                None
            }
        }
    };
}

protocol_stub!(
    /// OPC UA server endpoint (SCADA historian).
    OpcUaConnector,
    ConnectorKind::OpcUa
);
protocol_stub!(
    /// MQTT broker subscription.
    MqttConnector,
    ConnectorKind::Mqtt
);
protocol_stub!(
    /// WITSML store for drilling and well logs.
    WitsmlConnector,
    ConnectorKind::Witsml
);

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::clock::ManualClock;

    #[tokio::test]
    async fn stubs_report_unimplemented_with_one_error() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let stubs: Vec<Box<dyn IngestionConnector>> = vec![
            Box::new(OpcUaConnector::new(clock.clone())),
            Box::new(MqttConnector::new(clock.clone())),
            Box::new(WitsmlConnector::new(clock)),
        ];
        for stub in stubs {
            let result = stub.fetch("opc.tcp://plc:4840", &FetchOptions::default()).await.unwrap();
            assert_eq!(result.status, IngestionStatus::Unimplemented);
            assert!(result.data.is_empty());
            assert_eq!(result.errors.len(), 1);
            assert_eq!(result.metadata.total_records, 0);
            assert!(!stub.validate(&RawRecord::new()));
        }
    }
}
