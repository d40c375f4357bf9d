//! Lookup of ingestion connectors by source type.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::ConnectorError;
use crate::http::HttpTransport;
use crate::ingestion::{
    CsvConnector, IngestionConnector, MqttConnector, OpcUaConnector, RestConnector,
    WitsmlConnector,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectorKind {
    Csv,
    Rest,
    OpcUa,
    Mqtt,
    Witsml,
}

impl ConnectorKind {
    pub const ALL: [ConnectorKind; 5] = [Self::Csv, Self::Rest, Self::OpcUa, Self::Mqtt, Self::Witsml];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Rest => "REST",
            Self::OpcUa => "OPC_UA",
            Self::Mqtt => "MQTT",
            Self::Witsml => "WITSML",
        }
    }

    /// Human-readable protocol name.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::OpcUa => "OPC UA",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectorKind {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| ConnectorError::UnsupportedConnector(s.to_string()))
    }
}

/// One connector instance per source type.
pub struct IngestionRegistry {
    connectors: HashMap<ConnectorKind, Arc<dyn IngestionConnector>>,
}

impl IngestionRegistry {
    /// Registers the built-in connector for every [`ConnectorKind`].
    pub fn new(transport: Arc<dyn HttpTransport>, clock: Arc<dyn Clock>) -> Self {
        let mut registry = Self {
            connectors: HashMap::new(),
        };
        registry.register(Arc::new(CsvConnector::new(clock.clone())));
        registry.register(Arc::new(RestConnector::new(transport, clock.clone())));
        registry.register(Arc::new(OpcUaConnector::new(clock.clone())));
        registry.register(Arc::new(MqttConnector::new(clock.clone())));
        registry.register(Arc::new(WitsmlConnector::new(clock)));
        registry
    }

    /// Installs `connector`, replacing any previous one of the same kind.
    pub fn register(&mut self, connector: Arc<dyn IngestionConnector>) {
        self.connectors.insert(connector.kind(), connector);
    }

    /// # Errors
    ///
    /// [`ConnectorError::UnsupportedConnector`] when nothing is registered
    /// for `kind`.
    pub fn get(&self, kind: ConnectorKind) -> Result<Arc<dyn IngestionConnector>, ConnectorError> {
        self.connectors
            .get(&kind)
            .cloned()
            .ok_or_else(|| ConnectorError::UnsupportedConnector(kind.to_string()))
    }

    /// Looks a connector up by its type name (`CSV`, `REST`, `OPC_UA`, ...).
    ///
    /// # Errors
    ///
    /// [`ConnectorError::UnsupportedConnector`] for an unknown name.
    pub fn get_by_name(&self, name: &str) -> Result<Arc<dyn IngestionConnector>, ConnectorError> {
        self.get(name.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::clock::ManualClock;
    use crate::http::FixtureTransport;

    fn registry() -> IngestionRegistry {
        IngestionRegistry::new(
            Arc::new(FixtureTransport::new()),
            Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())),
        )
    }

    #[test]
    fn kind_names_parse_case_insensitively() {
        assert_eq!("csv".parse::<ConnectorKind>(), Ok(ConnectorKind::Csv));
        assert_eq!("opc-ua".parse::<ConnectorKind>(), Ok(ConnectorKind::OpcUa));
        assert!(matches!(
            "modbus".parse::<ConnectorKind>(),
            Err(ConnectorError::UnsupportedConnector(_))
        ));
    }

    #[test]
    fn every_kind_is_registered() {
        let registry = registry();
        for kind in ConnectorKind::ALL {
            let connector = registry.get(kind);
            assert!(connector.is_ok(), "missing connector for {kind}");
            assert_eq!(connector.map(|c| c.kind()), Ok(kind));
        }
    }

    #[test]
    fn unknown_name_is_unsupported() {
        assert!(matches!(
            registry().get_by_name("SOAP"),
            Err(ConnectorError::UnsupportedConnector(_))
        ));
    }
}
