//! Error taxonomy for connectors, the aggregator, and ingestion.

use thiserror::Error;

use crate::model::{ErrorCode, RegionKind};

/// Failure of a connector-level operation.
///
/// Per-record problems inside a batch ingest are never represented here;
/// they are accumulated in the batch result instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConnectorError {
    /// A required setting (usually the EIA credential) is missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Non-2xx response or transport failure.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Upstream payload did not have the expected shape.
    #[error("schema error: {0}")]
    Schema(String),

    /// The feed is categorically not offered for this combination.
    #[error("not available: {0}")]
    NotAvailable(String),

    /// Transport succeeded but nothing usable came back.
    #[error("no data: {0}")]
    NoData(String),

    #[error("unknown region code \"{code}\" for {kind}")]
    UnknownRegion { kind: RegionKind, code: String },

    #[error("unsupported connector: {0}")]
    UnsupportedConnector(String),
}

impl ConnectorError {
    /// Fatal errors must reach the caller even inside partial-failure
    /// tolerant pipelines.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Envelope code reported to downstream consumers.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Configuration(_) => ErrorCode::ConfigurationError,
            Self::Upstream(_) | Self::Schema(_) | Self::NoData(_) => ErrorCode::UpstreamError,
            Self::NotAvailable(_) => ErrorCode::NotAvailable,
            Self::UnknownRegion { .. } | Self::UnsupportedConnector(_) => ErrorCode::BadRequest,
        }
    }
}
