use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{LatestReading, Provenance, RegionKind, SeriesResponse, TopProducersResponse};
use crate::error::ConnectorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Ok,
    Degraded,
}

/// Stable error codes exposed to downstream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    ConfigurationError,
    UpstreamError,
    UpstreamTimeout,
    NotAvailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub code: ErrorCode,
    pub message: String,
}

/// Transport wrapper around a connector result.
///
/// Build it with [`ResultEnvelope::ok`] or [`ResultEnvelope::degraded`]; those
/// are what pair `status = ok` with data and `status = degraded` with an
/// error. The fields stay public for deserialization and are not checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope<T> {
    pub status: EnvelopeStatus,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EnvelopeError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl<T> ResultEnvelope<T> {
    pub fn ok(data: T, provenance: Option<Provenance>) -> Self {
        Self {
            status: EnvelopeStatus::Ok,
            data: Some(data),
            error: None,
            provenance,
        }
    }

    pub fn degraded(code: ErrorCode, message: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            status: EnvelopeStatus::Degraded,
            data: None,
            error: Some(EnvelopeError {
                code,
                message: message.into(),
            }),
            provenance: Some(provenance),
        }
    }

    /// Degraded envelope for a connector failure, with provenance naming the
    /// upstream responsible for `kind`.
    pub fn from_error(err: &ConnectorError, kind: RegionKind, now: DateTime<Utc>) -> Self {
        Self::degraded(err.code(), err.to_string(), fallback_provenance(kind, now))
    }

    pub fn is_ok(&self) -> bool {
        self.status == EnvelopeStatus::Ok
    }
}

/// Provenance attached to degraded responses where no upstream record exists.
pub fn fallback_provenance(kind: RegionKind, now: DateTime<Utc>) -> Provenance {
    Provenance::new(kind.source_name(), "N/A", now)
}

/// Payloads that may carry their own provenance record.
pub trait HasProvenance {
    fn provenance_mut(&mut self) -> Option<&mut Provenance>;
}

impl HasProvenance for SeriesResponse {
    fn provenance_mut(&mut self) -> Option<&mut Provenance> {
        Some(&mut self.provenance)
    }
}

impl HasProvenance for TopProducersResponse {
    fn provenance_mut(&mut self) -> Option<&mut Provenance> {
        Some(&mut self.provenance)
    }
}

impl HasProvenance for Option<LatestReading> {
    fn provenance_mut(&mut self) -> Option<&mut Provenance> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_envelope_carries_data_without_error() {
        let env = ResultEnvelope::ok(vec![1, 2, 3], None);
        assert!(env.is_ok());
        assert_eq!(env.data.as_deref(), Some(&[1, 2, 3][..]));
        assert!(env.error.is_none());
    }

    #[test]
    fn degraded_envelope_from_not_available() {
        let err = ConnectorError::NotAvailable("provincial reserves".into());
        let env: ResultEnvelope<()> = ResultEnvelope::from_error(&err, RegionKind::CaProvince, Utc::now());
        assert_eq!(env.status, EnvelopeStatus::Degraded);
        assert!(env.data.is_none());
        assert_eq!(env.error.as_ref().map(|e| e.code), Some(ErrorCode::NotAvailable));
        assert_eq!(
            env.provenance.as_ref().map(|p| p.source_name.as_str()),
            Some("CER")
        );
    }

    #[test]
    fn degraded_serializes_null_data_and_error_code() {
        let err = ConnectorError::Upstream("EIA API error: 503".into());
        let env: ResultEnvelope<u8> = ResultEnvelope::from_error(&err, RegionKind::UsState, Utc::now());
        let json = serde_json::to_value(&env).unwrap_or_default();
        assert_eq!(json["status"], "degraded");
        assert!(json["data"].is_null());
        assert_eq!(json["error"]["code"], "UPSTREAM_ERROR");
    }
}
