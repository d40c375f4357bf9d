//! Canonical value types shared by every connector.

/// Transport envelope wrapping a result with status and provenance.
pub mod envelope;
pub mod types;

pub use envelope::{
    EnvelopeError, EnvelopeStatus, ErrorCode, HasProvenance, ResultEnvelope, fallback_provenance,
};
pub use types::{
    Commodity, DateRange, Frequency, LatestReading, Provenance, RegionKind, RegionRef,
    SeriesResponse, TimeSeriesPoint, TopProducerRow, TopProducersResponse, coerce_number,
};
