//! Cross-region aggregation: the bounded fetch pool, period selection, and
//! the top-producers ranking built on them.

pub mod pool;
pub mod ranking;
pub mod top_producers;

use async_trait::async_trait;

use crate::error::ConnectorError;
use crate::model::{LatestReading, RegionKind};

pub use pool::drain_bounded;
pub use ranking::{rank_rows, select_period};
pub use top_producers::TopProducers;

/// A source of per-region latest production readings for one region family.
#[async_trait]
pub trait LatestProduction: Send + Sync {
    fn kind(&self) -> RegionKind;

    /// Where the readings come from, for provenance.
    fn source_url(&self) -> &str;

    /// Most recent production reading for `code`, or `None` when the region
    /// reports nothing.
    async fn latest_production(&self, code: &str) -> Result<Option<LatestReading>, ConnectorError>;
}
