//! Regional crude oil production and reserves feeds for US states and
//! Canadian provinces, with a top-producers ranking and generic ingestion
//! connectors.

pub mod aggregate;
#[cfg(feature = "api")]
pub mod api;
pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
/// EIA and CER upstream connectors.
pub mod connectors;
pub mod error;
pub mod http;
pub mod ingestion;
pub mod model;
pub mod regions;
pub mod service;

pub use error::ConnectorError;
pub use service::EnergyFeeds;
