//! Regional upstream connectors.

pub mod cer;
pub mod eia;

pub use cer::CerConnector;
pub use eia::EiaConnector;
