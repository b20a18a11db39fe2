//! Synthetic delivery simulator module
//!
//! Stands in for the real drone simulation when exercising the metrics
//! library end to end. It focuses on:
//! - Events that are missed, detected once, or copied along several routes
//! - Late, lost and duplicated depot arrivals
//! - Neighbor discovery rounds with lost acknowledgements and wrong hop counts

pub mod config;
pub mod runner;
pub mod stats;

pub use config::DeliveryScenario;
pub use runner::DeliveryRunner;
