pub mod accounts;
pub mod api;
pub mod config;
pub mod costing;
pub mod error;
pub mod metrics_server;
pub mod observability;
pub mod recommend;
pub mod sources;
pub mod store;
pub mod validation;

pub use error::PricingError;
