//! HTTP API and async service layer for tracechain.
//!
//! - [`SupplyChain`]: shared ledger, network and products with serialised mining
//! - [`routes::router`]: the axum application
//! - [`ServerConfig`]: flags and `TRACECHAIN_*` environment variables

pub mod config;
pub mod error;
pub mod routes;
pub mod service;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::ApiError;
pub use routes::router;
pub use service::{ChainEvent, ProductTrace, RouteReport, ServiceError, SupplyChain};
pub use telemetry::init_tracing;
