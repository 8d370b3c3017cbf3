//! HTTP surface for the footprint pipeline: SODA sources, the inference
//! resolver, routes and metrics.

pub mod config;
pub mod error;
pub mod llm;
pub mod metrics;
pub mod routes;
pub mod socrata;
pub mod state;

pub use config::Config;
pub use error::ApiError;
pub use metrics::Metrics;
pub use routes::build_router;
pub use state::AppState;
