//! Caching, rate limited reverse proxy for a geolocated weather API.
//!
//! Each request passes a per-client token bucket, gets its coordinates
//! rounded into a cache key, and is answered from the response cache or
//! from a single upstream GET carrying the server-held credential.

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod state;
pub mod upstream;

pub use error::ProxyError;
pub use handlers::router;
pub use state::AppState;
