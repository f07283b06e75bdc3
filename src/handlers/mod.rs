mod health;
mod metrics;
mod weather;

use axum::{
    Router,
    routing::get,
};
use std::sync::Arc;

use crate::state::AppState;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use weather::{serve_weather, weather_handler};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/weather", get(weather_handler).post(weather_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}
