use axum::http::HeaderValue;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::ResponseCache;
use crate::rate_limit::RateLimiter;
use crate::upstream::Fetcher;

// app's shared state
pub struct AppState {
    pub rate_limiter: RateLimiter,
    pub cache: Arc<ResponseCache>, // shared with the janitor task
    pub ttl: Duration,             // how long cache will be valid
    pub fetcher: Arc<dyn Fetcher>,
    pub allowed_origin: HeaderValue,
}
