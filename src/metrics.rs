use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, Histogram, register_counter, register_counter_vec, register_gauge,
    register_histogram,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("weather_requests_total", "Total number of weather requests").unwrap();
    pub static ref RATE_LIMITED: Counter = register_counter!(
        "weather_rate_limited_total",
        "Requests rejected by the per-client rate limiter"
    )
    .unwrap();
    pub static ref CACHE_HITS: Counter =
        register_counter!("weather_cache_hits_total", "Total cache hits").unwrap();
    pub static ref CACHE_MISSES: Counter =
        register_counter!("weather_cache_misses_total", "Total cache misses").unwrap();
    pub static ref CACHE_SIZE: Gauge =
        register_gauge!("weather_cache_size", "Current number of items in cache").unwrap();
    pub static ref TRACKED_CLIENTS: Gauge = register_gauge!(
        "weather_rate_limit_clients",
        "Distinct client keys held by the rate limiter"
    )
    .unwrap();
    pub static ref UPSTREAM_ERRORS: CounterVec = register_counter_vec!(
        "weather_upstream_errors_total",
        "Failed upstream fetches by error kind",
        &["kind"]
    )
    .unwrap();
    pub static ref UPSTREAM_LATENCY: Histogram = register_histogram!(
        "weather_upstream_latency_seconds",
        "Upstream fetch latency in seconds"
    )
    .unwrap();
}
