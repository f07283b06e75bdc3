use anyhow::Context;
use axum::http::HeaderValue;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;

use weather_proxy::cache::{ResponseCache, cache_janitor};
use weather_proxy::config::Args;
use weather_proxy::logging::init_logging;
use weather_proxy::rate_limit::RateLimiter;
use weather_proxy::router;
use weather_proxy::state::AppState;
use weather_proxy::upstream::OpenWeatherFetcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.log_format);

    let fetcher = OpenWeatherFetcher::new(
        args.upstream_url.clone(),
        args.api_key.clone(),
        args.upstream_timeout(),
    )
    .context("failed to build upstream HTTP client")?;

    let allowed_origin = HeaderValue::from_str(&args.allowed_origin)
        .context("allowed origin is not a valid header value")?;

    let cache = Arc::new(ResponseCache::new());

    // creating shared state
    let state = Arc::new(AppState {
        rate_limiter: RateLimiter::new(args.rate_capacity, args.rate_refill),
        cache: Arc::clone(&cache),
        ttl: args.cache_ttl(),
        fetcher: Arc::new(fetcher),
        allowed_origin,
    });

    tokio::spawn(cache_janitor(cache, args.cleanup_interval()));

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(%addr, upstream = %args.upstream_url, "Weather proxy listening");
    tracing::info!(
        ttl_secs = args.cache_ttl,
        cleanup_secs = args.cleanup_interval,
        capacity = args.rate_capacity,
        refill_per_sec = args.rate_refill,
        timeout_secs = args.upstream_timeout,
        "Cache and rate limit settings"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}
