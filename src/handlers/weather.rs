use axum::{
    extract::{ConnectInfo, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::Instrument;

use crate::error::ProxyError;
use crate::metrics::{
    CACHE_HITS, CACHE_MISSES, CACHE_SIZE, RATE_LIMITED, REQUEST_TOTAL, TRACKED_CLIENTS,
    UPSTREAM_ERRORS,
};
use crate::models::WeatherQuery;
use crate::state::AppState;

/// Rate check, normalize, cache lookup, then fetch and store on a miss.
///
/// No lock is held while the upstream call is in flight, so two concurrent
/// misses for the same key both fetch and the later write wins.
pub async fn serve_weather(
    state: &AppState,
    client: &str,
    query: &WeatherQuery,
) -> Result<Bytes, ProxyError> {
    REQUEST_TOTAL.inc();

    let allowed = state.rate_limiter.allow(client);
    TRACKED_CLIENTS.set(state.rate_limiter.len() as f64);
    if !allowed {
        RATE_LIMITED.inc();
        tracing::warn!(client, "Rate limit exceeded");
        return Err(ProxyError::RateLimitExceeded);
    }

    let normalized = query.normalize()?;
    let key = normalized.cache_key();

    tracing::info!(
        client,
        lat = %normalized.lat,
        lon = %normalized.lon,
        exclude = %normalized.exclude,
        units = %normalized.units,
        "Weather request"
    );

    if let Some(body) = state.cache.get(&key) {
        CACHE_HITS.inc();
        tracing::debug!(%key, "Cache HIT");
        return Ok(body);
    }
    CACHE_MISSES.inc();
    tracing::debug!(%key, "Cache MISS - calling upstream");

    let body = match state.fetcher.fetch(&normalized).await {
        Ok(body) => body,
        Err(e) => {
            UPSTREAM_ERRORS.with_label_values(&[e.kind()]).inc();
            tracing::warn!(error = %e, "Upstream fetch failed");
            return Err(e);
        }
    };

    state.cache.set(key, body.clone(), state.ttl);
    CACHE_SIZE.set(state.cache.len() as f64);

    Ok(body)
}

pub async fn weather_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<WeatherQuery>,
) -> Result<Response, ProxyError> {
    let client = addr.ip().to_string();
    let span = tracing::info_span!("weather_request", client = %client);
    let body = serve_weather(&state, &client, &query)
        .instrument(span)
        .await?;

    Ok((
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, state.allowed_origin.clone()),
            (
                header::CONTENT_TYPE,
                header::HeaderValue::from_static("text/plain; charset=utf-8"),
            ),
        ],
        body,
    )
        .into_response())
}
