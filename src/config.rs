use clap::{Parser, ValueEnum};
use reqwest::Url;
use std::fmt;
use std::time::Duration;

use crate::cache::{DEFAULT_CLEANUP_INTERVAL, DEFAULT_TTL, MAX_TTL};

// Upper bound for --upstream-timeout, in seconds
pub const MAX_UPSTREAM_TIMEOUT_SECS: u64 = 300;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "weather-proxy")]
#[command(about = "Caching, rate limited proxy for the OpenWeather One Call API")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8000)]
    pub port: u16,

    // Upstream One Call endpoint
    #[arg(long, default_value = "https://api.openweathermap.org/data/3.0/onecall")]
    pub upstream_url: Url,

    // Upstream credential, never echoed back to callers
    #[arg(long, env = "OPEN_WEATHER_TOKEN", hide_env_values = true)]
    pub api_key: Credential,

    // Value of Access-Control-Allow-Origin on successful responses
    #[arg(long, default_value = "http://localhost:8080")]
    pub allowed_origin: String,

    // Cache TTL in seconds, at most a week
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_TTL.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..=MAX_TTL.as_secs())
    )]
    pub cache_ttl: u64,

    // Expired cache entry sweep interval in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CLEANUP_INTERVAL.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub cleanup_interval: u64,

    // Token bucket capacity per client
    #[arg(long, default_value_t = 1.0)]
    pub rate_capacity: f64,

    // Tokens refilled per second per client
    #[arg(long, default_value_t = 1.0)]
    pub rate_refill: f64,

    // Upstream request timeout in seconds
    #[arg(
        long,
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..=MAX_UPSTREAM_TIMEOUT_SECS)
    )]
    pub upstream_timeout: u64,

    // Fallback filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Args {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Upstream API key. `Debug` and `Display` are redacted so the value can
/// sit inside logged structs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<String> for Credential {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_is_redacted_in_debug_output() {
        let args = Args::parse_from(["weather-proxy", "--api-key", "s3cr3t"]);
        let rendered = format!("{:?}", args);
        assert!(!rendered.contains("s3cr3t"));
        assert_eq!(args.api_key.expose(), "s3cr3t");
    }

    #[test]
    fn defaults_match_reference_deployment() {
        let args = Args::parse_from(["weather-proxy", "--api-key", "k"]);
        assert_eq!(args.port, 8000);
        assert_eq!(args.cache_ttl(), Duration::from_secs(30 * 60));
        assert_eq!(args.cleanup_interval(), Duration::from_secs(10 * 60));
        assert_eq!(args.rate_capacity, 1.0);
        assert_eq!(args.rate_refill, 1.0);
        assert_eq!(args.log_format, LogFormat::Pretty);
    }

    fn parse_with(flag: &str, value: &str) -> Result<Args, clap::Error> {
        Args::try_parse_from(["weather-proxy", "--api-key", "k", flag, value])
    }

    #[test]
    fn zero_cleanup_interval_is_rejected() {
        assert!(parse_with("--cleanup-interval", "0").is_err());
        let args = parse_with("--cleanup-interval", "1").unwrap();
        assert_eq!(args.cleanup_interval(), Duration::from_secs(1));
    }

    #[test]
    fn cache_ttl_is_bounded() {
        assert!(parse_with("--cache-ttl", "0").is_err());
        assert!(parse_with("--cache-ttl", "18446744073709551615").is_err());
        assert!(parse_with("--cache-ttl", &(MAX_TTL.as_secs() + 1).to_string()).is_err());

        let args = parse_with("--cache-ttl", &MAX_TTL.as_secs().to_string()).unwrap();
        assert_eq!(args.cache_ttl(), MAX_TTL);
    }

    #[test]
    fn upstream_timeout_is_bounded() {
        assert!(parse_with("--upstream-timeout", "0").is_err());
        assert!(parse_with("--upstream-timeout", "301").is_err());
        let args = parse_with("--upstream-timeout", "300").unwrap();
        assert_eq!(args.upstream_timeout(), Duration::from_secs(300));
    }
}
