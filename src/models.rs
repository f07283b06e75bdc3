use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::ProxyError;

// Decimal places kept for lat/lon, about 110 m at the equator
pub const COORDINATE_PRECISION: usize = 3;

// Inbound query, all fields arrive as strings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WeatherQuery {
    #[serde(default)]
    pub lat: String,
    #[serde(default)]
    pub lon: String,
    #[serde(default)]
    pub exclude: String,
    #[serde(default)]
    pub units: String,
}

/// Query after validation. Coordinates are already rounded, so this is what
/// gets sent upstream and what the cache key is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
    pub lat: String,
    pub lon: String,
    pub exclude: String,
    pub units: String,
}

impl WeatherQuery {
    pub fn normalize(&self) -> Result<NormalizedQuery, ProxyError> {
        let lat = normalize_coordinate(&self.lat)
            .ok_or(ProxyError::InvalidCoordinate { field: "lat" })?;
        let lon = normalize_coordinate(&self.lon)
            .ok_or(ProxyError::InvalidCoordinate { field: "lon" })?;

        Ok(NormalizedQuery {
            lat,
            lon,
            exclude: self.exclude.clone(),
            units: self.units.clone(),
        })
    }
}

impl NormalizedQuery {
    // Each field is length-prefixed so "a,b"+"c" never collides with "a"+"b,c"
    pub fn cache_key(&self) -> CacheKey {
        let mut hasher = Sha256::new();
        for field in [&self.lat, &self.lon, &self.exclude, &self.units] {
            hasher.update((field.len() as u64).to_be_bytes());
            hasher.update(field.as_bytes());
        }
        CacheKey(format!("{:x}", hasher.finalize()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse a coordinate and round it half away from zero to
/// [`COORDINATE_PRECISION`] places. Returns `None` for anything that is not a
/// finite number.
///
/// Rounding works on the shortest decimal form of the parsed value, so
/// `-33.9265` becomes `-33.927` wherever its binary form falls around the
/// halfway point.
pub fn normalize_coordinate(raw: &str) -> Option<String> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }

    // f64 Display never uses exponent notation
    let repr = value.abs().to_string();
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().chain(std::iter::repeat(b'0')).take(COORDINATE_PRECISION))
        .map(|b| b - b'0')
        .collect();

    let round_up = frac_part
        .as_bytes()
        .get(COORDINATE_PRECISION)
        .is_some_and(|d| *d >= b'5');

    if round_up {
        let mut carry = true;
        for d in digits.iter_mut().rev() {
            if *d == 9 {
                *d = 0;
            } else {
                *d += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, 1);
        }
    }

    let split = digits.len() - COORDINATE_PRECISION;
    let render = |ds: &[u8]| ds.iter().map(|d| char::from(b'0' + d)).collect::<String>();
    let int_digits = render(&digits[..split]);
    let frac_digits = render(&digits[split..]);

    // no "-0.000"
    let negative = value < 0.0 && digits.iter().any(|d| *d != 0);
    let sign = if negative { "-" } else { "" };

    Some(format!("{}{}.{}", sign, int_digits, frac_digits))
}
