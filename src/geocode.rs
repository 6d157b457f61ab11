//! Place-name geocoding with best-match selection.
//!
//! This module resolves the candidate place names of one news entry to a
//! single coordinate. Geocoding services ask clients to stay polite, so
//! lookups are strictly sequential and optionally spaced out.
//!
//! # Architecture
//!
//! The module uses a trait-based design for flexibility:
//! - [`Geocoder`]: Core trait defining a single async place lookup
//! - [`NominatimGeocoder`]: OpenStreetMap Nominatim search over HTTP
//! - [`Throttled`]: Decorator enforcing a minimum gap between requests
//! - [`resolve_best`]: Tries every candidate and keeps the most important match
//!
//! # Selection
//!
//! Every candidate is looked up, even after a match is found. A later
//! match replaces the current best only when its importance is strictly
//! greater, so ties go to the earlier candidate. Failed lookups are logged
//! and skipped.

use crate::error::LookupError;
use crate::models::{Coordinates, GeocodeResult, UNKNOWN_COUNTRY};
use crate::utils::truncate_for_log;
use rand::{Rng, rng};
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Public Nominatim search endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";

/// Trait for async place lookups.
///
/// Implementors return the top match for a free-text place name, `None`
/// when the service knows no such place, or an error when the request
/// itself failed.
pub trait Geocoder {
    async fn lookup(&self, place: &str) -> Result<Option<GeocodeResult>, LookupError>;
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(deserialize_with = "number_or_string")]
    lat: f64,
    #[serde(deserialize_with = "number_or_string")]
    lon: f64,
    #[serde(default)]
    address: Option<Address>,
    #[serde(default)]
    importance: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Address {
    #[serde(default)]
    country: Option<String>,
}

/// Nominatim sends coordinates as strings; other services send numbers.
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Decode a search response, keeping only the first hit.
pub fn parse_search(body: &str) -> Result<Option<GeocodeResult>, LookupError> {
    let hits: Vec<SearchHit> = serde_json::from_str(body)?;
    Ok(hits.into_iter().next().map(|hit| GeocodeResult {
        coordinates: Coordinates {
            lat: hit.lat,
            lon: hit.lon,
        },
        country: hit
            .address
            .and_then(|a| a.country)
            .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string()),
        importance: hit.importance.unwrap_or(0.0),
    }))
}

/// [`Geocoder`] backed by a Nominatim-compatible search endpoint.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    http: Client,
    endpoint: String,
}

impl NominatimGeocoder {
    pub fn new(http: Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    /// Search URL for one place name. `addressdetails` is needed for the
    /// country to be present in the response.
    pub fn request_url(&self, place: &str) -> Result<Url, LookupError> {
        Ok(Url::parse_with_params(
            &self.endpoint,
            &[
                ("format", "json"),
                ("limit", "1"),
                ("addressdetails", "1"),
                ("q", place),
            ],
        )?)
    }
}

impl Geocoder for NominatimGeocoder {
    #[instrument(level = "debug", skip(self))]
    async fn lookup(&self, place: &str) -> Result<Option<GeocodeResult>, LookupError> {
        let url = self.request_url(place)?;
        let res = self.http.get(url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(LookupError::Status(status));
        }
        let body = res.text().await?;
        parse_search(&body).inspect_err(|e| {
            warn!(
                error = %e,
                body_preview = %truncate_for_log(&body, 300),
                "Geocoder returned non-conforming JSON"
            );
        })
    }
}

/// Wrapper that spaces out requests made through any [`Geocoder`].
///
/// The gap between the end of one request and the start of the next is at
/// least `min_interval` plus a random jitter of up to `max_jitter`.
/// Concurrent callers queue on an internal lock, so the spacing holds even
/// when several refresh cycles overlap.
pub struct Throttled<G> {
    /// The underlying geocoder to wrap.
    inner: G,
    min_interval: Duration,
    max_jitter: Duration,
    /// Completion time of the previous request.
    last_request: Mutex<Option<Instant>>,
}

impl<G: Geocoder> Throttled<G> {
    /// Create a new throttling wrapper around an existing [`Geocoder`].
    ///
    /// # Example
    ///
    /// ```ignore
    /// let geocoder = Throttled::new(nominatim, Duration::from_secs(1), Duration::ZERO);
    /// ```
    pub fn new(inner: G, min_interval: Duration, max_jitter: Duration) -> Self {
        Self {
            inner,
            min_interval,
            max_jitter,
            last_request: Mutex::new(None),
        }
    }

    fn gap(&self) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.min_interval;
        }
        self.min_interval + Duration::from_millis(rng().random_range(0..=jitter_ms))
    }
}

impl<G> fmt::Debug for Throttled<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throttled")
            .field("min_interval", &self.min_interval)
            .field("max_jitter", &self.max_jitter)
            .finish()
    }
}

impl<G: Geocoder> Geocoder for Throttled<G> {
    async fn lookup(&self, place: &str) -> Result<Option<GeocodeResult>, LookupError> {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let gap = self.gap();
            let elapsed = previous.elapsed();
            if elapsed < gap {
                let wait = gap - elapsed;
                debug!(?wait, "Throttling geocoder request");
                sleep(wait).await;
            }
        }
        let res = self.inner.lookup(place).await;
        *last = Some(Instant::now());
        res
    }
}

/// Geocode every candidate in order and keep the most important match.
///
/// # Arguments
///
/// * `geocoder` - The lookup backend
/// * `places` - Candidate place names, in extraction order
///
/// # Returns
///
/// The match with the strictly greatest importance (earliest wins ties),
/// or `None` when no candidate produced a match.
#[instrument(level = "info", skip_all, fields(candidates = places.len()))]
pub async fn resolve_best<G: Geocoder>(geocoder: &G, places: &[String]) -> Option<GeocodeResult> {
    let t0 = std::time::Instant::now();
    let mut best: Option<GeocodeResult> = None;

    for place in places {
        match geocoder.lookup(place).await {
            Ok(Some(found)) => {
                debug!(%place, importance = found.importance, country = %found.country, "Geocoded candidate");
                if best.as_ref().is_none_or(|b| found.importance > b.importance) {
                    best = Some(found);
                }
            }
            Ok(None) => debug!(%place, "No geocoding match"),
            Err(e) => warn!(%place, error = %e, "Geocoding failed; skipping candidate"),
        }
    }

    match &best {
        Some(b) => info!(
            country = %b.country,
            importance = b.importance,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Resolved entry location"
        ),
        None => info!(elapsed_ms = t0.elapsed().as_millis() as u64, "Entry left unmapped"),
    }
    best
}
