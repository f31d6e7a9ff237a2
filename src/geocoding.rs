//! Address resolution.
//!
//! The core only consumes the [`Geocoder`] trait; [`NominatimGeocoder`] talks
//! to any Nominatim-compatible HTTP endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{error::AppError, models::reservation::GeoPoint};

/// A resolved place.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub location: GeoPoint,

    /// Normalized address as reported by the geocoder
    pub address: String,
}

/// Forward and reverse geocoding.
///
/// `Ok(None)` means the service answered but found nothing; transport
/// failures are `Err(AppError::Upstream)`.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn forward(&self, address: &str) -> Result<Option<Place>, AppError>;

    async fn reverse(&self, lat: f64, lon: f64) -> Result<Option<String>, AppError>;
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct ReverseHit {
    display_name: Option<String>,
}

/// Nominatim HTTP client.
///
/// # Endpoints
///
/// - `GET {base}/search?format=json&limit=1&q=...`
/// - `GET {base}/reverse?format=json&lat=...&lon=...`
///
/// # Timeout
///
/// 5 seconds per request
#[derive(Clone)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: url::Url,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self, AppError> {
        let mut base_url = url::Url::parse(base_url)
            .map_err(|e| AppError::Internal(format!("Invalid geocoder URL: {e}")))?;

        match base_url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(AppError::Internal(format!(
                    "Geocoder URL must use HTTP or HTTPS, got {other}"
                )));
            }
        }

        // `join` replaces the last segment unless the path ends in a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .user_agent(user_agent)
            .build()
            .map_err(|e| AppError::Internal(format!("HTTP client error: {e}")))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<url::Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::Internal(format!("Invalid geocoder path: {e}")))
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn forward(&self, address: &str) -> Result<Option<Place>, AppError> {
        let url = self.endpoint("search")?;
        let hits: Vec<SearchHit> = self
            .client
            .get(url)
            .query(&[("format", "json"), ("limit", "1"), ("q", address)])
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| AppError::Upstream(e.to_string()))?
            .json()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        let Some(hit) = hits.into_iter().next() else {
            return Ok(None);
        };

        let (Ok(lat), Ok(lon)) = (hit.lat.parse::<f64>(), hit.lon.parse::<f64>()) else {
            tracing::warn!(address = %address, "Geocoder returned non-numeric coordinates");
            return Ok(None);
        };

        Ok(Some(Place {
            location: GeoPoint { lon, lat },
            address: hit.display_name,
        }))
    }

    async fn reverse(&self, lat: f64, lon: f64) -> Result<Option<String>, AppError> {
        let url = self.endpoint("reverse")?;
        let hit: ReverseHit = self
            .client
            .get(url)
            .query(&[
                ("format", "json".to_string()),
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
            ])
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| AppError::Upstream(e.to_string()))?
            .json()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        // Nominatim answers `{"error": "Unable to geocode"}` for open water etc.
        Ok(hit.display_name)
    }
}
