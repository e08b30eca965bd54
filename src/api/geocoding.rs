use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;

use crate::{app_error::AppError, domain::geo::GeoPoint};

/// Address → coordinates collaborator, consulted once at registration.
pub trait Geocoder: Send + Sync {
    fn geocode<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<Option<GeoPoint>, AppError>>;
}

#[derive(Deserialize)]
struct GeocodeRes {
    latitude: f64,
    longitude: f64,
}

/// Calls `GET {base_url}/geocode?address=...`; a 404 means the address is unknown.
pub struct HttpGeocoder {
    client: Client,
    base_url: String,
}

impl HttpGeocoder {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl Geocoder for HttpGeocoder {
    fn geocode<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<Option<GeoPoint>, AppError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(format!("{}/geocode", self.base_url.trim_end_matches('/')))
                .query(&[("address", address)])
                .send()
                .await
                .map_err(|_| AppError::ServiceUnreachable("GeocodingService".into()))?;

            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }

            let body: GeocodeRes = response
                .error_for_status()
                .map_err(|_| AppError::ServiceUnreachable("GeocodingService".into()))?
                .json()
                .await
                .map_err(|err| AppError::Other(anyhow::anyhow!("Failed to parse geocoding JSON: {}", err)))?;

            Ok(Some(GeoPoint::new(body.latitude, body.longitude)))
        })
    }
}

/// Deterministic stand-in: hashes the address into a point inside a fixed
/// bounding box, so the same address always lands on the same spot.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubGeocoder;

impl StubGeocoder {
    const LAT_RANGE: (f64, f64) = (13.5, 14.0);
    const LON_RANGE: (f64, f64) = (100.3, 100.9);

    pub fn locate(address: &str) -> Option<GeoPoint> {
        let normalized = address.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }

        // FNV-1a
        let hash = normalized
            .bytes()
            .fold(0xcbf29ce484222325u64, |acc, b| (acc ^ b as u64).wrapping_mul(0x100000001b3));

        let lat_frac = (hash & 0xffff_ffff) as f64 / u32::MAX as f64;
        let lon_frac = (hash >> 32) as f64 / u32::MAX as f64;

        Some(GeoPoint::new(
            Self::LAT_RANGE.0 + lat_frac * (Self::LAT_RANGE.1 - Self::LAT_RANGE.0),
            Self::LON_RANGE.0 + lon_frac * (Self::LON_RANGE.1 - Self::LON_RANGE.0),
        ))
    }
}

impl Geocoder for StubGeocoder {
    fn geocode<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<Option<GeoPoint>, AppError>> {
        Box::pin(async move { Ok(Self::locate(address)) })
    }
}
