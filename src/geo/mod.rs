//! Postal-code resolution and radius regions for proximity search.

pub mod geocoder;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use geocoder::{GeocodedLocation, Geocoder, MapQuestGeocoder, StaticGeocoder};

pub const EARTH_RADIUS_MILES: f64 = 3963.0;
pub const EARTH_RADIUS_KM: f64 = 6378.0;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeoError {
    #[error("Invalid distance: {0}")]
    InvalidDistance(String),

    #[error("Invalid distance unit: {0}")]
    InvalidUnit(String),

    #[error("No location found for '{0}'")]
    NotFound(String),

    #[error("Geocoder failure: {0}")]
    Resolution(String),

    #[error("Geocoder did not answer within {0:?}")]
    Timeout(Duration),
}

/// WGS84 coordinates in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Read a GeoJSON point (`{"coordinates": [lng, lat]}`)
    pub fn from_geojson(value: &Value) -> Option<Self> {
        let coords = value.get("coordinates")?.as_array()?;
        let longitude = coords.first()?.as_f64()?;
        let latitude = coords.get(1)?.as_f64()?;
        Some(Self { latitude, longitude })
    }

    /// Central angle to another point, in radians
    pub fn angle_to(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let dlat = lat2 - lat1;
        let dlng = (other.longitude - self.longitude).to_radians();
        let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        2.0 * h.sqrt().min(1.0).asin()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Miles,
    Kilometers,
}

impl DistanceUnit {
    pub fn earth_radius(&self) -> f64 {
        match self {
            DistanceUnit::Miles => EARTH_RADIUS_MILES,
            DistanceUnit::Kilometers => EARTH_RADIUS_KM,
        }
    }
}

impl FromStr for DistanceUnit {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mi" | "mile" | "miles" => Ok(DistanceUnit::Miles),
            "km" | "kilometer" | "kilometers" | "kilometre" | "kilometres" => Ok(DistanceUnit::Kilometers),
            other => Err(GeoError::InvalidUnit(other.to_string())),
        }
    }
}

/// Spherical cap: every point within `radius` radians of `center`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub center: GeoPoint,
    pub radius: f64,
}

impl Region {
    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.center.angle_to(point) <= self.radius
    }
}

/// Parse a distance path segment; rejects anything that is not a finite,
/// non-negative number
pub fn parse_distance(raw: &str) -> Result<f64, GeoError> {
    let distance: f64 = raw
        .trim()
        .parse()
        .map_err(|_| GeoError::InvalidDistance(raw.to_string()))?;
    check_distance(distance)?;
    Ok(distance)
}

fn check_distance(distance: f64) -> Result<(), GeoError> {
    if !distance.is_finite() || distance < 0.0 {
        return Err(GeoError::InvalidDistance(distance.to_string()));
    }
    Ok(())
}

/// Convert a linear distance into an angular radius around `center`
pub fn radius_query(center: GeoPoint, distance: f64, unit: DistanceUnit) -> Result<Region, GeoError> {
    check_distance(distance)?;
    Ok(Region { center, radius: distance / unit.earth_radius() })
}

/// Geocoding front end with a bounded wait on the external service
#[derive(Clone)]
pub struct GeoResolver {
    geocoder: Arc<dyn Geocoder>,
    timeout: Duration,
}

impl GeoResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>, timeout: Duration) -> Self {
        Self { geocoder, timeout }
    }

    pub async fn locate(&self, query: &str) -> Result<GeocodedLocation, GeoError> {
        match tokio::time::timeout(self.timeout, self.geocoder.geocode(query)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Geocoder timed out after {:?} for '{}'", self.timeout, query);
                Err(GeoError::Timeout(self.timeout))
            }
        }
    }

    pub async fn resolve(&self, postal_code: &str) -> Result<GeoPoint, GeoError> {
        Ok(self.locate(postal_code).await?.point)
    }
}
