use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{GeoError, GeoPoint};

/// Result of geocoding a postal code or free-form address
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedLocation {
    pub point: GeoPoint,
    pub formatted_address: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

impl GeocodedLocation {
    pub fn at(point: GeoPoint) -> Self {
        Self {
            point,
            formatted_address: String::new(),
            street: None,
            city: None,
            state: None,
            zipcode: None,
            country: None,
        }
    }

    /// Stored `location` field: a GeoJSON point plus address parts
    pub fn to_geojson(&self) -> Value {
        json!({
            "type": "Point",
            "coordinates": [self.point.longitude, self.point.latitude],
            "formattedAddress": self.formatted_address,
            "street": self.street,
            "city": self.city,
            "state": self.state,
            "zipcode": self.zipcode,
            "country": self.country,
        })
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &str) -> Result<GeocodedLocation, GeoError>;
}

/// Fixed lookup table, keyed by postal code or exact address
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    entries: HashMap<String, GeocodedLocation>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(mut self, key: impl Into<String>, location: GeocodedLocation) -> Self {
        self.entries.insert(key.into(), location);
        self
    }

    /// A handful of US postal codes used by the bundled fixtures
    pub fn with_fixture_postal_codes() -> Self {
        let place = |zip: &str, city: &str, state: &str, lat: f64, lng: f64| GeocodedLocation {
            point: GeoPoint::new(lat, lng),
            formatted_address: format!("{}, {} {}, US", city, state, zip),
            street: None,
            city: Some(city.to_string()),
            state: Some(state.to_string()),
            zipcode: Some(zip.to_string()),
            country: Some("US".to_string()),
        };
        Self::new()
            .with_location("02215", place("02215", "Boston", "MA", 42.3471, -71.1027))
            .with_location("02118", place("02118", "Boston", "MA", 42.3378, -71.0702))
            .with_location("01001", place("01001", "Agawam", "MA", 42.0702, -72.6227))
            .with_location("10001", place("10001", "New York", "NY", 40.7506, -73.9972))
            .with_location("32819", place("32819", "Orlando", "FL", 28.4529, -81.4678))
            .with_location("94103", place("94103", "San Francisco", "CA", 37.7726, -122.4099))
    }

    fn lookup(&self, query: &str) -> Option<&GeocodedLocation> {
        let query = query.trim();
        self.entries.get(query).or_else(|| {
            query
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|token| !token.is_empty())
                .find_map(|token| self.entries.get(token))
        })
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, query: &str) -> Result<GeocodedLocation, GeoError> {
        self.lookup(query)
            .cloned()
            .ok_or_else(|| GeoError::NotFound(query.to_string()))
    }
}

/// MapQuest geocoding API client
#[derive(Debug, Clone)]
pub struct MapQuestGeocoder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MapQuestResponse {
    #[serde(default)]
    results: Vec<MapQuestResult>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResult {
    #[serde(default)]
    locations: Vec<MapQuestLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestLocation {
    street: Option<String>,
    admin_area5: Option<String>,
    admin_area3: Option<String>,
    admin_area1: Option<String>,
    postal_code: Option<String>,
    lat_lng: MapQuestLatLng,
}

#[derive(Debug, Deserialize)]
struct MapQuestLatLng {
    lat: f64,
    lng: f64,
}

impl MapQuestGeocoder {
    pub const DEFAULT_BASE_URL: &'static str = "https://www.mapquestapi.com/geocoding/v1/address";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, query: &str) -> Result<GeocodedLocation, GeoError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("key", self.api_key.as_str()), ("location", query)])
            .send()
            .await
            .map_err(|e| GeoError::Resolution(e.to_string()))?
            .error_for_status()
            .map_err(|e| GeoError::Resolution(e.to_string()))?;

        let body: MapQuestResponse = response
            .json()
            .await
            .map_err(|e| GeoError::Resolution(format!("unexpected geocoder response: {}", e)))?;

        let location = body
            .results
            .into_iter()
            .flat_map(|r| r.locations)
            .next()
            .ok_or_else(|| GeoError::NotFound(query.to_string()))?;

        let street = non_empty(location.street);
        let city = non_empty(location.admin_area5);
        let state = non_empty(location.admin_area3);
        let zipcode = non_empty(location.postal_code);
        let country = non_empty(location.admin_area1);
        let formatted_address = [&street, &city, &state, &zipcode, &country]
            .iter()
            .filter_map(|part| part.as_deref())
            .collect::<Vec<_>>()
            .join(", ");

        tracing::debug!("Geocoded '{}' to {}, {}", query, location.lat_lng.lat, location.lat_lng.lng);

        Ok(GeocodedLocation {
            point: GeoPoint::new(location.lat_lng.lat, location.lat_lng.lng),
            formatted_address,
            street,
            city,
            state,
            zipcode,
            country,
        })
    }
}
