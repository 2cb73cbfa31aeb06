//! Google Geocoding API client (reverse lookups only).

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{GeocodeResult, Geocoder};
use crate::error::GeocodeError;

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeEntry>,
}

#[derive(Debug, Deserialize)]
struct GeocodeEntry {
    #[serde(default)]
    address_components: Vec<AddressComponent>,
    formatted_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

pub struct GoogleGeocoder {
    api_key: SecretString,
    base_url: String,
    client: reqwest::Client,
}

impl GoogleGeocoder {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the client at a different endpoint (self-hosted proxy, test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    fn name(&self) -> &str {
        "google"
    }

    async fn reverse(&self, lat: f64, lng: f64) -> Result<GeocodeResult, GeocodeError> {
        let latlng = format!("{lat},{lng}");
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("latlng", latlng.as_str()), ("key", self.api_key.expose_secret())])
            .send()
            .await
            .map_err(request_failed)?;

        let body: GeocodeResponse = resp.json().await.map_err(request_failed)?;

        from_response(body)
    }
}

/// The request URL carries the API key, so it never goes into the error.
fn request_failed(e: reqwest::Error) -> GeocodeError {
    GeocodeError::RequestFailed(e.without_url().to_string())
}

/// Pick locality, postal code, state and country out of the first result.
fn from_response(body: GeocodeResponse) -> Result<GeocodeResult, GeocodeError> {
    if body.status != "OK" {
        return Err(GeocodeError::BadStatus {
            status: body.status,
        });
    }
    let Some(first) = body.results.into_iter().next() else {
        return Err(GeocodeError::BadStatus {
            status: "ZERO_RESULTS".to_string(),
        });
    };

    let component = |kind: &str| {
        first
            .address_components
            .iter()
            .find(|c| c.types.iter().any(|t| t == kind))
            .map(|c| c.long_name.clone())
    };

    Ok(GeocodeResult {
        city: component("locality").unwrap_or_default(),
        postal_code: component("postal_code").unwrap_or_default(),
        state: component("administrative_area_level_1"),
        country: component("country"),
        formatted_address: first.formatted_address.clone(),
    })
}
