//! Reverse geocoding — coordinates to an administrative area.
//!
//! Treated as a best-effort oracle: callers go through [`reverse_or_unknown`],
//! which bounds the call with a timeout and degrades every failure to
//! [`GeocodeResult::unknown`].

pub mod google;
pub mod offline;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::customer::Coordinates;
use crate::error::GeocodeError;

pub use google::GoogleGeocoder;
pub use offline::OfflineGeocoder;

/// Administrative area for a coordinate pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub city: String,
    pub postal_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
}

impl GeocodeResult {
    /// Sentinel returned when the area cannot be determined.
    pub fn unknown() -> Self {
        Self {
            city: "Unknown".to_string(),
            postal_code: "000000".to_string(),
            state: Some("Unknown".to_string()),
            country: None,
            formatted_address: None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.city == "Unknown"
    }
}

/// Backend-agnostic reverse geocoder.
#[async_trait]
pub trait Geocoder: Send + Sync {
    fn name(&self) -> &str;

    async fn reverse(&self, lat: f64, lng: f64) -> Result<GeocodeResult, GeocodeError>;
}

/// Reverse geocode under `timeout`, falling back to the unknown sentinel.
pub async fn reverse_or_unknown(
    geocoder: &dyn Geocoder,
    coordinates: Coordinates,
    timeout: Duration,
) -> GeocodeResult {
    let call = geocoder.reverse(coordinates.lat, coordinates.lng);
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            warn!(geocoder = geocoder.name(), error = %e, "Reverse geocoding failed");
            GeocodeResult::unknown()
        }
        Err(_) => {
            warn!(
                geocoder = geocoder.name(),
                error = %GeocodeError::Timeout(timeout),
                "Reverse geocoding failed"
            );
            GeocodeResult::unknown()
        }
    }
}
