//! Offline geocoder — coarse bounding boxes for the cities we serve.
//!
//! Used when no Maps API key is configured.

use async_trait::async_trait;

use super::{GeocodeResult, Geocoder};
use crate::error::GeocodeError;

struct CityBox {
    lat: (f64, f64),
    lng: (f64, f64),
    city: &'static str,
    postal_code: &'static str,
    state: &'static str,
}

const CITY_BOXES: &[CityBox] = &[
    CityBox {
        lat: (18.9, 19.3),
        lng: (72.7, 73.1),
        city: "Mumbai",
        postal_code: "400001",
        state: "Maharashtra",
    },
    CityBox {
        lat: (28.5, 28.8),
        lng: (77.0, 77.4),
        city: "Delhi",
        postal_code: "110001",
        state: "Delhi",
    },
    CityBox {
        lat: (12.9, 13.2),
        lng: (77.5, 77.8),
        city: "Bangalore",
        postal_code: "560001",
        state: "Karnataka",
    },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGeocoder;

#[async_trait]
impl Geocoder for OfflineGeocoder {
    fn name(&self) -> &str {
        "offline"
    }

    async fn reverse(&self, lat: f64, lng: f64) -> Result<GeocodeResult, GeocodeError> {
        let hit = CITY_BOXES.iter().find(|b| {
            (b.lat.0..=b.lat.1).contains(&lat) && (b.lng.0..=b.lng.1).contains(&lng)
        });

        Ok(match hit {
            Some(b) => GeocodeResult {
                city: b.city.to_string(),
                postal_code: b.postal_code.to_string(),
                state: Some(b.state.to_string()),
                country: Some("India".to_string()),
                formatted_address: None,
            },
            None => GeocodeResult::unknown(),
        })
    }
}
