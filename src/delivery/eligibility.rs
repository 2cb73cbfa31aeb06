//! Delivery eligibility — can we deliver to this address draft, and at what cost?
//!
//! Resolution order: zone catalog by postal code, then distance from the
//! kitchen when a location pin is attached, else unverifiable. Never fails.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::geo::haversine_km;
use super::zones::DeliveryZoneCatalog;
use crate::config::{parse_or, var};
use crate::customer::{AddressDraft, Coordinates};
use crate::error::ConfigError;
use crate::geocode::{Geocoder, reverse_or_unknown};

pub const REASON_ZONE_UNAVAILABLE: &str = "temporarily unavailable";
pub const REASON_OUTSIDE_RADIUS: &str = "outside delivery radius";
pub const REASON_UNVERIFIABLE: &str = "cannot verify address";

/// Outcome of an eligibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryVerdict {
    pub serviceable: bool,
    pub fee: u32,
    pub min_order: u32,
    pub eta_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Zone name from the catalog, when the verdict came from a zone hit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    /// City reported by the geocoder for a location pin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
}

impl DeliveryVerdict {
    fn unserviceable(reason: &str) -> Self {
        Self {
            serviceable: false,
            fee: 0,
            min_order: 0,
            eta_label: String::new(),
            reason: Some(reason.to_string()),
            area: None,
            locality: None,
        }
    }

    /// Customer-facing block appended to the confirmation prompt.
    pub fn summary(&self) -> String {
        if self.serviceable {
            format!(
                "✅ Delivery available to your location\n🚚 Delivery charge: ₹{}\n📦 Minimum order: ₹{}\n⏱️ Estimated time: {}",
                self.fee, self.min_order, self.eta_label
            )
        } else {
            let reason = self.reason.as_deref().unwrap_or("not available");
            format!("❌ Delivery not available: {reason}")
        }
    }
}

/// Tunables for the distance-based fallback.
#[derive(Debug, Clone)]
pub struct EligibilityConfig {
    /// Kitchen location distances are measured from.
    pub origin: Coordinates,
    pub radius_km: f64,
    /// Fee charged per kilometre, rounded up to a whole currency unit.
    pub fee_per_km: f64,
    pub distance_min_order: u32,
    /// Minutes added to the lower ETA bound to form the upper bound.
    pub eta_pad_minutes: u32,
    pub geocode_timeout: Duration,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            origin: Coordinates::new(19.0760, 72.8777),
            radius_km: 5.0,
            fee_per_km: 10.0,
            distance_min_order: 200,
            eta_pad_minutes: 10,
            geocode_timeout: Duration::from_secs(3),
        }
    }
}

impl EligibilityConfig {
    /// Origin, radius and geocode timeout from `ORDER_ASSIST_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let origin = Coordinates::new(
            parse_or("ORDER_ASSIST_ORIGIN_LAT", var("ORDER_ASSIST_ORIGIN_LAT"), defaults.origin.lat)?,
            parse_or("ORDER_ASSIST_ORIGIN_LNG", var("ORDER_ASSIST_ORIGIN_LNG"), defaults.origin.lng)?,
        );
        if !origin.is_valid() {
            return Err(ConfigError::InvalidValue {
                key: "ORDER_ASSIST_ORIGIN_LAT/LNG".into(),
                message: format!("({}, {}) is not a valid coordinate", origin.lat, origin.lng),
            });
        }
        let radius_km: f64 =
            parse_or("ORDER_ASSIST_RADIUS_KM", var("ORDER_ASSIST_RADIUS_KM"), defaults.radius_km)?;
        if !(radius_km.is_finite() && radius_km > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "ORDER_ASSIST_RADIUS_KM".into(),
                message: format!("{radius_km} must be a positive number"),
            });
        }
        let timeout_ms = parse_or(
            "ORDER_ASSIST_GEOCODE_TIMEOUT_MS",
            var("ORDER_ASSIST_GEOCODE_TIMEOUT_MS"),
            defaults.geocode_timeout.as_millis() as u64,
        )?;

        Ok(Self {
            origin,
            radius_km,
            geocode_timeout: Duration::from_millis(timeout_ms),
            ..defaults
        })
    }
}

/// Evaluates address drafts against the zone catalog and delivery radius.
pub struct DeliveryEligibility {
    catalog: Arc<dyn DeliveryZoneCatalog>,
    geocoder: Arc<dyn Geocoder>,
    config: EligibilityConfig,
}

impl DeliveryEligibility {
    pub fn new(
        catalog: Arc<dyn DeliveryZoneCatalog>,
        geocoder: Arc<dyn Geocoder>,
        config: EligibilityConfig,
    ) -> Self {
        Self {
            catalog,
            geocoder,
            config,
        }
    }

    pub fn config(&self) -> &EligibilityConfig {
        &self.config
    }

    pub async fn evaluate(&self, draft: &AddressDraft) -> DeliveryVerdict {
        if let Some(zone) = draft
            .postal_code
            .as_deref()
            .and_then(|code| self.catalog.lookup(code))
        {
            debug!(postal_code = %zone.postal_code, available = zone.available, "Zone catalog hit");
            return DeliveryVerdict {
                serviceable: zone.available,
                fee: zone.fee,
                min_order: zone.min_order,
                eta_label: zone.eta_label,
                reason: (!zone.available).then(|| REASON_ZONE_UNAVAILABLE.to_string()),
                area: Some(zone.area),
                locality: None,
            };
        }

        if let Some(coordinates) = draft.coordinates {
            let geocoded =
                reverse_or_unknown(self.geocoder.as_ref(), coordinates, self.config.geocode_timeout)
                    .await;
            let mut verdict = self.by_distance(coordinates);
            verdict.locality = Some(geocoded.city);
            return verdict;
        }

        DeliveryVerdict::unserviceable(REASON_UNVERIFIABLE)
    }

    /// Distance-based verdict for a location pin.
    pub fn by_distance(&self, coordinates: Coordinates) -> DeliveryVerdict {
        let distance = haversine_km(self.config.origin, coordinates);
        info!(distance_km = distance, radius_km = self.config.radius_km, "Distance check");

        if distance > self.config.radius_km {
            return DeliveryVerdict::unserviceable(REASON_OUTSIDE_RADIUS);
        }

        let fee = (distance * self.config.fee_per_km).ceil() as u32;
        DeliveryVerdict {
            serviceable: true,
            fee,
            min_order: self.config.distance_min_order,
            eta_label: format!("{}-{} mins", fee, fee + self.config.eta_pad_minutes),
            reason: None,
            area: None,
            locality: None,
        }
    }
}
