//! Delivery eligibility — zone catalog, distance rules and verdicts.

pub mod eligibility;
pub mod geo;
pub mod zones;

pub use eligibility::{
    DeliveryEligibility, DeliveryVerdict, EligibilityConfig, REASON_OUTSIDE_RADIUS,
    REASON_UNVERIFIABLE, REASON_ZONE_UNAVAILABLE,
};
pub use geo::haversine_km;
pub use zones::{DeliveryZone, DeliveryZoneCatalog, StaticZoneCatalog};
