//! Delivery-zone catalog — postal code → serviceability, fee, minimum order, ETA.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

/// One serviceable (or temporarily paused) postal area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryZone {
    pub postal_code: String,
    pub area: String,
    pub fee: u32,
    pub min_order: u32,
    pub eta_label: String,
    pub available: bool,
}

impl DeliveryZone {
    fn new(postal_code: &str, area: &str, fee: u32, min_order: u32, eta: &str) -> Self {
        Self {
            postal_code: postal_code.to_string(),
            area: area.to_string(),
            fee,
            min_order,
            eta_label: eta.to_string(),
            available: true,
        }
    }
}

/// Lookup interface for delivery zones.
pub trait DeliveryZoneCatalog: Send + Sync {
    fn lookup(&self, postal_code: &str) -> Option<DeliveryZone>;
}

/// In-process zone table.
#[derive(Debug, Clone, Default)]
pub struct StaticZoneCatalog {
    zones: HashMap<String, DeliveryZone>,
}

impl StaticZoneCatalog {
    pub fn new(zones: impl IntoIterator<Item = DeliveryZone>) -> Self {
        Self {
            zones: zones
                .into_iter()
                .map(|z| (z.postal_code.clone(), z))
                .collect(),
        }
    }

    /// The South Mumbai zones served out of the default kitchen.
    pub fn default_zones() -> Self {
        Self::new([
            DeliveryZone::new("400001", "Fort", 30, 200, "30-40 mins"),
            DeliveryZone::new("400002", "Kalbadevi", 35, 200, "35-45 mins"),
            DeliveryZone::new("400003", "Marine Lines", 40, 250, "40-50 mins"),
            DeliveryZone::new("400004", "Girgaon", 35, 200, "35-45 mins"),
            DeliveryZone::new("400005", "Colaba", 45, 300, "45-55 mins"),
        ])
    }

    /// Load a JSON array of zones from disk.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let zones: Vec<DeliveryZone> = serde_json::from_str(&raw)
            .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))?;
        info!(path = %path.display(), zones = zones.len(), "Loaded delivery zones");
        Ok(Self::new(zones))
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

impl DeliveryZoneCatalog for StaticZoneCatalog {
    fn lookup(&self, postal_code: &str) -> Option<DeliveryZone> {
        self.zones.get(postal_code.trim()).cloned()
    }
}
