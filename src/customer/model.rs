//! Customer snapshot — the unit of conversation state.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::{AddressPhase, RegistrationPhase};
use crate::address::AddressDetails;
use crate::delivery::DeliveryVerdict;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and within the WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Address collected so far. Replaced with `AddressDraft::default()` whenever
/// address collection restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<AddressDetails>,
    /// Six-digit postal code, when one could be resolved from the input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// Verdict shown in the last confirmation prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<DeliveryVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_summary: Option<String>,
}

impl AddressDraft {
    /// Human-readable draft for the confirmation prompt.
    pub fn display(&self) -> String {
        self.render("📍 Location pin attached")
    }

    /// Final summary stored on confirmation: detail text (plus a marker when a
    /// pin is attached), else the typed address.
    pub fn summary(&self) -> String {
        self.render("📍 Location attached")
    }

    fn render(&self, location_marker: &str) -> String {
        if let Some(ref details) = self.detail_text {
            let mut out = details.clone();
            if self.coordinates.is_some() {
                out.push('\n');
                out.push_str(location_marker);
            }
            out
        } else if let Some(ref text) = self.free_text {
            text.clone()
        } else if self.coordinates.is_some() {
            location_marker.to_string()
        } else {
            String::new()
        }
    }
}

/// Channel message ids remembered per customer for redelivery detection.
pub const RECENT_MESSAGE_IDS: usize = 32;

/// Per-customer conversation state, keyed by channel identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub loyalty_points: u32,
    pub registration_phase: RegistrationPhase,
    pub address_phase: AddressPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub address_draft: AddressDraft,
    /// Handled events so far; zero means this is first contact.
    #[serde(default)]
    pub interaction_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_interaction_at: DateTime<Utc>,
    /// Most recent inbound message ids, oldest first.
    #[serde(default, skip_serializing_if = "VecDeque::is_empty")]
    pub recent_message_ids: VecDeque<String>,
}

impl CustomerSnapshot {
    /// A fresh snapshot for an identifier seen for the first time.
    pub fn new(identifier: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: None,
            loyalty_points: 0,
            registration_phase: RegistrationPhase::NotStarted,
            address_phase: AddressPhase::None,
            name: None,
            email: None,
            address_draft: AddressDraft::default(),
            interaction_count: 0,
            created_at: now,
            last_interaction_at: now,
            recent_message_ids: VecDeque::new(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn is_first_contact(&self) -> bool {
        self.interaction_count == 0
    }

    pub fn is_registered(&self) -> bool {
        self.registration_phase.is_terminal()
    }

    /// Name to greet the customer with: registered name, then channel profile name.
    pub fn greeting_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.display_name.as_deref())
            .unwrap_or("there")
    }

    pub fn has_seen_message(&self, message_id: &str) -> bool {
        self.recent_message_ids.iter().any(|id| id == message_id)
    }

    /// Remember a handled message id, evicting the oldest past
    /// [`RECENT_MESSAGE_IDS`]. Returns false if it was already known.
    pub fn remember_message(&mut self, message_id: &str) -> bool {
        if self.has_seen_message(message_id) {
            return false;
        }
        if self.recent_message_ids.len() >= RECENT_MESSAGE_IDS {
            self.recent_message_ids.pop_front();
        }
        self.recent_message_ids.push_back(message_id.to_string());
        true
    }

    /// Check the snapshot-level invariants.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.registration_phase.is_terminal() && self.name.is_none() {
            return Err("registration complete without a name".into());
        }
        if !self.registration_phase.is_terminal() && self.address_phase != AddressPhase::None {
            return Err(format!(
                "address phase {} before registration completed",
                self.address_phase
            ));
        }
        if self.address_phase.is_terminal() && self.address_draft.confirmed_summary.is_none() {
            return Err("address complete without a confirmed summary".into());
        }
        Ok(())
    }
}
