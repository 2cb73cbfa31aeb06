//! Heuristic address parsing for free-text chat input.
//!
//! Ordered pattern rules; the first rule that matches a field wins.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sentinel city when no known city is mentioned.
pub const UNKNOWN_CITY: &str = "Unknown";

/// Building patterns, tried in order.
static BUILDING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(?:building|bldg|house|flat|apt|apartment)?\s*(?:no\.?|number|#)?\s*(\d+[\w\-/]*)",
        r"^(\d+[\w\-/]*)\s+",
        r"(?i)\b(\w+\s+(?:tower|complex|apartment|society|building))\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("building pattern"))
    .collect()
});

static FLOOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)(?:st|nd|rd|th)?\s*floor").expect("floor pattern"));

/// Proximity keywords, tried in order.
const LANDMARK_KEYWORDS: &[&str] = &[
    "near", "opposite", "opp", "behind", "next to", "beside", "above", "below",
];

static LANDMARK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    LANDMARK_KEYWORDS
        .iter()
        .map(|k| Regex::new(&format!(r"(?i)\b{k}\s+([^,.]+)")).expect("landmark pattern"))
        .collect()
});

static PINCODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[0-9]{6}\b").expect("pincode pattern"));

static STRICT_PINCODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{6}$").expect("strict pincode pattern"));

static STREET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:street|road|lane|marg|nagar|colony|park|society|complex|apartment|building)\s*[^,\n]*",
    )
    .expect("street pattern")
});

/// Cities recognised in free text, first hit wins.
const KNOWN_CITIES: &[&str] = &[
    "mumbai",
    "delhi",
    "bangalore",
    "chennai",
    "kolkata",
    "pune",
    "hyderabad",
    "ahmedabad",
    "surat",
    "jaipur",
];

/// Fragments pulled out of a "building / floor / landmark" reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
}

/// A structured guess at a typed address. Missing fields use sentinels
/// (`UNKNOWN_CITY`, empty pincode), never absence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeformAddress {
    pub street: String,
    pub city: String,
    pub pincode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
}

impl FreeformAddress {
    /// Street, city and a valid pincode are all known.
    pub fn is_complete(&self) -> bool {
        !self.street.is_empty() && self.city != UNKNOWN_CITY && is_valid_pincode(&self.pincode)
    }

    /// Multi-line rendering: street (and landmark), then `city - pincode`.
    pub fn format(&self) -> String {
        let mut out = self.street.clone();
        if let Some(ref landmark) = self.landmark {
            out.push_str(", ");
            out.push_str(landmark);
        }
        out.push('\n');
        out.push_str(&format!("{} - {}", self.city, self.pincode));
        out
    }

    /// The pincode, if a valid one was found.
    pub fn postal_code(&self) -> Option<&str> {
        is_valid_pincode(&self.pincode).then_some(self.pincode.as_str())
    }
}

/// Extract building, floor and landmark fragments from a details reply.
///
/// Falls back to the whole input as `building` when neither a building nor a
/// landmark was recognised.
pub fn extract_details(text: &str) -> AddressDetails {
    let text = text.trim();
    let mut details = AddressDetails::default();

    details.building = BUILDING_PATTERNS
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    details.floor = FLOOR_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    details.landmark = LANDMARK_PATTERNS
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty());

    if details.building.is_none() && details.landmark.is_none() && !text.is_empty() {
        details.building = Some(text.to_string());
    }

    debug!(?details, "Extracted address details");
    details
}

/// Parse a typed address into street, city and pincode.
pub fn parse_freeform(text: &str) -> FreeformAddress {
    let text = text.trim();

    let pincode = PINCODE_PATTERN
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let lower = text.to_lowercase();
    let city = KNOWN_CITIES
        .iter()
        .find(|c| lower.contains(**c))
        .map(|c| title_case(c))
        .unwrap_or_else(|| UNKNOWN_CITY.to_string());

    let street = match STREET_PATTERN.find(text) {
        Some(m) => m.as_str().trim().to_string(),
        None => {
            let first = text.split(',').next().unwrap_or_default().trim();
            if first.is_empty() {
                text.chars().take(50).collect()
            } else {
                first.to_string()
            }
        }
    };

    FreeformAddress {
        street,
        city,
        pincode,
        landmark: None,
    }
}

/// Six ASCII digits.
pub fn is_valid_pincode(pincode: &str) -> bool {
    STRICT_PINCODE.is_match(pincode)
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
