//! Inbound webhook payloads — provider wire format to [`InboundEnvelope`]s.
//!
//! Only the fields we act on are modelled; everything else is ignored by
//! serde. Messages that cannot be turned into an event are dropped here and
//! never reach the engine.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::conversation::{InboundEnvelope, InboundEvent};
use crate::customer::Coordinates;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub contacts: Vec<Contact>,
    /// Kept raw and decoded one by one, so a malformed message only drops
    /// itself.
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
    /// Delivery/read receipts for messages we sent. Counted, not processed.
    #[serde(default)]
    pub statuses: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub wa_id: Option<String>,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireMessage {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<TextContent>,
    #[serde(default)]
    pub interactive: Option<InteractiveContent>,
    #[serde(default)]
    pub button: Option<QuickReply>,
    #[serde(default)]
    pub location: Option<LocationContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextContent {
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractiveContent {
    #[serde(default)]
    pub button_reply: Option<Reply>,
    #[serde(default)]
    pub list_reply: Option<Reply>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Reply {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Template quick-reply button tap.
#[derive(Debug, Clone, Deserialize)]
pub struct QuickReply {
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationContent {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl WebhookPayload {
    /// Delivery receipts carried by this payload.
    pub fn status_count(&self) -> usize {
        self.changes().map(|v| v.statuses.len()).sum()
    }

    fn changes(&self) -> impl Iterator<Item = &ChangeValue> {
        self.entry
            .iter()
            .flat_map(|e| e.changes.iter())
            .map(|c| &c.value)
    }
}

/// Every usable message in the payload, in delivery order.
pub fn parse_payload(payload: &WebhookPayload) -> Vec<InboundEnvelope> {
    payload
        .changes()
        .flat_map(|value| {
            value
                .messages
                .iter()
                .filter_map(decode_message)
                .filter_map(move |m| to_envelope(&m, &value.contacts))
        })
        .collect()
}

fn decode_message(raw: &serde_json::Value) -> Option<WireMessage> {
    match WireMessage::deserialize(raw) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!(
                message_id = ?raw.get("id").and_then(|v| v.as_str()),
                error = %e,
                "Dropping malformed message"
            );
            None
        }
    }
}

fn to_envelope(message: &WireMessage, contacts: &[Contact]) -> Option<InboundEnvelope> {
    let Some(from) = message.from.as_deref().map(str::trim).filter(|f| !f.is_empty()) else {
        warn!(message_id = ?message.id, "Dropping message without sender");
        return None;
    };

    let Some(event) = to_event(message) else {
        debug!(from, kind = ?message.kind, "Dropping unsupported or malformed message");
        return None;
    };

    let display_name = contacts
        .iter()
        .find(|c| c.wa_id.as_deref() == Some(from))
        .or_else(|| contacts.first())
        .and_then(|c| c.profile.as_ref())
        .and_then(|p| p.name.clone());

    Some(InboundEnvelope {
        identifier: from.to_string(),
        message_id: message.id.clone(),
        display_name,
        event,
    })
}

fn to_event(message: &WireMessage) -> Option<InboundEvent> {
    match message.kind.as_deref()? {
        "text" => message.text.as_ref().map(|t| InboundEvent::text(&t.body)),
        "interactive" => {
            let interactive = message.interactive.as_ref()?;
            interactive
                .button_reply
                .as_ref()
                .or(interactive.list_reply.as_ref())
                .map(|r| InboundEvent::choice(&r.id))
        }
        "button" => {
            let button = message.button.as_ref()?;
            button
                .payload
                .as_ref()
                .or(button.text.as_ref())
                .map(InboundEvent::choice)
        }
        "location" => {
            let location = message.location.as_ref()?;
            let coordinates = Coordinates::new(location.latitude?, location.longitude?);
            coordinates
                .is_valid()
                .then(|| InboundEvent::location(coordinates.lat, coordinates.lng))
        }
        _ => None,
    }
}
