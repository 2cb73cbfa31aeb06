//! Normalized inbound events, independent of the channel wire format.

use serde::{Deserialize, Serialize};

use crate::customer::Coordinates;

/// One customer action the engine reacts to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundEvent {
    Text { body: String },
    /// A tapped button or list row; `id` is the choice id we sent.
    ButtonChoice { id: String },
    Location { lat: f64, lng: f64 },
}

impl InboundEvent {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { body: body.into() }
    }

    pub fn choice(id: impl Into<String>) -> Self {
        Self::ButtonChoice { id: id.into() }
    }

    pub fn location(lat: f64, lng: f64) -> Self {
        Self::Location { lat, lng }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::ButtonChoice { .. } => "button_choice",
            Self::Location { .. } => "location",
        }
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        match self {
            Self::Location { lat, lng } => Some(Coordinates::new(*lat, *lng)),
            _ => None,
        }
    }
}

/// An event together with who sent it and the provider's message id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEnvelope {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Profile name the channel reports for the sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub event: InboundEvent,
}

impl InboundEnvelope {
    pub fn new(identifier: impl Into<String>, event: InboundEvent) -> Self {
        Self {
            identifier: identifier.into(),
            message_id: None,
            display_name: None,
            event,
        }
    }

    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}
