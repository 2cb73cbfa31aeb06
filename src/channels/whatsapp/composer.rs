//! MessageComposer — maps intents to WhatsApp Cloud API message bodies.
//!
//! Pure: no I/O. Field limits (button titles, row titles, body lengths) are
//! enforced here by truncation so a long title never makes the send fail.

use serde::{Deserialize, Serialize};

use crate::conversation::{Intent, ListSection};

pub const MAX_BUTTONS: usize = 3;
pub const MAX_BUTTON_TITLE: usize = 20;
pub const MAX_LIST_BUTTON: usize = 20;
pub const MAX_ROW_TITLE: usize = 24;
pub const MAX_ROW_DESCRIPTION: usize = 72;
pub const MAX_SECTION_TITLE: usize = 24;
pub const MAX_LIST_ROWS: usize = 10;
pub const MAX_INTERACTIVE_BODY: usize = 1024;
pub const MAX_TEXT_BODY: usize = 4096;

/// A message body as sent to `/{phone-number-id}/messages`, minus the
/// recipient envelope the transport adds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundPayload {
    Text { text: TextBody },
    Interactive { interactive: Interactive },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBody {
    pub preview_url: bool,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Interactive {
    Button {
        body: InteractiveText,
        action: ButtonAction,
    },
    List {
        body: InteractiveText,
        action: ListAction,
    },
    LocationRequestMessage {
        body: InteractiveText,
        action: LocationAction,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractiveText {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonAction {
    pub buttons: Vec<ReplyButton>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyButton {
    #[serde(rename = "type")]
    pub kind: String,
    pub reply: ButtonReply,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonReply {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListAction {
    pub button: String,
    pub sections: Vec<WireSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSection {
    pub title: String,
    pub rows: Vec<WireRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRow {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationAction {
    pub name: String,
}

impl OutboundPayload {
    /// The visible message text.
    pub fn body(&self) -> &str {
        match self {
            Self::Text { text } => &text.body,
            Self::Interactive { interactive } => match interactive {
                Interactive::Button { body, .. }
                | Interactive::List { body, .. }
                | Interactive::LocationRequestMessage { body, .. } => &body.text,
            },
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Interactive { interactive } => match interactive {
                Interactive::Button { .. } => "button",
                Interactive::List { .. } => "list",
                Interactive::LocationRequestMessage { .. } => "location_request",
            },
        }
    }
}

pub fn compose(intent: &Intent) -> OutboundPayload {
    match intent {
        Intent::Text { body } => OutboundPayload::Text {
            text: TextBody {
                preview_url: false,
                body: truncate(body, MAX_TEXT_BODY),
            },
        },
        Intent::Choice { body, choices } => interactive(Interactive::Button {
            body: interactive_text(body),
            action: ButtonAction {
                buttons: choices
                    .iter()
                    .take(MAX_BUTTONS)
                    .map(|c| ReplyButton {
                        kind: "reply".into(),
                        reply: ButtonReply {
                            id: c.id.as_str().to_string(),
                            title: truncate(&c.title, MAX_BUTTON_TITLE),
                        },
                    })
                    .collect(),
            },
        }),
        Intent::List {
            body,
            button,
            sections,
        } => interactive(Interactive::List {
            body: interactive_text(body),
            action: ListAction {
                button: truncate(button, MAX_LIST_BUTTON),
                sections: wire_sections(sections),
            },
        }),
        Intent::LocationRequest { body } => interactive(Interactive::LocationRequestMessage {
            body: interactive_text(body),
            action: LocationAction {
                name: "send_location".into(),
            },
        }),
    }
}

fn interactive(interactive: Interactive) -> OutboundPayload {
    OutboundPayload::Interactive { interactive }
}

fn interactive_text(body: &str) -> InteractiveText {
    InteractiveText {
        text: truncate(body, MAX_INTERACTIVE_BODY),
    }
}

/// Sections with their rows, capped at the provider's total row limit.
fn wire_sections(sections: &[ListSection]) -> Vec<WireSection> {
    let mut remaining = MAX_LIST_ROWS;
    sections
        .iter()
        .map(|section| {
            let rows: Vec<WireRow> = section
                .rows
                .iter()
                .take(remaining)
                .map(|row| WireRow {
                    id: row.id.clone(),
                    title: truncate(&row.title, MAX_ROW_TITLE),
                    description: row
                        .description
                        .as_deref()
                        .map(|d| truncate(d, MAX_ROW_DESCRIPTION)),
                })
                .collect();
            remaining -= rows.len();
            WireSection {
                title: truncate(&section.title, MAX_SECTION_TITLE),
                rows,
            }
        })
        .filter(|s| !s.rows.is_empty())
        .collect()
}

/// First `max` characters (not bytes).
fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
