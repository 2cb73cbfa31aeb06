//! Outbound intents — what the engine wants to say, not how it is sent.

use serde::{Deserialize, Serialize};

/// Choice ids the engine emits and recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceId {
    Register,
    Yes,
    Skip,
    ShareLocation,
    TypeAddress,
    Confirm,
    Change,
}

impl ChoiceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Yes => "yes",
            Self::Skip => "skip",
            Self::ShareLocation => "share_location",
            Self::TypeAddress => "type_address",
            Self::Confirm => "confirm",
            Self::Change => "change",
        }
    }

    /// Parse a reply id. Also accepts the ids of buttons sent by earlier
    /// deployments, which may still be tapped in open chats.
    pub fn parse(id: &str) -> Option<Self> {
        match id {
            "register" | "start_registration" => Some(Self::Register),
            "yes" | "email_yes" => Some(Self::Yes),
            "skip" | "email_no" => Some(Self::Skip),
            "share_location" => Some(Self::ShareLocation),
            "type_address" => Some(Self::TypeAddress),
            "confirm" | "confirm_address" => Some(Self::Confirm),
            "change" | "change_address" => Some(Self::Change),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: ChoiceId,
    pub title: String,
}

impl Choice {
    pub fn new(id: ChoiceId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRow {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSection {
    pub title: String,
    pub rows: Vec<ListRow>,
}

/// A single outbound message, in semantic form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Intent {
    Text {
        body: String,
    },
    Choice {
        body: String,
        choices: Vec<Choice>,
    },
    List {
        body: String,
        /// Label of the button that opens the list.
        button: String,
        sections: Vec<ListSection>,
    },
    LocationRequest {
        body: String,
    },
}

impl Intent {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { body: body.into() }
    }

    pub fn choice(body: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self::Choice {
            body: body.into(),
            choices,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            Self::Text { body }
            | Self::Choice { body, .. }
            | Self::List { body, .. }
            | Self::LocationRequest { body } => body,
        }
    }

    /// Ids offered by a choice prompt; empty for every other kind.
    pub fn choice_ids(&self) -> Vec<ChoiceId> {
        match self {
            Self::Choice { choices, .. } => choices.iter().map(|c| c.id).collect(),
            _ => Vec::new(),
        }
    }
}
