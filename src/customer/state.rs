//! Conversation phases — two independent axes tracked per customer.

use serde::{Deserialize, Serialize};

/// Where the customer is in registration.
///
/// Progresses NotStarted → AwaitingName → AwaitingEmailChoice →
/// (AwaitingEmailText) → Complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationPhase {
    #[default]
    NotStarted,
    AwaitingName,
    AwaitingEmailChoice,
    AwaitingEmailText,
    Complete,
}

impl RegistrationPhase {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: RegistrationPhase) -> bool {
        use RegistrationPhase::*;
        matches!(
            (self, target),
            (NotStarted, AwaitingName)
                | (AwaitingName, AwaitingEmailChoice)
                | (AwaitingEmailChoice, AwaitingEmailText)
                | (AwaitingEmailChoice, Complete)
                | (AwaitingEmailText, Complete)
        )
    }

    /// Whether registration is finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl std::fmt::Display for RegistrationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::AwaitingName => "awaiting_name",
            Self::AwaitingEmailChoice => "awaiting_email_choice",
            Self::AwaitingEmailText => "awaiting_email_text",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

/// Where the customer is in delivery-address collection.
///
/// `None` until registration completes. Any phase may re-enter
/// `AwaitingMethod` when the customer asks to change the address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressPhase {
    #[default]
    None,
    AwaitingMethod,
    AwaitingLocation,
    AwaitingFreeText,
    AwaitingDetails,
    AwaitingConfirmation,
    Complete,
}

impl AddressPhase {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: AddressPhase) -> bool {
        use AddressPhase::*;
        matches!(
            (self, target),
            (None, AwaitingMethod)
                | (AwaitingMethod, AwaitingLocation)
                | (AwaitingMethod, AwaitingFreeText)
                | (AwaitingLocation, AwaitingDetails)
                | (AwaitingFreeText, AwaitingConfirmation)
                | (AwaitingDetails, AwaitingConfirmation)
                | (AwaitingConfirmation, Complete)
                | (AwaitingConfirmation, AwaitingMethod)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl std::fmt::Display for AddressPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::AwaitingMethod => "awaiting_method",
            Self::AwaitingLocation => "awaiting_location",
            Self::AwaitingFreeText => "awaiting_free_text",
            Self::AwaitingDetails => "awaiting_details",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}
