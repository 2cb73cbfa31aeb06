//! ConversationEngine — the registration and address-collection state machine.
//!
//! `handle` takes the current snapshot and one inbound event and returns the
//! next snapshot plus the ordered intents to send. Registration runs until it
//! is complete; only then does address collection begin. Events that do not
//! fit the current phase are ignored and leave the snapshot untouched, which
//! makes duplicate provider deliveries harmless.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::event::InboundEvent;
use super::intent::{ChoiceId, Intent};
use super::prompts;
use crate::address::{extract_details, parse_freeform};
use crate::config::{parse_or, var};
use crate::customer::{AddressDraft, AddressPhase, CustomerSnapshot, RegistrationPhase};
use crate::delivery::DeliveryEligibility;
use crate::error::ConfigError;

/// What to do when the customer tries to confirm an address we cannot
/// deliver to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnserviceablePolicy {
    /// Offer confirm anyway; the verdict text tells the customer the terms.
    #[default]
    OfferConfirm,
    /// Offer only "change" and ignore confirm taps.
    RequireChange,
}

impl FromStr for UnserviceablePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "offer_confirm" => Ok(Self::OfferConfirm),
            "require_change" => Ok(Self::RequireChange),
            other => Err(format!(
                "unknown policy '{other}' (expected offer_confirm or require_change)"
            )),
        }
    }
}

impl std::fmt::Display for UnserviceablePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OfferConfirm => write!(f, "offer_confirm"),
            Self::RequireChange => write!(f, "require_change"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Loyalty points granted when registration completes.
    pub registration_bonus: u32,
    pub unserviceable_policy: UnserviceablePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            registration_bonus: 100,
            unserviceable_policy: UnserviceablePolicy::default(),
        }
    }
}

impl EngineConfig {
    /// `ORDER_ASSIST_REGISTRATION_BONUS` and `ORDER_ASSIST_UNSERVICEABLE_POLICY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            registration_bonus: parse_or(
                "ORDER_ASSIST_REGISTRATION_BONUS",
                var("ORDER_ASSIST_REGISTRATION_BONUS"),
                defaults.registration_bonus,
            )?,
            unserviceable_policy: parse_or(
                "ORDER_ASSIST_UNSERVICEABLE_POLICY",
                var("ORDER_ASSIST_UNSERVICEABLE_POLICY"),
                defaults.unserviceable_policy,
            )?,
        })
    }
}

/// Result of handling one event.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub snapshot: CustomerSnapshot,
    /// Messages to send, in order. Empty when the event was ignored.
    pub intents: Vec<Intent>,
    /// False when the event was ignored and `snapshot` is the input unchanged.
    pub changed: bool,
}

pub struct ConversationEngine {
    eligibility: Arc<DeliveryEligibility>,
    config: EngineConfig,
}

impl ConversationEngine {
    pub fn new(eligibility: Arc<DeliveryEligibility>, config: EngineConfig) -> Self {
        Self {
            eligibility,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn handle(
        &self,
        snapshot: CustomerSnapshot,
        event: &InboundEvent,
        now: DateTime<Utc>,
    ) -> Outcome {
        let mut next = snapshot.clone();
        let step = if next.is_registered() {
            self.address_step(&mut next, event).await
        } else {
            self.registration_step(&mut next, event)
        };

        let Some(intents) = step else {
            debug!(
                identifier = %snapshot.identifier,
                event = event.kind(),
                registration = %snapshot.registration_phase,
                address = %snapshot.address_phase,
                "Event ignored in current phase"
            );
            return Outcome {
                snapshot,
                intents: Vec::new(),
                changed: false,
            };
        };

        next.interaction_count += 1;
        next.last_interaction_at = now;
        debug_assert!(
            next.check_invariants().is_ok(),
            "snapshot invariant broken: {:?}",
            next.check_invariants()
        );

        info!(
            identifier = %next.identifier,
            event = event.kind(),
            registration = %next.registration_phase,
            address = %next.address_phase,
            intents = intents.len(),
            "Event handled"
        );

        Outcome {
            snapshot: next,
            intents,
            changed: true,
        }
    }

    // ── Registration ────────────────────────────────────────────────

    fn registration_step(
        &self,
        s: &mut CustomerSnapshot,
        event: &InboundEvent,
    ) -> Option<Vec<Intent>> {
        use RegistrationPhase::*;

        let bonus = self.config.registration_bonus;
        match (s.registration_phase, event) {
            (NotStarted, _) => {
                let offer = if s.is_first_contact() {
                    prompts::welcome_offer(s.greeting_name(), bonus)
                } else {
                    prompts::registration_offer(bonus)
                };
                set_registration(s, AwaitingName);
                Some(vec![offer])
            }
            (AwaitingName, InboundEvent::Text { body }) => {
                let name = body.trim();
                if name.is_empty() {
                    return Some(vec![prompts::ask_name()]);
                }
                s.name = Some(name.to_string());
                set_registration(s, AwaitingEmailChoice);
                Some(vec![prompts::email_opt_in(name)])
            }
            (AwaitingName, InboundEvent::ButtonChoice { id })
                if ChoiceId::parse(id) == Some(ChoiceId::Register) =>
            {
                Some(vec![prompts::ask_name()])
            }
            (AwaitingEmailChoice, InboundEvent::ButtonChoice { id }) => {
                match ChoiceId::parse(id)? {
                    ChoiceId::Yes => {
                        set_registration(s, AwaitingEmailText);
                        Some(vec![prompts::ask_email()])
                    }
                    ChoiceId::Skip => Some(self.complete_registration(s)),
                    _ => None,
                }
            }
            (AwaitingEmailText, InboundEvent::Text { body }) => {
                let body = body.trim();
                if body.contains('@') {
                    s.email = Some(body.to_string());
                    Some(self.complete_registration(s))
                } else if body.eq_ignore_ascii_case("skip") {
                    Some(self.complete_registration(s))
                } else {
                    Some(vec![prompts::invalid_email()])
                }
            }
            _ => None,
        }
    }

    /// Grant the bonus, announce the balance, and open address collection in
    /// the same batch.
    fn complete_registration(&self, s: &mut CustomerSnapshot) -> Vec<Intent> {
        let bonus = self.config.registration_bonus;
        set_registration(s, RegistrationPhase::Complete);
        s.loyalty_points = s.loyalty_points.saturating_add(bonus);

        let mut intents = vec![prompts::registration_complete(
            s.greeting_name(),
            bonus,
            s.loyalty_points,
        )];
        intents.extend(enter_address_collection(s));
        intents
    }

    // ── Address collection ──────────────────────────────────────────

    async fn address_step(
        &self,
        s: &mut CustomerSnapshot,
        event: &InboundEvent,
    ) -> Option<Vec<Intent>> {
        match (s.address_phase, event) {
            // Registered before address collection existed.
            (AddressPhase::None, _) => Some(enter_address_collection(s)),
            (AddressPhase::AwaitingMethod, InboundEvent::ButtonChoice { id }) => match ChoiceId::parse(id)? {
                ChoiceId::ShareLocation => {
                    set_address(s, AddressPhase::AwaitingLocation);
                    Some(vec![prompts::request_location()])
                }
                ChoiceId::TypeAddress => {
                    set_address(s, AddressPhase::AwaitingFreeText);
                    Some(vec![prompts::ask_free_text()])
                }
                _ => None,
            },
            (AddressPhase::AwaitingLocation, InboundEvent::Location { .. }) => {
                let coordinates = event.coordinates().filter(|c| c.is_valid())?;
                s.address_draft.coordinates = Some(coordinates);
                set_address(s, AddressPhase::AwaitingDetails);
                Some(vec![prompts::ask_details()])
            }
            (AddressPhase::AwaitingFreeText, InboundEvent::Text { body }) => {
                let text = body.trim();
                if text.is_empty() {
                    return Some(vec![prompts::ask_free_text()]);
                }
                let parsed = parse_freeform(text);
                s.address_draft.free_text = Some(text.to_string());
                s.address_draft.postal_code = parsed.postal_code().map(str::to_string);
                Some(self.confirm_address(s).await)
            }
            (AddressPhase::AwaitingDetails, InboundEvent::Text { body }) => {
                let text = body.trim();
                if text.is_empty() {
                    return Some(vec![prompts::ask_details()]);
                }
                s.address_draft.details = Some(extract_details(text));
                s.address_draft.detail_text = Some(text.to_string());
                if let Some(code) = parse_freeform(text).postal_code() {
                    s.address_draft.postal_code = Some(code.to_string());
                }
                Some(self.confirm_address(s).await)
            }
            (AddressPhase::AwaitingConfirmation, InboundEvent::ButtonChoice { id }) => {
                match ChoiceId::parse(id)? {
                    ChoiceId::Confirm if self.confirm_allowed(&s.address_draft) => {
                        s.address_draft.confirmed_summary = Some(s.address_draft.summary());
                        set_address(s, AddressPhase::Complete);
                        Some(vec![prompts::address_confirmed()])
                    }
                    ChoiceId::Change => Some(enter_address_collection(s)),
                    _ => None,
                }
            }
            (AddressPhase::Complete, InboundEvent::Text { body }) => {
                if body.trim().eq_ignore_ascii_case("menu") {
                    Some(vec![prompts::menu_placeholder()])
                } else {
                    Some(vec![prompts::welcome_back(
                        s.greeting_name(),
                        s.loyalty_points,
                    )])
                }
            }
            _ => None,
        }
    }

    /// Evaluate the draft, keep the verdict on it and ask for confirmation.
    async fn confirm_address(&self, s: &mut CustomerSnapshot) -> Vec<Intent> {
        let verdict = self.eligibility.evaluate(&s.address_draft).await;
        info!(
            identifier = %s.identifier,
            serviceable = verdict.serviceable,
            fee = verdict.fee,
            reason = verdict.reason.as_deref().unwrap_or(""),
            "Delivery eligibility evaluated"
        );

        let offer_confirm = verdict.serviceable
            || self.config.unserviceable_policy == UnserviceablePolicy::OfferConfirm;
        let prompt = prompts::confirm_address(&s.address_draft.display(), &verdict, offer_confirm);

        s.address_draft.verdict = Some(verdict);
        set_address(s, AddressPhase::AwaitingConfirmation);
        vec![prompt]
    }

    fn confirm_allowed(&self, draft: &AddressDraft) -> bool {
        match self.config.unserviceable_policy {
            UnserviceablePolicy::OfferConfirm => true,
            UnserviceablePolicy::RequireChange => {
                draft.verdict.as_ref().is_some_and(|v| v.serviceable)
            }
        }
    }
}

/// Reset the draft and ask how the customer wants to give the address.
fn enter_address_collection(s: &mut CustomerSnapshot) -> Vec<Intent> {
    s.address_draft = AddressDraft::default();
    set_address(s, AddressPhase::AwaitingMethod);
    vec![prompts::address_method()]
}

fn set_registration(s: &mut CustomerSnapshot, to: RegistrationPhase) {
    debug_assert!(
        s.registration_phase.can_transition_to(to),
        "invalid registration transition {} -> {to}",
        s.registration_phase
    );
    debug!(identifier = %s.identifier, from = %s.registration_phase, to = %to, "Registration phase");
    s.registration_phase = to;
}

fn set_address(s: &mut CustomerSnapshot, to: AddressPhase) {
    debug_assert!(
        s.address_phase.can_transition_to(to),
        "invalid address transition {} -> {to}",
        s.address_phase
    );
    debug!(identifier = %s.identifier, from = %s.address_phase, to = %to, "Address phase");
    s.address_phase = to;
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::customer::Coordinates;
    use crate::delivery::{
        EligibilityConfig, REASON_OUTSIDE_RADIUS, StaticZoneCatalog,
    };
    use crate::geocode::OfflineGeocoder;

    fn engine_with(policy: UnserviceablePolicy) -> ConversationEngine {
        let eligibility = DeliveryEligibility::new(
            Arc::new(StaticZoneCatalog::default_zones()),
            Arc::new(OfflineGeocoder),
            EligibilityConfig::default(),
        );
        ConversationEngine::new(
            Arc::new(eligibility),
            EngineConfig {
                registration_bonus: 100,
                unserviceable_policy: policy,
            },
        )
    }

    fn engine() -> ConversationEngine {
        engine_with(UnserviceablePolicy::OfferConfirm)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn fresh() -> CustomerSnapshot {
        CustomerSnapshot::new("15550001111", t0()).with_display_name("Asha")
    }

    /// A registered customer about to choose an address method.
    fn registered() -> CustomerSnapshot {
        let mut s = fresh();
        s.name = Some("Asha Rao".into());
        s.registration_phase = RegistrationPhase::Complete;
        s.address_phase = AddressPhase::AwaitingMethod;
        s.loyalty_points = 100;
        s.interaction_count = 3;
        s
    }

    fn at_phase(phase: AddressPhase) -> CustomerSnapshot {
        let mut s = registered();
        s.address_phase = phase;
        s
    }

    async fn run(engine: &ConversationEngine, s: CustomerSnapshot, events: &[InboundEvent]) -> Outcome {
        let mut outcome = Outcome {
            snapshot: s,
            intents: Vec::new(),
            changed: false,
        };
        for (i, event) in events.iter().enumerate() {
            let now = t0() + Duration::seconds(i as i64 + 1);
            outcome = engine.handle(outcome.snapshot, event, now).await;
            assert!(outcome.snapshot.check_invariants().is_ok());
        }
        outcome
    }

    // ── Registration ────────────────────────────────────────────────

    #[tokio::test]
    async fn fresh_identifier_gets_welcome_offer() {
        let out = engine().handle(fresh(), &InboundEvent::text("hi"), t0()).await;
        assert!(out.changed);
        assert_eq!(out.snapshot.registration_phase, RegistrationPhase::AwaitingName);
        assert_eq!(out.intents.len(), 1);
        assert!(out.intents[0].body().starts_with("Welcome Asha!"));
        assert_eq!(out.intents[0].choice_ids(), vec![ChoiceId::Register]);
        assert_eq!(out.snapshot.interaction_count, 1);
    }

    #[tokio::test]
    async fn returning_unregistered_customer_gets_plain_offer() {
        let mut s = fresh();
        s.interaction_count = 5;
        let out = engine().handle(s, &InboundEvent::location(19.0, 72.8), t0()).await;
        assert_eq!(out.snapshot.registration_phase, RegistrationPhase::AwaitingName);
        assert!(!out.intents[0].body().starts_with("Welcome"));
    }

    #[tokio::test]
    async fn name_is_trimmed_and_email_offered() {
        let mut s = fresh();
        s.registration_phase = RegistrationPhase::AwaitingName;
        let out = engine().handle(s, &InboundEvent::text("  Asha Rao "), t0()).await;
        assert_eq!(out.snapshot.name.as_deref(), Some("Asha Rao"));
        assert_eq!(
            out.snapshot.registration_phase,
            RegistrationPhase::AwaitingEmailChoice
        );
        assert_eq!(out.intents.len(), 1);
        assert_eq!(out.intents[0].choice_ids(), vec![ChoiceId::Yes, ChoiceId::Skip]);
    }

    #[tokio::test]
    async fn blank_name_reprompts() {
        let mut s = fresh();
        s.registration_phase = RegistrationPhase::AwaitingName;
        let out = engine().handle(s, &InboundEvent::text("   "), t0()).await;
        assert_eq!(out.snapshot.registration_phase, RegistrationPhase::AwaitingName);
        assert!(out.snapshot.name.is_none());
        assert_eq!(out.intents, vec![prompts::ask_name()]);
    }

    #[tokio::test]
    async fn register_tap_asks_for_name() {
        let out = run(
            &engine(),
            fresh(),
            &[InboundEvent::text("hi"), InboundEvent::choice("register")],
        )
        .await;
        assert_eq!(out.snapshot.registration_phase, RegistrationPhase::AwaitingName);
        assert_eq!(out.intents, vec![prompts::ask_name()]);
    }

    #[tokio::test]
    async fn skip_email_completes_registration() {
        let mut s = fresh();
        s.registration_phase = RegistrationPhase::AwaitingEmailChoice;
        s.name = Some("Asha Rao".into());
        let out = engine().handle(s, &InboundEvent::choice("skip"), t0()).await;

        let snap = &out.snapshot;
        assert_eq!(snap.registration_phase, RegistrationPhase::Complete);
        assert_eq!(snap.loyalty_points, 100);
        assert_eq!(snap.address_phase, AddressPhase::AwaitingMethod);
        assert_eq!(out.intents.len(), 2);
        assert!(out.intents[0].body().contains("Current balance: 100 points"));
        assert_eq!(
            out.intents[1].choice_ids(),
            vec![ChoiceId::ShareLocation, ChoiceId::TypeAddress]
        );
    }

    #[tokio::test]
    async fn email_path_stores_address() {
        let out = run(
            &engine(),
            fresh(),
            &[
                InboundEvent::text("hi"),
                InboundEvent::text("Asha Rao"),
                InboundEvent::choice("yes"),
                InboundEvent::text("not-an-email"),
                InboundEvent::text(" asha@example.com "),
            ],
        )
        .await;
        assert_eq!(out.snapshot.email.as_deref(), Some("asha@example.com"));
        assert_eq!(out.snapshot.registration_phase, RegistrationPhase::Complete);
        assert_eq!(out.snapshot.interaction_count, 5);
        assert_eq!(out.intents.len(), 2);
    }

    #[tokio::test]
    async fn invalid_email_reprompts_without_phase_change() {
        let mut s = fresh();
        s.registration_phase = RegistrationPhase::AwaitingEmailText;
        s.name = Some("Asha".into());
        let out = engine().handle(s, &InboundEvent::text("nope"), t0()).await;
        assert_eq!(
            out.snapshot.registration_phase,
            RegistrationPhase::AwaitingEmailText
        );
        assert_eq!(out.intents, vec![prompts::invalid_email()]);
    }

    #[tokio::test]
    async fn typed_skip_is_case_insensitive() {
        let mut s = fresh();
        s.registration_phase = RegistrationPhase::AwaitingEmailText;
        s.name = Some("Asha".into());
        let out = engine().handle(s, &InboundEvent::text("SKIP"), t0()).await;
        assert_eq!(out.snapshot.registration_phase, RegistrationPhase::Complete);
        assert!(out.snapshot.email.is_none());
    }

    #[tokio::test]
    async fn non_text_while_awaiting_name_is_ignored() {
        let mut s = fresh();
        s.registration_phase = RegistrationPhase::AwaitingName;
        s.interaction_count = 1;
        let before = s.clone();
        let out = engine()
            .handle(s, &InboundEvent::location(19.0, 72.8), t0() + Duration::hours(1))
            .await;
        assert!(!out.changed);
        assert!(out.intents.is_empty());
        assert_eq!(out.snapshot, before);
    }

    #[tokio::test]
    async fn unknown_choice_is_ignored() {
        let mut s = fresh();
        s.registration_phase = RegistrationPhase::AwaitingEmailChoice;
        s.name = Some("Asha".into());
        let before = s.clone();
        let out = engine().handle(s, &InboundEvent::choice("maybe"), t0()).await;
        assert!(!out.changed);
        assert_eq!(out.snapshot, before);
    }

    #[tokio::test]
    async fn completed_registration_always_has_name() {
        let paths: [&[InboundEvent]; 3] = [
            &[
                InboundEvent::text("hi"),
                InboundEvent::text("Asha"),
                InboundEvent::choice("skip"),
            ],
            &[
                InboundEvent::text("hi"),
                InboundEvent::text("Asha"),
                InboundEvent::choice("yes"),
                InboundEvent::text("skip"),
            ],
            &[
                InboundEvent::text("hi"),
                InboundEvent::choice("skip"),
                InboundEvent::text("Asha"),
                InboundEvent::choice("yes"),
                InboundEvent::text("a@b.co"),
            ],
        ];
        for events in paths {
            let out = run(&engine(), fresh(), events).await;
            assert!(out.snapshot.is_registered());
            assert!(out.snapshot.name.is_some());
        }
    }

    #[tokio::test]
    async fn registration_bonus_is_configurable() {
        let eligibility = DeliveryEligibility::new(
            Arc::new(StaticZoneCatalog::default_zones()),
            Arc::new(OfflineGeocoder),
            EligibilityConfig::default(),
        );
        let engine = ConversationEngine::new(
            Arc::new(eligibility),
            EngineConfig {
                registration_bonus: 250,
                ..Default::default()
            },
        );
        let mut s = fresh();
        s.registration_phase = RegistrationPhase::AwaitingEmailChoice;
        s.name = Some("Asha".into());
        s.loyalty_points = 10;
        let out = engine.handle(s, &InboundEvent::choice("skip"), t0()).await;
        assert_eq!(out.snapshot.loyalty_points, 260);
    }

    // ── Address collection ──────────────────────────────────────────

    #[tokio::test]
    async fn details_with_catalog_postal_code() {
        let mut s = at_phase(AddressPhase::AwaitingDetails);
        s.address_draft.coordinates = Some(Coordinates::new(18.91, 72.82));
        s.address_draft.postal_code = Some("400005".into());

        let out = engine()
            .handle(s, &InboundEvent::text("2nd floor, near park"), t0())
            .await;
        let draft = &out.snapshot.address_draft;
        let verdict = draft.verdict.as_ref().unwrap();
        assert!(verdict.serviceable);
        assert_eq!(verdict.fee, 45);
        assert_eq!(verdict.min_order, 300);
        assert_eq!(out.snapshot.address_phase, AddressPhase::AwaitingConfirmation);
        assert_eq!(draft.detail_text.as_deref(), Some("2nd floor, near park"));
        assert_eq!(
            draft.details.as_ref().and_then(|d| d.landmark.as_deref()),
            Some("park")
        );
        assert_eq!(out.intents[0].choice_ids(), vec![ChoiceId::Confirm, ChoiceId::Change]);
        assert!(out.intents[0].body().contains("Delivery charge: ₹45"));
    }

    #[tokio::test]
    async fn share_location_flow_confirms_with_marker() {
        let out = run(
            &engine(),
            registered(),
            &[
                InboundEvent::choice("share_location"),
                InboundEvent::location(19.08, 72.88),
                InboundEvent::text("Flat 4, Sea View Apartment"),
                InboundEvent::choice("confirm"),
            ],
        )
        .await;
        assert_eq!(out.snapshot.address_phase, AddressPhase::Complete);
        assert_eq!(
            out.snapshot.address_draft.confirmed_summary.as_deref(),
            Some("Flat 4, Sea View Apartment\n📍 Location attached")
        );
        assert_eq!(out.intents, vec![prompts::address_confirmed()]);
    }

    #[tokio::test]
    async fn share_location_emits_location_request() {
        let out = engine()
            .handle(registered(), &InboundEvent::choice("share_location"), t0())
            .await;
        assert_eq!(out.snapshot.address_phase, AddressPhase::AwaitingLocation);
        assert!(matches!(out.intents[0], Intent::LocationRequest { .. }));
    }

    #[tokio::test]
    async fn typed_address_uses_its_postal_code() {
        let out = run(
            &engine(),
            registered(),
            &[
                InboundEvent::choice("type_address"),
                InboundEvent::text("12 Marine Drive Road, Mumbai 400003"),
            ],
        )
        .await;
        let draft = &out.snapshot.address_draft;
        assert_eq!(draft.postal_code.as_deref(), Some("400003"));
        assert_eq!(draft.verdict.as_ref().unwrap().fee, 40);
        assert_eq!(out.snapshot.address_phase, AddressPhase::AwaitingConfirmation);
    }

    #[tokio::test]
    async fn typed_address_without_postal_code_is_unverifiable() {
        let out = run(
            &engine(),
            registered(),
            &[
                InboundEvent::choice("type_address"),
                InboundEvent::text("Somewhere near the station"),
            ],
        )
        .await;
        let verdict = out.snapshot.address_draft.verdict.clone().unwrap();
        assert!(!verdict.serviceable);
        // Offered anyway under the default policy.
        assert_eq!(out.intents[0].choice_ids(), vec![ChoiceId::Confirm, ChoiceId::Change]);
    }

    #[tokio::test]
    async fn change_resets_draft_and_reoffers_method() {
        let out = run(
            &engine(),
            registered(),
            &[
                InboundEvent::choice("type_address"),
                InboundEvent::text("12 Marine Drive Road, Mumbai 400003"),
                InboundEvent::choice("change"),
            ],
        )
        .await;
        assert_eq!(out.snapshot.address_phase, AddressPhase::AwaitingMethod);
        assert_eq!(out.snapshot.address_draft, AddressDraft::default());
        assert_eq!(out.intents, vec![prompts::address_method()]);
    }

    #[tokio::test]
    async fn confirm_replay_after_complete_is_ignored() {
        let done = run(
            &engine(),
            registered(),
            &[
                InboundEvent::choice("type_address"),
                InboundEvent::text("12 Marine Drive Road, Mumbai 400003"),
                InboundEvent::choice("confirm"),
            ],
        )
        .await
        .snapshot;
        assert_eq!(done.address_phase, AddressPhase::Complete);

        let replay = engine()
            .handle(done.clone(), &InboundEvent::choice("confirm"), t0() + Duration::days(1))
            .await;
        assert!(!replay.changed);
        assert!(replay.intents.is_empty());
        assert_eq!(replay.snapshot, done);
    }

    #[tokio::test]
    async fn require_change_blocks_unserviceable_confirm() {
        let far = Coordinates::new(19.0760 + 7.0 / 111.195, 72.8777);
        let out = run(
            &engine_with(UnserviceablePolicy::RequireChange),
            registered(),
            &[
                InboundEvent::choice("share_location"),
                InboundEvent::location(far.lat, far.lng),
                InboundEvent::text("Flat 2"),
            ],
        )
        .await;
        let verdict = out.snapshot.address_draft.verdict.clone().unwrap();
        assert_eq!(verdict.reason.as_deref(), Some(REASON_OUTSIDE_RADIUS));
        assert_eq!(out.intents[0].choice_ids(), vec![ChoiceId::Change]);

        let before = out.snapshot.clone();
        let tap = engine_with(UnserviceablePolicy::RequireChange)
            .handle(out.snapshot, &InboundEvent::choice("confirm"), t0())
            .await;
        assert!(!tap.changed);
        assert_eq!(tap.snapshot, before);
    }

    #[tokio::test]
    async fn text_while_awaiting_location_is_ignored() {
        let s = at_phase(AddressPhase::AwaitingLocation);
        let out = engine().handle(s.clone(), &InboundEvent::text("here"), t0()).await;
        assert!(!out.changed);
        assert_eq!(out.snapshot, s);
    }

    #[tokio::test]
    async fn menu_keyword_shows_placeholder() {
        let mut s = at_phase(AddressPhase::Complete);
        s.address_draft.confirmed_summary = Some("12 MG Road".into());
        let out = engine().handle(s, &InboundEvent::text(" Menu "), t0()).await;
        assert_eq!(out.intents, vec![prompts::menu_placeholder()]);
        assert_eq!(out.snapshot.address_phase, AddressPhase::Complete);
    }

    #[tokio::test]
    async fn other_text_after_complete_welcomes_back() {
        let mut s = at_phase(AddressPhase::Complete);
        s.address_draft.confirmed_summary = Some("12 MG Road".into());
        let out = engine().handle(s, &InboundEvent::text("hello"), t0()).await;
        assert_eq!(out.intents, vec![prompts::welcome_back("Asha Rao", 100)]);
    }

    #[tokio::test]
    async fn handled_event_updates_last_interaction() {
        let later = t0() + Duration::minutes(5);
        let out = engine()
            .handle(registered(), &InboundEvent::choice("type_address"), later)
            .await;
        assert_eq!(out.snapshot.last_interaction_at, later);
        assert_eq!(out.snapshot.created_at, t0());
        assert_eq!(out.snapshot.interaction_count, 4);
    }

    #[test]
    fn policy_parses() {
        assert_eq!(
            "require_change".parse::<UnserviceablePolicy>().unwrap(),
            UnserviceablePolicy::RequireChange
        );
        assert_eq!(
            " Offer_Confirm ".parse::<UnserviceablePolicy>().unwrap(),
            UnserviceablePolicy::OfferConfirm
        );
        assert!("block".parse::<UnserviceablePolicy>().is_err());
    }
}
