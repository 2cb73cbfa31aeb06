//! Conversation core — inbound events, outbound intents and the state
//! machine that connects them.

pub mod engine;
pub mod event;
pub mod intent;
pub mod prompts;

pub use engine::{ConversationEngine, EngineConfig, Outcome, UnserviceablePolicy};
pub use event::{InboundEnvelope, InboundEvent};
pub use intent::{Choice, ChoiceId, Intent, ListRow, ListSection};
