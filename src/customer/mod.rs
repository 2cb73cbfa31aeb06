//! Customer state — the per-identifier snapshot the conversation engine
//! advances on every inbound event.

pub mod model;
pub mod state;

pub use model::{AddressDraft, Coordinates, CustomerSnapshot, RECENT_MESSAGE_IDS};
pub use state::{AddressPhase, RegistrationPhase};
