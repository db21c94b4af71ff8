//! Core types shared by the host crates
//!
//! Entity identifiers, states, events, contexts and service calls. These are
//! the values that travel over the event bus and through the service
//! registry; none of them carry behaviour beyond validation and small
//! accessors.

mod context;
mod entity_id;
mod event;
mod service_call;
mod state;

pub use context::Context;
pub use entity_id::{EntityId, EntityIdError};
pub use event::{Event, EventData, EventType};
pub use service_call::ServiceCall;
pub use state::{State, ATTR_FRIENDLY_NAME};

/// State value of an entity that is switched on
pub const STATE_ON: &str = "on";

/// State value of an entity that is switched off
pub const STATE_OFF: &str = "off";

/// State value reported when the integration does not know the state
pub const STATE_UNKNOWN: &str = "unknown";

/// State value reported when the entity cannot be reached
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// Event types fired by the host
pub mod events {
    use super::*;

    /// Fired by the state machine whenever an entity's state or attributes change
    pub const STATE_CHANGED: &str = "state_changed";

    /// Payload of a `state_changed` event
    ///
    /// `old_state` is `None` when the entity was just added and `new_state`
    /// is `None` when it was removed.
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct StateChangedData {
        pub entity_id: EntityId,
        pub old_state: Option<State>,
        pub new_state: Option<State>,
    }

    impl EventData for StateChangedData {
        fn event_type() -> &'static str {
            STATE_CHANGED
        }
    }
}
