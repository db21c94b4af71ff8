//! Events carried by the event bus

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::Context;

/// Payload types that know which event type they belong to
pub trait EventData: Clone + Send + Sync + 'static {
    fn event_type() -> &'static str;
}

/// Name of an event type, e.g. `state_changed`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventType(String);

impl EventType {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self(event_type.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EventType {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An event fired on the bus
///
/// On the wire the payload is untyped JSON; [`Event::parse_data`] recovers
/// a typed view for listeners that know what they subscribed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T = serde_json::Value> {
    pub event_type: EventType,
    pub data: T,
    pub time_fired: DateTime<Utc>,
    pub context: Context,
}

impl<T> Event<T> {
    /// Create an event stamped with the current time
    pub fn new(event_type: impl Into<EventType>, data: T, context: Context) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            time_fired: Utc::now(),
            context,
        }
    }
}

impl Event<serde_json::Value> {
    /// Deserialize the JSON payload into `T`
    pub fn parse_data<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::StateChangedData;
    use serde_json::json;

    #[test]
    fn test_parse_data() {
        let event = Event::new(
            "state_changed",
            json!({"entity_id": "input_boolean.a", "old_state": null, "new_state": null}),
            Context::new(),
        );
        let data: StateChangedData = event.parse_data().unwrap();
        assert_eq!(data.entity_id.to_string(), "input_boolean.a");
        assert!(data.old_state.is_none());

        let bad = Event::new("state_changed", json!({"entity_id": 3}), Context::new());
        assert!(bad.parse_data::<StateChangedData>().is_err());
    }
}
