//! Event bus for the in-process host
//!
//! One `tokio::sync::broadcast` channel per event type. Listeners get their
//! own receiver; dropping it is how a listener deregisters. Closing the bus
//! (the host is stopping) ends every receiver and refuses new ones.

use dashmap::DashMap;
use ha_core::{Context, Event, EventData, EventType};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

/// Per-channel buffer
const CHANNEL_CAPACITY: usize = 1024;

/// Receiver half handed to listeners
pub type EventReceiver = broadcast::Receiver<Event<serde_json::Value>>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BusError {
    #[error("event bus is closed, cannot listen for '{0}'")]
    Closed(EventType),
}

pub struct EventBus {
    listeners: DashMap<EventType, broadcast::Sender<Event<serde_json::Value>>>,
    closed: AtomicBool,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Listen for one event type
    pub fn subscribe(&self, event_type: impl Into<EventType>) -> Result<EventReceiver, BusError> {
        let event_type = event_type.into();
        if self.is_closed() {
            warn!(event_type = %event_type, "Refusing listener on closed event bus");
            return Err(BusError::Closed(event_type));
        }
        trace!(event_type = %event_type, "Subscribing to event type");

        Ok(self
            .listeners
            .entry(event_type)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe())
    }

    /// Deliver an event to its type's listeners
    ///
    /// Events fired after [`EventBus::close`] are dropped.
    pub fn fire(&self, event: Event<serde_json::Value>) {
        if self.is_closed() {
            trace!(event_type = %event.event_type, "Dropping event on closed bus");
            return;
        }
        debug!(event_type = %event.event_type, "Firing event");

        if let Some(sender) = self.listeners.get(&event.event_type) {
            // A send error only means nobody is listening
            let _ = sender.send(event);
        }
    }

    pub fn fire_typed<T: EventData + serde::Serialize>(&self, data: T, context: Context) {
        match serde_json::to_value(&data) {
            Ok(json) => self.fire(Event::new(T::event_type(), json, context)),
            Err(e) => warn!(event_type = T::event_type(), error = %e, "Cannot serialize event"),
        }
    }

    /// Stop accepting listeners and events
    ///
    /// Existing receivers get `RecvError::Closed` once they have drained
    /// what was already sent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.listeners.clear();
            debug!("Event bus closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of live receivers for an event type
    pub fn listener_count(&self, event_type: impl Into<EventType>) -> usize {
        self.listeners
            .get(&event_type.into())
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ha_core::events::StateChangedData;
    use ha_core::{EntityId, State};
    use serde_json::json;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_subscribe_and_fire() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe("test_event").unwrap();

        bus.fire(Event::new("test_event", json!({"key": "value"}), Context::new()));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type.as_str(), "test_event");
        assert_eq!(received.data["key"], "value");
    }

    #[tokio::test]
    async fn test_fire_typed() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe("state_changed").unwrap();

        let entity_id = EntityId::new("input_boolean", "test").unwrap();
        let new_state = State::new(entity_id.clone(), "on", HashMap::new(), Context::new());
        bus.fire_typed(
            StateChangedData {
                entity_id,
                old_state: None,
                new_state: Some(new_state),
            },
            Context::new(),
        );

        let received: StateChangedData = rx.recv().await.unwrap().parse_data().unwrap();
        assert_eq!(received.entity_id.to_string(), "input_boolean.test");
        assert_eq!(received.new_state.unwrap().state, "on");
    }

    #[tokio::test]
    async fn test_no_cross_event_pollution() {
        let bus = EventBus::new();
        let mut rx_a = bus.subscribe("event_a").unwrap();
        let mut rx_b = bus.subscribe("event_b").unwrap();

        bus.fire(Event::new("event_a", json!({"type": "a"}), Context::new()));

        assert_eq!(rx_a.recv().await.unwrap().data["type"], "a");
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_ends_existing_receivers() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe("state_changed").unwrap();

        bus.close();
        bus.fire(Event::new("state_changed", json!({}), Context::new()));

        assert_eq!(rx.recv().await.unwrap_err(), broadcast::error::RecvError::Closed);
        assert_eq!(bus.listener_count("state_changed"), 0);
    }

    #[test]
    fn test_closed_bus_refuses_listeners() {
        let bus = EventBus::new();
        bus.close();

        assert!(bus.is_closed());
        assert_eq!(
            bus.subscribe("state_changed").unwrap_err(),
            BusError::Closed(EventType::from("state_changed"))
        );
    }

    #[test]
    fn test_listener_count_drops_with_receiver() {
        let bus = EventBus::new();
        let rx = bus.subscribe("state_changed").unwrap();
        assert_eq!(bus.listener_count("state_changed"), 1);

        drop(rx);
        assert_eq!(bus.listener_count("state_changed"), 0);
        assert_eq!(bus.listener_count("never_subscribed"), 0);
    }
}
