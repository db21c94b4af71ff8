//! Capabilities the reactor needs from its host
//!
//! The reactor never touches the event bus, state machine or service
//! registry directly. It goes through these traits, which [`LocalHost`]
//! implements for the in-process host and tests implement with recorders.

use crate::error::HostError;
use async_trait::async_trait;
use ha_core::{EntityId, ServiceCall, State};
use ha_event_bus::{EventBus, EventReceiver};
use ha_service_registry::ServiceRegistry;
use ha_state_machine::StateMachine;
use std::sync::Arc;

/// Register a listener for an event type
///
/// Dropping the receiver deregisters the listener.
pub trait EventSource: Send + Sync {
    /// Fails when the host refuses new listeners, e.g. during shutdown
    fn listen(&self, event_type: &str) -> Result<EventReceiver, HostError>;
}

/// Invoke host services
#[async_trait]
pub trait ServiceCaller: Send + Sync {
    /// Resolves once the handler has finished; the call's context is what
    /// the resulting state writes carry
    async fn call_service(&self, call: ServiceCall) -> Result<(), HostError>;

    /// Whether `domain.service` is currently registered
    fn has_service(&self, domain: &str, service: &str) -> bool;
}

/// Read current entity states
pub trait StateReader: Send + Sync {
    /// Current state of an entity, `None` if it does not exist
    fn state(&self, entity_id: &EntityId) -> Option<State>;
}

/// Everything the reactor uses
pub trait Host: EventSource + ServiceCaller + StateReader + 'static {}

impl<T: EventSource + ServiceCaller + StateReader + 'static> Host for T {}

/// The in-process host: event bus, state machine and service registry
#[derive(Clone)]
pub struct LocalHost {
    pub bus: Arc<EventBus>,
    pub states: Arc<StateMachine>,
    pub services: Arc<ServiceRegistry>,
}

impl LocalHost {
    pub fn new() -> Self {
        let bus = Arc::new(EventBus::new());
        let states = Arc::new(StateMachine::new(bus.clone()));
        let services = Arc::new(ServiceRegistry::new());

        Self {
            bus,
            states,
            services,
        }
    }
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for LocalHost {
    fn listen(&self, event_type: &str) -> Result<EventReceiver, HostError> {
        Ok(self.bus.subscribe(event_type)?)
    }
}

#[async_trait]
impl ServiceCaller for LocalHost {
    async fn call_service(&self, call: ServiceCall) -> Result<(), HostError> {
        Ok(self.services.call(call).await?)
    }

    fn has_service(&self, domain: &str, service: &str) -> bool {
        self.services.has_service(domain, service)
    }
}

impl StateReader for LocalHost {
    fn state(&self, entity_id: &EntityId) -> Option<State> {
        self.states.get(&entity_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ha_core::Context;
    use ha_service_registry::ServiceError;
    use serde_json::json;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_local_host_routes_to_parts() {
        let host = LocalHost::new();
        let id: EntityId = "input_boolean.a".parse().unwrap();
        let mut rx = host.listen("state_changed").unwrap();

        host.states.set(id.clone(), "on", HashMap::new(), Context::new());
        assert_eq!(host.state(&id).unwrap().state, "on");
        assert_eq!(rx.recv().await.unwrap().data["entity_id"], "input_boolean.a");

        let err = host
            .call_service(ServiceCall::new("input_boolean", "turn_off", json!({}), Context::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::Service(ServiceError::NotFound { .. })));
        assert!(!host.has_service("input_boolean", "turn_off"));
    }

    #[test]
    fn test_listen_fails_on_closed_bus() {
        let host = LocalHost::new();
        host.bus.close();
        assert!(matches!(host.listen("state_changed"), Err(HostError::Listen(_))));
    }
}
