//! Test host for the spring reactor
//!
//! Wraps a [`LocalHost`] with the `input_boolean` component loaded and
//! records every service call the reactor makes.

#![allow(dead_code)]

use async_trait::async_trait;
use ha_components::{load_input_booleans, register_input_boolean_services, InputBooleanConfig};
use ha_core::{Context, EntityId, ServiceCall, State};
use ha_event_bus::EventReceiver;
use ha_service_registry::ServiceError;
use spring_input_booleans::{EventSource, HostError, LocalHost, ServiceCaller, StateReader};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How long to wait for expected calls before failing a test
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// How long to wait before concluding nothing else will happen
const SETTLE_TIME: Duration = Duration::from_millis(100);

pub struct TestHost {
    pub inner: LocalHost,
    captured_service_calls: Mutex<Vec<ServiceCall>>,
    failing_services: Mutex<HashSet<String>>,
}

impl TestHost {
    /// Host with the `input_boolean` services registered and the given
    /// `input_boolean:` YAML section loaded
    pub fn with_input_booleans(yaml: &str) -> Arc<Self> {
        let inner = LocalHost::new();
        register_input_boolean_services(&inner.services, inner.states.clone());

        let config: HashMap<String, Option<InputBooleanConfig>> =
            serde_yaml::from_str(yaml).expect("Invalid input_boolean YAML");
        load_input_booleans(&config, &inner.states);

        Arc::new(Self {
            inner,
            captured_service_calls: Mutex::new(Vec::new()),
            failing_services: Mutex::new(HashSet::new()),
        })
    }

    /// Switch an entity through its service, as a user would from the UI
    pub async fn user_calls(&self, service: &str, entity_id: &str) {
        let entity_id: EntityId = entity_id.parse().expect("Invalid entity_id");
        let call = ServiceCall::for_entity(
            entity_id.domain(),
            service,
            &entity_id,
            Context::with_user("test_user"),
        );
        self.inner
            .services
            .call(call)
            .await
            .expect("User service call failed");
    }

    /// Write a state directly, keeping the current attributes
    pub fn set_state(&self, entity_id: &str, state: &str) -> State {
        let attributes = self
            .inner
            .states
            .get(entity_id)
            .map(|s| s.attributes)
            .unwrap_or_default();
        let entity_id: EntityId = entity_id.parse().expect("Invalid entity_id");
        self.inner
            .states
            .set(entity_id, state, attributes, Context::with_user("test_user"))
    }

    pub fn assert_state(&self, entity_id: &str, expected: &str) {
        let state = self.inner.states.get_state(entity_id);
        assert_eq!(
            state.as_deref(),
            Some(expected),
            "Expected entity {} to be in state '{}', but was {:?}",
            entity_id,
            expected,
            state
        );
    }

    /// Make calls to `<domain>.<service>` fail without reaching the host
    pub fn fail_service(&self, domain: &str, service: &str) {
        self.failing_services
            .lock()
            .unwrap()
            .insert(format!("{}.{}", domain, service));
    }

    /// Register a `notify.<service>` that accepts everything
    pub fn register_notify(&self, service: &str) {
        self.inner
            .services
            .register("notify", service, |_call| async { Ok(()) });
    }

    /// A notify service whose handler takes an hour to return
    pub fn register_slow_notify(&self, service: &str) {
        self.inner.services.register("notify", service, |_call| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        });
    }

    pub fn captured_service_calls(&self) -> Vec<ServiceCall> {
        self.captured_service_calls.lock().unwrap().clone()
    }

    pub fn service_calls(&self, domain: &str) -> Vec<ServiceCall> {
        self.captured_service_calls()
            .into_iter()
            .filter(|c| c.domain == domain)
            .collect()
    }

    /// Wait until at least `count` calls have been captured
    pub async fn wait_for_calls(&self, count: usize) -> Vec<ServiceCall> {
        let waited = tokio::time::timeout(CALL_TIMEOUT, async {
            loop {
                let calls = self.captured_service_calls();
                if calls.len() >= count {
                    return calls;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;

        match waited {
            Ok(calls) => calls,
            Err(_) => panic!(
                "Expected {} service calls, got {:?}",
                count,
                self.captured_service_calls()
            ),
        }
    }

    /// Give the reactor time to act on anything still queued
    pub async fn settle(&self) {
        tokio::time::sleep(SETTLE_TIME).await;
    }
}

impl EventSource for TestHost {
    fn listen(&self, event_type: &str) -> Result<EventReceiver, HostError> {
        self.inner.listen(event_type)
    }
}

#[async_trait]
impl ServiceCaller for TestHost {
    async fn call_service(&self, call: ServiceCall) -> Result<(), HostError> {
        self.captured_service_calls.lock().unwrap().push(call.clone());

        let failing = self
            .failing_services
            .lock()
            .unwrap()
            .contains(&call.service_id());
        if failing {
            return Err(ServiceError::CallFailed(format!("{} rejected", call.service_id())).into());
        }
        self.inner.call_service(call).await
    }

    fn has_service(&self, domain: &str, service: &str) -> bool {
        self.inner.has_service(domain, service)
    }
}

impl StateReader for TestHost {
    fn state(&self, entity_id: &EntityId) -> Option<State> {
        self.inner.state(entity_id)
    }
}
