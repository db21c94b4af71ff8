//! `input_boolean` helper entities
//!
//! Entities are declared in YAML and switched with the `turn_on`,
//! `turn_off` and `toggle` services. Every write is stamped with the
//! context of the service call that caused it.

use ha_core::{Context, EntityId, ServiceCall, ATTR_FRIENDLY_NAME, STATE_OFF, STATE_ON};
use ha_service_registry::ServiceRegistry;
use ha_state_machine::StateMachine;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DOMAIN: &str = "input_boolean";

/// One `input_boolean:` entry from YAML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputBooleanConfig {
    #[serde(default)]
    pub name: Option<String>,
    /// e.g. "mdi:door"
    #[serde(default)]
    pub icon: Option<String>,
    /// Initial state, off when absent
    #[serde(default)]
    pub initial: Option<bool>,
}

/// Create the configured entities in the state machine
///
/// Invalid object ids are skipped with a warning. Returns how many entities
/// were created.
pub fn load_input_booleans(
    config: &HashMap<String, Option<InputBooleanConfig>>,
    states: &StateMachine,
) -> usize {
    let mut count = 0;

    for (id, config) in config {
        let entity_id = match EntityId::new(DOMAIN, id) {
            Ok(e) => e,
            Err(e) => {
                warn!("Invalid input_boolean id '{}': {}", id, e);
                continue;
            }
        };
        let config = config.clone().unwrap_or_default();

        let state = if config.initial.unwrap_or(false) {
            STATE_ON
        } else {
            STATE_OFF
        };

        let mut attributes = HashMap::new();
        if let Some(name) = &config.name {
            attributes.insert(ATTR_FRIENDLY_NAME.to_string(), json!(name));
        }
        if let Some(icon) = &config.icon {
            attributes.insert("icon".to_string(), json!(icon));
        }
        attributes.insert("editable".to_string(), json!(false));

        states.set(entity_id, state, attributes, Context::new());
        debug!("Loaded input_boolean.{} = {}", id, state);
        count += 1;
    }

    if count > 0 {
        info!("Loaded {} input_boolean entities", count);
    }
    count
}

/// What a service does to the current state value
#[derive(Debug, Clone, Copy)]
enum Switch {
    On,
    Off,
    Toggle,
}

impl Switch {
    fn apply(self, current: &str) -> &'static str {
        match self {
            Switch::On => STATE_ON,
            Switch::Off => STATE_OFF,
            Switch::Toggle if current == STATE_ON => STATE_OFF,
            Switch::Toggle => STATE_ON,
        }
    }
}

/// Register `input_boolean.turn_on`, `turn_off` and `toggle`
///
/// Targets that do not exist are skipped; the call still succeeds, matching
/// how the host treats entity services with stale targets.
pub fn register_input_boolean_services(services: &ServiceRegistry, states: Arc<StateMachine>) {
    for (service, switch) in [
        ("turn_on", Switch::On),
        ("turn_off", Switch::Off),
        ("toggle", Switch::Toggle),
    ] {
        let states = states.clone();
        services.register(DOMAIN, service, move |call: ServiceCall| {
            let states = states.clone();
            async move {
                for entity_id in call.entity_ids() {
                    if !entity_id.in_domain(DOMAIN) {
                        continue;
                    }
                    match states.get(&entity_id.to_string()) {
                        Some(current) => {
                            let target = switch.apply(&current.state);
                            states.set(entity_id, target, current.attributes, call.context.clone());
                        }
                        None => debug!(entity_id = %entity_id, "No such input_boolean"),
                    }
                }
                Ok(())
            }
        });
    }

    info!("Input boolean services registered");
}
