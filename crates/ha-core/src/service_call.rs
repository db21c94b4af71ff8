//! Service calls routed through the service registry

use crate::{Context, EntityId};
use serde::{Deserialize, Serialize};

/// A request to run `domain.service` with some data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCall {
    /// Domain owning the service, e.g. "input_boolean" or "notify"
    pub domain: String,

    /// Service name, e.g. "turn_off"
    pub service: String,

    pub service_data: serde_json::Value,

    /// Context the handler should stamp on any state it writes
    pub context: Context,
}

impl ServiceCall {
    pub fn new(
        domain: impl Into<String>,
        service: impl Into<String>,
        service_data: serde_json::Value,
        context: Context,
    ) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            service_data,
            context,
        }
    }

    /// A call targeting a single entity: `{"entity_id": "<id>"}`
    pub fn for_entity(
        domain: impl Into<String>,
        service: impl Into<String>,
        entity_id: &EntityId,
        context: Context,
    ) -> Self {
        Self::new(
            domain,
            service,
            serde_json::json!({ "entity_id": entity_id.to_string() }),
            context,
        )
    }

    /// `domain.service`
    pub fn service_id(&self) -> String {
        format!("{}.{}", self.domain, self.service)
    }

    /// Target entities, accepting either a single string or a list
    ///
    /// Entries that are not valid entity ids are dropped.
    pub fn entity_ids(&self) -> Vec<EntityId> {
        match self.service_data.get("entity_id") {
            Some(serde_json::Value::String(s)) => s.parse::<EntityId>().into_iter().collect(),
            Some(serde_json::Value::Array(arr)) => arr
                .iter()
                .filter_map(|v| v.as_str())
                .filter_map(|s| s.parse().ok())
                .collect(),
            _ => vec![],
        }
    }
}
