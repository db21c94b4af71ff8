//! "Turned off" notifications with snooze buttons

use crate::actions::SpringAction;
use crate::config::SpringConfig;
use crate::host::ServiceCaller;
use ha_core::{Context, EntityId, ServiceCall};
use md5::{Digest, Md5};
use serde_json::{json, Value};
use tracing::{debug, warn};

const NOTIFY_DOMAIN: &str = "notify";
const MOBILE_APP_PREFIX: &str = "mobile_app_";
const NOTIFICATION_TITLE: &str = "Spring Input Boolean";

/// Notification tag for an entity: `sib_` plus the first eight hex digits
/// of the MD5 of the entity id
///
/// Stable across restarts and well under the 64 byte APNS collapse id limit.
pub fn notification_tag(entity_id: &EntityId) -> String {
    let digest = format!("{:x}", Md5::digest(entity_id.to_string().as_bytes()));
    format!("sib_{}", &digest[..8])
}

/// Service data for a notify call
pub fn build_notification(entity_id: &EntityId, friendly_name: &str, delay_seconds: u64) -> Value {
    let actions: Vec<Value> = SpringAction::ALL
        .iter()
        .map(|a| json!({"action": a.action_id(entity_id), "title": a.title()}))
        .collect();

    json!({
        "title": NOTIFICATION_TITLE,
        "message": format!(
            "Input boolean '{}' was turned off and will reactivate in {} seconds",
            friendly_name, delay_seconds
        ),
        "data": {
            "priority": "normal",
            "tag": notification_tag(entity_id),
            "actions": actions,
        },
    })
}

/// Where notifications go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    None,
    /// One `notify.mobile_app_<phone>` call per phone
    Phones(Vec<String>),
    /// A single call to `notify.<service>`
    Service(String),
}

impl Recipients {
    pub fn from_config(config: &SpringConfig) -> Self {
        if config.phone_entity_ids.is_empty() {
            return Recipients::None;
        }
        match config.notification_service.as_str() {
            "notify" | "mobile_app" => Recipients::Phones(
                config
                    .phone_entity_ids
                    .iter()
                    .map(|phone| {
                        if phone.starts_with(MOBILE_APP_PREFIX) {
                            phone.clone()
                        } else {
                            format!("{}{}", MOBILE_APP_PREFIX, phone)
                        }
                    })
                    .collect(),
            ),
            other => Recipients::Service(other.to_string()),
        }
    }
}

/// Send the notification; failures are logged and swallowed
pub async fn send_notification<H: ServiceCaller + ?Sized>(
    host: &H,
    recipients: &Recipients,
    payload: &Value,
) {
    match recipients {
        Recipients::None => debug!("No phone entity ids configured, skipping notification"),
        Recipients::Phones(services) => {
            for service in services {
                if !host.has_service(NOTIFY_DOMAIN, service) {
                    warn!(service = %service, "Notify service not found, skipping");
                    continue;
                }
                call_notify(host, service, payload).await;
            }
        }
        Recipients::Service(service) => call_notify(host, service, payload).await,
    }
}

async fn call_notify<H: ServiceCaller + ?Sized>(host: &H, service: &str, payload: &Value) {
    let call = ServiceCall::new(NOTIFY_DOMAIN, service, payload.clone(), Context::new());
    match host.call_service(call).await {
        Ok(()) => debug!(service = %service, "Notification sent"),
        Err(e) => warn!(service = %service, error = %e, "Failed to send notification"),
    }
}
