//! Actionable notification buttons
//!
//! The phone app reports a button press as an event whose `action`
//! (Android) or `actionName` (iOS) field is `<KEY>::<entity_id>`. A press
//! picks the delay for the next reversal of that entity.

use dashmap::DashMap;
use ha_core::EntityId;
use std::time::Duration;

/// Event fired by the Android companion app
pub const MOBILE_APP_ACTION_EVENT: &str = "mobile_app_notification_action";

/// Event fired by the iOS companion app
pub const IOS_ACTION_EVENT: &str = "ios.action_fired";

const ACTION_PREFIX: &str = "SIB_";
const ACTION_SEPARATOR: &str = "::";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpringAction {
    OffFor10s,
    OffFor20s,
    ReactivateNow,
}

impl SpringAction {
    pub const ALL: [SpringAction; 3] = [
        SpringAction::OffFor10s,
        SpringAction::OffFor20s,
        SpringAction::ReactivateNow,
    ];

    fn key(self) -> &'static str {
        match self {
            SpringAction::OffFor10s => "SIB_OFF_10",
            SpringAction::OffFor20s => "SIB_OFF_20",
            SpringAction::ReactivateNow => "SIB_REACTIVATE",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.key() == key)
    }

    /// Button label
    pub fn title(self) -> &'static str {
        match self {
            SpringAction::OffFor10s => "Off for 10s",
            SpringAction::OffFor20s => "Off for 20s",
            SpringAction::ReactivateNow => "Reactivate Now",
        }
    }

    /// Delay the next reversal will use
    pub fn delay(self) -> Duration {
        match self {
            SpringAction::OffFor10s => Duration::from_secs(10),
            SpringAction::OffFor20s => Duration::from_secs(20),
            SpringAction::ReactivateNow => Duration::ZERO,
        }
    }

    /// Identifier sent with the notification button
    pub fn action_id(self, entity_id: &EntityId) -> String {
        format!("{}{}{}", self.key(), ACTION_SEPARATOR, entity_id)
    }
}

/// A button press for one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub action: SpringAction,
    pub entity_id: EntityId,
}

/// Read a button press out of a companion-app event payload
///
/// Returns `None` for presses of buttons that are not ours.
pub fn parse_action(data: &serde_json::Value) -> Option<ActionRequest> {
    let raw = data
        .get("action")
        .and_then(|v| v.as_str())
        .or_else(|| data.get("actionName").and_then(|v| v.as_str()))?;

    if !raw.starts_with(ACTION_PREFIX) {
        return None;
    }
    let (key, target) = raw.split_once(ACTION_SEPARATOR)?;

    Some(ActionRequest {
        action: SpringAction::from_key(key)?,
        entity_id: target.parse().ok()?,
    })
}

/// One-shot delay overrides, keyed by entity
#[derive(Debug, Default)]
pub struct DelayOverrides {
    delays: DashMap<EntityId, Duration>,
}

impl DelayOverrides {
    pub fn set(&self, entity_id: EntityId, delay: Duration) {
        self.delays.insert(entity_id, delay);
    }

    /// Remove and return the override for an entity
    pub fn take(&self, entity_id: &EntityId) -> Option<Duration> {
        self.delays.remove(entity_id).map(|(_, d)| d)
    }
}
