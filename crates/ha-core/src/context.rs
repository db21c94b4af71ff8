//! Context type linking state changes to whoever caused them

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Origin of an event, state write or service call
///
/// A state written by a service handler carries the context of the service
/// call, so a listener can tell which command produced a given
/// `state_changed` event by comparing context ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Unique identifier (ULID)
    pub id: String,

    /// User that initiated the action, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Context this one was derived from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Context {
    /// Create a context with a fresh id and no user
    pub fn new() -> Self {
        Self {
            id: Ulid::new().to_string(),
            user_id: None,
            parent_id: None,
        }
    }

    /// Create a context attributed to a user
    pub fn with_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::new()
        }
    }

    /// Whether a user (rather than an automation or integration) caused this
    pub fn is_user_initiated(&self) -> bool {
        self.user_id.is_some()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
