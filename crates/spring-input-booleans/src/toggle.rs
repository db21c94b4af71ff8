//! The two-state view of a toggle entity

use ha_core::{State, STATE_OFF, STATE_ON, STATE_UNAVAILABLE, STATE_UNKNOWN};
use std::fmt;

/// State of a toggle entity as the reactor sees it
///
/// Anything the host reports other than `on`, `off` or `unavailable` is
/// treated as [`ToggleState::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToggleState {
    On,
    Off,
    Unknown,
    Unavailable,
}

impl ToggleState {
    /// Read a host state string; anything unrecognised is `Unknown`
    pub fn parse(value: &str) -> Self {
        match value {
            STATE_ON => ToggleState::On,
            STATE_OFF => ToggleState::Off,
            STATE_UNAVAILABLE => ToggleState::Unavailable,
            _ => ToggleState::Unknown,
        }
    }

    /// The host state string for this value
    pub fn as_str(self) -> &'static str {
        match self {
            ToggleState::On => STATE_ON,
            ToggleState::Off => STATE_OFF,
            ToggleState::Unknown => STATE_UNKNOWN,
            ToggleState::Unavailable => STATE_UNAVAILABLE,
        }
    }

    /// The opposite state, if there is one
    pub fn negate(self) -> Option<Self> {
        match self {
            ToggleState::On => Some(ToggleState::Off),
            ToggleState::Off => Some(ToggleState::On),
            ToggleState::Unknown | ToggleState::Unavailable => None,
        }
    }
}

impl From<&State> for ToggleState {
    fn from(state: &State) -> Self {
        Self::parse(&state.state)
    }
}

impl fmt::Display for ToggleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
