//! Whether a `state_changed` event calls for a reversal
//!
//! Pure function of the event and the configuration. Checks that depend on
//! what the reactor has in flight (echoes, pending reversals) live in the
//! reactor itself.

use crate::config::SpringConfig;
use crate::toggle::ToggleState;
use ha_core::events::StateChangedData;
use ha_core::EntityId;
use std::fmt;

/// Why an event produced no command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Payload is not a `state_changed` payload
    Malformed,
    WrongDomain,
    /// In the domain but not in the configured entity list
    NotMonitored,
    /// Caused by one of the reactor's own commands
    Echo,
    /// Entity was just created or just removed
    Missing,
    /// New state is unknown or unavailable
    Indeterminate,
    NoChange,
    NotUserInitiated,
    /// A reversal for the entity is still running
    AlreadyPending,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IgnoreReason::Malformed => "malformed event",
            IgnoreReason::WrongDomain => "wrong domain",
            IgnoreReason::NotMonitored => "not monitored",
            IgnoreReason::Echo => "echo of own command",
            IgnoreReason::Missing => "entity added or removed",
            IgnoreReason::Indeterminate => "unknown or unavailable",
            IgnoreReason::NoChange => "no change",
            IgnoreReason::NotUserInitiated => "no user in context",
            IgnoreReason::AlreadyPending => "reversal already pending",
        };
        f.write_str(s)
    }
}

/// A change to undo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reversal {
    pub entity_id: EntityId,
    /// State before the change (may be unknown, e.g. right after startup)
    pub previous: ToggleState,
    /// State the change moved the entity to
    pub observed: ToggleState,
    /// Negation of `observed`
    pub target: ToggleState,
    pub friendly_name: String,
    /// Context id of the change being undone
    pub cause: String,
}

impl Reversal {
    /// `on → off`, the transition that triggers a notification
    pub fn is_switch_off(&self) -> bool {
        self.previous == ToggleState::On && self.observed == ToggleState::Off
    }

    pub fn service(&self) -> &'static str {
        match self.target {
            ToggleState::On => "turn_on",
            _ => "turn_off",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Ignore(IgnoreReason),
    Reverse(Reversal),
}

pub fn decide(data: &StateChangedData, config: &SpringConfig) -> Decision {
    use IgnoreReason::*;

    if !data.entity_id.in_domain(&config.domain) {
        return Decision::Ignore(WrongDomain);
    }
    if !config.watches(&data.entity_id) {
        return Decision::Ignore(NotMonitored);
    }
    let (Some(old_state), Some(new_state)) = (&data.old_state, &data.new_state) else {
        return Decision::Ignore(Missing);
    };

    let observed = ToggleState::from(new_state);
    let Some(target) = observed.negate() else {
        return Decision::Ignore(Indeterminate);
    };
    if old_state.state == new_state.state {
        return Decision::Ignore(NoChange);
    }
    if config.require_user && !new_state.context.is_user_initiated() {
        return Decision::Ignore(NotUserInitiated);
    }

    Decision::Reverse(Reversal {
        entity_id: data.entity_id.clone(),
        previous: ToggleState::from(old_state),
        observed,
        target,
        friendly_name: new_state.friendly_name(),
        cause: new_state.context.id.clone(),
    })
}
