use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Instantaneous electrical state of the button, sampled once per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonLevel {
    Low,
    High,
}

impl ButtonLevel {
    pub fn from_pressed(pressed: bool) -> Self {
        if pressed {
            ButtonLevel::High
        } else {
            ButtonLevel::Low
        }
    }
}

/// Discrete outcomes of the press/release classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureEvent {
    /// Rising edge from idle
    PressStart,
    /// Still pressed after the hold threshold
    HoldConfirmed,
    /// Released before the hold threshold
    ReleaseAsClick,
    /// Released after a confirmed hold
    ReleaseAsHoldStop,
}

impl GestureEvent {
    pub fn name(&self) -> &'static str {
        match self {
            GestureEvent::PressStart => "press_start",
            GestureEvent::HoldConfirmed => "hold_confirmed",
            GestureEvent::ReleaseAsClick => "release_as_click",
            GestureEvent::ReleaseAsHoldStop => "release_as_hold_stop",
        }
    }
}

/// Classifier state. The press timestamp only exists while pressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GestureState {
    #[default]
    Idle,
    PressedUnconfirmed { since: Instant },
    HoldActive { since: Instant },
}

impl GestureState {
    pub fn name(&self) -> &'static str {
        match self {
            GestureState::Idle => "idle",
            GestureState::PressedUnconfirmed { .. } => "pressed_unconfirmed",
            GestureState::HoldActive { .. } => "hold_active",
        }
    }

    /// When the current press began, if any
    pub fn pressed_since(&self) -> Option<Instant> {
        match self {
            GestureState::Idle => None,
            GestureState::PressedUnconfirmed { since } | GestureState::HoldActive { since } => {
                Some(*since)
            }
        }
    }
}
