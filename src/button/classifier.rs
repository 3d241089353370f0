use super::types::{ButtonLevel, GestureEvent, GestureState};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Turns a sampled button level into click / hold gestures.
///
/// Only edges matter: a steady high level yields at most one
/// `HoldConfirmed` and never a second `PressStart`. The hold comparison is
/// strict, so a press lasting exactly the threshold is still a click.
#[derive(Debug)]
pub struct GestureClassifier {
    hold_threshold: Duration,
    state: GestureState,
    last_level: ButtonLevel,
}

impl GestureClassifier {
    pub fn new(hold_threshold: Duration) -> Self {
        Self {
            hold_threshold,
            state: GestureState::Idle,
            last_level: ButtonLevel::Low,
        }
    }

    /// Feed one sample; returns the gesture it completes, if any
    pub fn classify(&mut self, level: ButtonLevel, now: Instant) -> Option<GestureEvent> {
        let previous = self.last_level;
        self.last_level = level;

        let (next, event) = match (self.state, previous, level) {
            (GestureState::Idle, ButtonLevel::Low, ButtonLevel::High) => (
                GestureState::PressedUnconfirmed { since: now },
                Some(GestureEvent::PressStart),
            ),
            (GestureState::PressedUnconfirmed { .. }, _, ButtonLevel::Low) => {
                (GestureState::Idle, Some(GestureEvent::ReleaseAsClick))
            }
            (GestureState::PressedUnconfirmed { since }, _, ButtonLevel::High)
                if now.saturating_duration_since(since) > self.hold_threshold =>
            {
                (
                    GestureState::HoldActive { since },
                    Some(GestureEvent::HoldConfirmed),
                )
            }
            (GestureState::HoldActive { .. }, _, ButtonLevel::Low) => {
                (GestureState::Idle, Some(GestureEvent::ReleaseAsHoldStop))
            }
            (state, _, _) => (state, None),
        };

        if let Some(event) = event {
            let held = self
                .state
                .pressed_since()
                .map(|since| now.saturating_duration_since(since));
            debug!(
                "Gesture {:?}: {} -> {} (held {:?})",
                event,
                self.state.name(),
                next.name(),
                held.unwrap_or_default()
            );
        } else {
            trace!("Button {:?} in state {}", level, self.state.name());
        }

        self.state = next;
        event
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn hold_threshold(&self) -> Duration {
        self.hold_threshold
    }

    /// Forget any press in progress
    pub fn reset(&mut self) {
        self.state = GestureState::Idle;
        self.last_level = ButtonLevel::Low;
    }
}
