use super::input::ButtonInput;
use super::types::ButtonLevel;
use crate::error::ButtonError;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Button whose level is set in software
pub struct SimulatedButton {
    handle: SimulatedButtonHandle,
}

/// Cloneable remote control for a [`SimulatedButton`]
#[derive(Debug, Clone, Default)]
pub struct SimulatedButtonHandle {
    pressed: Arc<AtomicBool>,
    failing_reads: Arc<AtomicU32>,
}

impl SimulatedButton {
    pub fn new() -> (Self, SimulatedButtonHandle) {
        let handle = SimulatedButtonHandle::default();
        (
            Self {
                handle: handle.clone(),
            },
            handle,
        )
    }
}

impl SimulatedButtonHandle {
    pub fn press(&self) {
        self.pressed.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.pressed.store(false, Ordering::SeqCst);
    }

    /// Flip the level and return the new one
    pub fn toggle(&self) -> ButtonLevel {
        let was = self.pressed.fetch_xor(true, Ordering::SeqCst);
        ButtonLevel::from_pressed(!was)
    }

    pub fn level(&self) -> ButtonLevel {
        ButtonLevel::from_pressed(self.pressed.load(Ordering::SeqCst))
    }

    /// Make the next `count` reads fail
    pub fn fail_next_reads(&self, count: u32) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl ButtonInput for SimulatedButton {
    fn read_level(&mut self) -> Result<ButtonLevel, ButtonError> {
        if self.handle.take_failure() {
            return Err(ButtonError::Read {
                device: "simulated".to_string(),
                details: "injected read failure".to_string(),
            });
        }
        Ok(self.handle.level())
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
