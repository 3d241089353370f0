use super::keyboard::KeyboardButton;
use super::simulated::SimulatedButton;
use super::types::ButtonLevel;
use crate::config::{ButtonBackend, ButtonConfig};
use crate::error::{ButtonError, ClickcamError, Result};
use crate::events::EventBus;
use std::sync::Arc;
use tracing::info;

/// Source of the raw button level, polled once per control tick
pub trait ButtonInput: Send + Sync {
    fn read_level(&mut self) -> std::result::Result<ButtonLevel, ButtonError>;

    /// Name used in logs
    fn name(&self) -> &str;
}

/// A ready button input plus the keyboard driver feeding it, if any
pub struct ButtonSetup {
    pub input: Box<dyn ButtonInput>,
    pub keyboard: Option<KeyboardButton>,
}

/// Builder for the configured button backend
pub struct ButtonInputBuilder {
    config: Option<ButtonConfig>,
    event_bus: Option<Arc<EventBus>>,
}

impl ButtonInputBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            event_bus: None,
        }
    }

    pub fn config(mut self, config: ButtonConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn build(self) -> Result<ButtonSetup> {
        let config = self
            .config
            .ok_or_else(|| ClickcamError::system("Button configuration must be specified"))?;

        info!("Building {:?} button input", config.backend);

        match config.backend {
            ButtonBackend::Keyboard => {
                let event_bus = self.event_bus.ok_or_else(|| {
                    ClickcamError::system("Keyboard button requires an event bus")
                })?;
                let (button, handle) = SimulatedButton::new();
                Ok(ButtonSetup {
                    input: Box::new(button),
                    keyboard: Some(KeyboardButton::new(handle, event_bus)),
                })
            }
            ButtonBackend::Gpio => Ok(ButtonSetup {
                input: Box::new(super::gpio::GpioButton::open(
                    config.gpio_pin,
                    config.active_high,
                )?),
                keyboard: None,
            }),
            ButtonBackend::Evdev => build_evdev(&config),
        }
    }
}

impl Default for ButtonInputBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(feature = "button", target_os = "linux"))]
fn build_evdev(config: &ButtonConfig) -> Result<ButtonSetup> {
    Ok(ButtonSetup {
        input: Box::new(super::evdev::EvdevButton::open(
            &config.device,
            config.key_code,
        )?),
        keyboard: None,
    })
}

#[cfg(not(all(feature = "button", target_os = "linux")))]
fn build_evdev(config: &ButtonConfig) -> Result<ButtonSetup> {
    Err(ButtonError::NotAvailable(format!(
        "evdev button {} requires the 'button' feature on Linux",
        config.device
    ))
    .into())
}
