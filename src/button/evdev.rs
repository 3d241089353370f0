use super::input::ButtonInput;
use super::types::ButtonLevel;
use crate::error::ButtonError;
use evdev::{Device, EventType, Key};
use tracing::info;

/// Button read from the key state of a Linux input device
pub struct EvdevButton {
    device: Device,
    path: String,
    key: Key,
}

impl EvdevButton {
    pub fn open(path: &str, key_code: u16) -> Result<Self, ButtonError> {
        let device = Device::open(path).map_err(|e| ButtonError::DeviceOpen {
            device: path.to_string(),
            details: e.to_string(),
        })?;

        if !device.supported_events().contains(EventType::KEY) {
            return Err(ButtonError::NotAvailable(format!(
                "{} does not report key events",
                path
            )));
        }

        let key = Key::new(key_code);
        let has_key = device
            .supported_keys()
            .map(|keys| keys.contains(key))
            .unwrap_or(false);
        if !has_key {
            return Err(ButtonError::NotAvailable(format!(
                "{} has no key {:?}",
                path, key
            )));
        }

        info!(
            "Button device opened: {} ({}), key {:?}",
            path,
            device.name().unwrap_or("Unknown"),
            key
        );

        Ok(Self {
            device,
            path: path.to_string(),
            key,
        })
    }
}

impl ButtonInput for EvdevButton {
    fn read_level(&mut self) -> Result<ButtonLevel, ButtonError> {
        let keys = self.device.get_key_state().map_err(|e| ButtonError::Read {
            device: self.path.clone(),
            details: e.to_string(),
        })?;

        Ok(ButtonLevel::from_pressed(keys.contains(self.key)))
    }

    fn name(&self) -> &str {
        &self.path
    }
}
