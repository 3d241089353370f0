use super::input::ButtonInput;
use super::types::ButtonLevel;
use crate::error::ButtonError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SYSFS_GPIO: &str = "/sys/class/gpio";

/// Button wired to a GPIO line, read through the sysfs value file
pub struct GpioButton {
    value_path: PathBuf,
    active_high: bool,
    label: String,
}

impl GpioButton {
    /// Export `pin` if needed, configure it as an input and open it
    pub fn open(pin: u32, active_high: bool) -> Result<Self, ButtonError> {
        let line_dir = Path::new(SYSFS_GPIO).join(format!("gpio{}", pin));

        if !line_dir.exists() {
            debug!("Exporting GPIO {}", pin);
            fs::write(Path::new(SYSFS_GPIO).join("export"), pin.to_string()).map_err(|e| {
                ButtonError::DeviceOpen {
                    device: format!("gpio{}", pin),
                    details: format!("export failed: {}", e),
                }
            })?;
        }

        fs::write(line_dir.join("direction"), "in").map_err(|e| ButtonError::DeviceOpen {
            device: format!("gpio{}", pin),
            details: format!("setting direction failed: {}", e),
        })?;

        info!(
            "GPIO {} configured as button input (active {})",
            pin,
            if active_high { "high" } else { "low" }
        );

        Self::with_value_path(line_dir.join("value"), active_high)
    }

    /// Read levels from an arbitrary value file
    pub fn with_value_path<P: Into<PathBuf>>(
        value_path: P,
        active_high: bool,
    ) -> Result<Self, ButtonError> {
        let value_path = value_path.into();
        let label = value_path.display().to_string();

        if !value_path.exists() {
            return Err(ButtonError::DeviceOpen {
                device: label,
                details: "value file does not exist".to_string(),
            });
        }

        Ok(Self {
            value_path,
            active_high,
            label,
        })
    }
}

impl ButtonInput for GpioButton {
    fn read_level(&mut self) -> Result<ButtonLevel, ButtonError> {
        let raw = fs::read_to_string(&self.value_path).map_err(|e| ButtonError::Read {
            device: self.label.clone(),
            details: e.to_string(),
        })?;

        let electrical_high = match raw.trim() {
            "1" => true,
            "0" => false,
            other => {
                return Err(ButtonError::Read {
                    device: self.label.clone(),
                    details: format!("unexpected value '{}'", other),
                })
            }
        };

        Ok(ButtonLevel::from_pressed(electrical_high == self.active_high))
    }

    fn name(&self) -> &str {
        &self.label
    }
}
