mod classifier;
#[cfg(all(feature = "button", target_os = "linux"))]
mod evdev;
mod gpio;
mod input;
mod keyboard;
mod simulated;
mod types;
#[cfg(test)]
mod tests;

pub use classifier::GestureClassifier;
#[cfg(all(feature = "button", target_os = "linux"))]
pub use self::evdev::EvdevButton;
pub use gpio::GpioButton;
pub use input::{ButtonInput, ButtonInputBuilder, ButtonSetup};
pub use keyboard::KeyboardButton;
pub use simulated::{SimulatedButton, SimulatedButtonHandle};
pub use types::{ButtonLevel, GestureEvent, GestureState};
