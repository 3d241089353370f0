mod command;
mod core;
mod runner;
mod status;

pub use self::core::CaptureController;
pub use command::ControlCommand;
pub use runner::ControlLoop;
pub use status::ControllerStatus;
