use super::simulated::SimulatedButtonHandle;
use crate::error::Result;
use crate::events::{ClickcamEvent, EventBus};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How long a `c` key press keeps the simulated button down
const CLICK_PRESS: Duration = Duration::from_millis(100);

/// Drives a simulated button from the terminal.
///
/// `c` clicks, `h` toggles a hold, `q`/Esc requests shutdown.
pub struct KeyboardButton {
    handle: SimulatedButtonHandle,
    event_bus: Arc<EventBus>,
    cancellation_token: CancellationToken,
}

impl KeyboardButton {
    pub fn new(handle: SimulatedButtonHandle, event_bus: Arc<EventBus>) -> Self {
        Self {
            handle,
            event_bus,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!("Starting keyboard button - press 'c' to click, 'h' to toggle hold, 'q' to quit");

        let handle = self.handle.clone();
        let event_bus = Arc::clone(&self.event_bus);
        let cancellation_token = self.cancellation_token.clone();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            debug!("Raw mode enabled - keyboard button active");
            let mut click_release_at: Option<Instant> = None;

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Keyboard button stopping");
                    break;
                }

                if let Some(deadline) = click_release_at {
                    if Instant::now() >= deadline {
                        handle.release();
                        click_release_at = None;
                    }
                }

                match event::poll(Duration::from_millis(20)) {
                    Ok(true) => {
                        let Ok(Event::Key(key_event)) = event::read() else {
                            continue;
                        };
                        if key_event.kind != KeyEventKind::Press {
                            continue;
                        }

                        match key_event.code {
                            KeyCode::Char('c') => {
                                info!("Simulated click");
                                handle.press();
                                click_release_at = Some(Instant::now() + CLICK_PRESS);
                            }
                            KeyCode::Char('h') => {
                                click_release_at = None;
                                let level = handle.toggle();
                                info!("Simulated hold toggled, button now {:?}", level);
                            }
                            KeyCode::Char('q') | KeyCode::Esc => {
                                info!("Quit key pressed - requesting shutdown");
                                if let Err(e) = event_bus.publish(ClickcamEvent::ShutdownRequested {
                                    timestamp: SystemTime::now(),
                                    reason: "User requested via keyboard".to_string(),
                                }) {
                                    warn!("Failed to publish shutdown event: {}", e);
                                }
                                break;
                            }
                            other => debug!("Key pressed: {:?}", other),
                        }
                    }
                    Ok(false) => {}
                    Err(e) => warn!("Error polling for keyboard events: {}", e),
                }
            }

            handle.release();

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }
        });

        Ok(())
    }

    /// Stop the keyboard reader and restore the terminal
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard button");
        self.cancellation_token.cancel();

        // Let the reader notice the token and leave raw mode itself
        tokio::time::sleep(Duration::from_millis(100)).await;
        let _ = disable_raw_mode();

        Ok(())
    }

    pub fn is_stopped(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}
