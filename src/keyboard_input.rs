use crate::config::GestureConfig;
use crate::error::Result;
use crate::events::{EventBus, GlassesEvent};
use crate::gpio::{Level, MockLevel};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::{Duration, SystemTime};
use tokio::runtime::Handle;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const PRESS_DURATION: Duration = Duration::from_millis(80);

/// What a simulator key does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Tap,
    DoubleTap,
    Quit,
}

impl KeyAction {
    pub fn from_key(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Char(' ') => Some(KeyAction::Tap),
            KeyCode::Char('d') => Some(KeyAction::DoubleTap),
            KeyCode::Char('q') | KeyCode::Esc => Some(KeyAction::Quit),
            _ => None,
        }
    }
}

/// Drives the simulated tap line from the keyboard.
///
/// SPACE presses the button once, `d` performs a double tap, `q` or Esc
/// requests shutdown.
#[derive(Clone)]
pub struct KeyboardTapSimulator {
    event_bus: EventBus,
    tap: MockLevel,
    double_tap_gap: Duration,
    cancellation_token: CancellationToken,
}

impl KeyboardTapSimulator {
    pub fn new(event_bus: EventBus, tap: MockLevel, gesture: &GestureConfig) -> Self {
        // Second press lands after the debounce but inside the window
        let double_tap_gap = (gesture.debounce() + gesture.double_tap_window()) / 2;
        Self {
            event_bus,
            tap,
            double_tap_gap,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!("Starting keyboard tap simulator - SPACE = tap, d = double tap, q = quit");

        let simulator = self.clone();
        let runtime_handle = Handle::current();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            while !simulator.cancellation_token.is_cancelled() {
                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let Ok(Event::Key(key_event)) = event::read() else {
                            continue;
                        };
                        if key_event.kind != KeyEventKind::Press {
                            continue;
                        }

                        match KeyAction::from_key(key_event.code) {
                            Some(action) => {
                                let simulator = simulator.clone();
                                runtime_handle.spawn(async move { simulator.perform(action).await });
                                if action == KeyAction::Quit {
                                    break;
                                }
                            }
                            None => debug!("Key pressed: {:?}", key_event.code),
                        }
                    }
                    Ok(false) => {}
                    Err(e) => warn!("Error polling for keyboard events: {}", e),
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            }
            debug!("Keyboard tap simulator exited");
        });

        Ok(())
    }

    pub async fn perform(&self, action: KeyAction) {
        match action {
            KeyAction::Tap => {
                info!("Simulated tap");
                self.press().await;
            }
            KeyAction::DoubleTap => {
                info!("Simulated double tap");
                self.press().await;
                tokio::time::sleep(self.double_tap_gap.saturating_sub(PRESS_DURATION)).await;
                self.press().await;
            }
            KeyAction::Quit => {
                info!("Quit key pressed - requesting shutdown");
                let event = GlassesEvent::ShutdownRequested {
                    timestamp: SystemTime::now(),
                    reason: "User requested via keyboard".to_string(),
                };
                if let Err(e) = self.event_bus.publish(event) {
                    warn!("Failed to publish shutdown request: {}", e);
                }
            }
        }
    }

    async fn press(&self) {
        self.tap.set(Level::High);
        tokio::time::sleep(PRESS_DURATION).await;
        self.tap.set(Level::Low);
    }

    /// Stop the simulator and restore the terminal
    pub async fn stop(&self) {
        info!("Stopping keyboard tap simulator");
        self.cancellation_token.cancel();

        // Let the input thread notice and leave raw mode itself
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = disable_raw_mode();
    }
}
