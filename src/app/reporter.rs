use crate::events::{EventBus, GlassesEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// User-facing console line for an event, if it has one
pub fn console_line(event: &GlassesEvent) -> Option<String> {
    match event {
        GlassesEvent::ProximityAlert { .. } => Some("[ALERT] Object too close!".to_string()),
        GlassesEvent::FaceRecognized { name, confidence } => {
            Some(format!("Recognized: {} (Confidence: {:.2})", name, confidence))
        }
        GlassesEvent::UnknownFace => Some("Face detected: Unknown".to_string()),
        GlassesEvent::NoTextFound => Some("No text found.".to_string()),
        GlassesEvent::TextNarrated { text } => Some(format!("Speaking: {}", text)),
        GlassesEvent::ActionFailed { action, error } => {
            Some(format!("{} failed: {}", action, error))
        }
        _ => None,
    }
}

/// Prints user-facing events to stdout
pub struct ConsoleReporter {
    event_bus: EventBus,
    raw_terminal: bool,
}

impl ConsoleReporter {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            event_bus,
            raw_terminal: false,
        }
    }

    /// Emit `\r\n` line endings, for when the keyboard simulator has put the
    /// terminal in raw mode
    pub fn with_raw_terminal(mut self, raw_terminal: bool) -> Self {
        self.raw_terminal = raw_terminal;
        self
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        let mut receiver = self.event_bus.subscribe();
        let ending = if self.raw_terminal { "\r\n" } else { "\n" };

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = receiver.recv() => match received {
                        Ok(event) => {
                            if let Some(line) = console_line(&event) {
                                print!("{}{}", line, ending);
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Console reporter skipped {} events", skipped);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
            debug!("Console reporter stopped");
        })
    }
}
