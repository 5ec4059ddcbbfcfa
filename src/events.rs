use crate::error::EventBusError;
use crate::gesture::GestureClassification;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Events that can occur in the glasses controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GlassesEvent {
    /// An obstacle is closer than the alert distance
    ProximityAlert {
        distance_cm: f64,
        timestamp: SystemTime,
    },
    /// A tap gesture was classified
    GestureDetected {
        gesture: GestureClassification,
        timestamp: SystemTime,
    },
    /// Captured text was handed to speech synthesis
    TextNarrated { text: String },
    /// A text capture produced nothing readable
    NoTextFound,
    /// A detected face matched a known identity
    FaceRecognized { name: String, confidence: f64 },
    /// A detected face did not match any known identity
    UnknownFace,
    /// A capture action failed and was abandoned
    ActionFailed { action: String, error: String },
    /// A system error occurred in a component
    SystemError { component: String, error: String },
    /// System shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl GlassesEvent {
    pub fn proximity_alert(distance_cm: f64) -> Self {
        GlassesEvent::ProximityAlert {
            distance_cm,
            timestamp: SystemTime::now(),
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            GlassesEvent::ProximityAlert { distance_cm, .. } => {
                format!("Object too close: {:.1} cm", distance_cm)
            }
            GlassesEvent::GestureDetected { gesture, .. } => {
                format!("Gesture detected: {:?}", gesture)
            }
            GlassesEvent::TextNarrated { text } => format!("Speaking: {}", text),
            GlassesEvent::NoTextFound => "No text found".to_string(),
            GlassesEvent::FaceRecognized { name, confidence } => {
                format!("Recognized: {} (Confidence: {:.2})", name, confidence)
            }
            GlassesEvent::UnknownFace => "Face detected: Unknown".to_string(),
            GlassesEvent::ActionFailed { action, error } => {
                format!("{} failed: {}", action, error)
            }
            GlassesEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
            GlassesEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            GlassesEvent::ProximityAlert { .. } => "proximity_alert",
            GlassesEvent::GestureDetected { .. } => "gesture_detected",
            GlassesEvent::TextNarrated { .. } => "text_narrated",
            GlassesEvent::NoTextFound => "no_text_found",
            GlassesEvent::FaceRecognized { .. } => "face_recognized",
            GlassesEvent::UnknownFace => "unknown_face",
            GlassesEvent::ActionFailed { .. } => "action_failed",
            GlassesEvent::SystemError { .. } => "system_error",
            GlassesEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Append-only event channel shared by the ranging task, the dispatcher and
/// the console reporter
pub struct EventBus {
    sender: broadcast::Sender<GlassesEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: true,
        }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<GlassesEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers.
    ///
    /// Never blocks, so the blocking ranging thread can publish directly.
    pub fn publish(&self, event: GlassesEvent) -> Result<usize, EventBusError> {
        if self.debug_logging {
            debug!("Publishing event: {}", event.description());
        }

        match &event {
            GlassesEvent::ProximityAlert { distance_cm, .. } => {
                warn!("Object too close: {:.1} cm", distance_cm);
            }
            GlassesEvent::ActionFailed { action, error } => {
                warn!("Action {} failed: {}", action, error);
            }
            GlassesEvent::SystemError { component, error } => {
                error!("System error in {}: {}", component, error);
            }
            GlassesEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            _ => {
                if self.debug_logging {
                    debug!("Event: {}", event.description());
                }
            }
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            debug_logging: self.debug_logging,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = EventBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        let delivered = bus.publish(GlassesEvent::proximity_alert(12.5)).unwrap();
        assert_eq!(delivered, 2);

        for receiver in [&mut first, &mut second] {
            match receiver.recv().await.unwrap() {
                GlassesEvent::ProximityAlert { distance_cm, .. } => {
                    assert_eq!(distance_cm, 12.5)
                }
                other => panic!("Unexpected event: {:?}", other),
            }
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_an_error() {
        let bus = EventBus::new(8);
        assert!(bus.publish(GlassesEvent::NoTextFound).is_err());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_descriptions() {
        let event = GlassesEvent::FaceRecognized {
            name: "Person1".to_string(),
            confidence: 42.123,
        };
        assert_eq!(event.description(), "Recognized: Person1 (Confidence: 42.12)");
        assert_eq!(event.event_type(), "face_recognized");
        assert_eq!(
            GlassesEvent::UnknownFace.description(),
            "Face detected: Unknown"
        );
    }
}
