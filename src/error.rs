use std::time::Duration;
use thiserror::Error;

/// Which echo transition a ranging cycle was waiting for when it gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoEdge {
    Rising,
    Falling,
}

impl std::fmt::Display for EchoEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EchoEdge::Rising => write!(f, "rising"),
            EchoEdge::Falling => write!(f, "falling"),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum GpioError {
    #[error("Failed to export GPIO {pin}: {details}")]
    Export { pin: u32, details: String },

    #[error("Failed to configure direction of GPIO {pin}: {details}")]
    Direction { pin: u32, details: String },

    #[error("GPIO {pin} I/O error: {details}")]
    Io { pin: u32, details: String },

    #[error("GPIO {pin} has already been released")]
    Released { pin: u32 },
}

#[derive(Error, Debug, Clone)]
pub enum RangeError {
    #[error("Echo {edge} edge not seen within {waited:?}")]
    EchoTimeout { edge: EchoEdge, waited: Duration },

    #[error("Ranging line error: {0}")]
    Line(#[from] GpioError),
}

#[derive(Error, Debug, Clone)]
pub enum CameraError {
    #[error("Camera is busy with another capture")]
    Busy,

    #[error("Camera device failure: {details}")]
    DeviceFailure { details: String },

    #[error("Camera has not been started")]
    NotStarted,
}

#[derive(Error, Debug, Clone)]
pub enum CollaboratorError {
    #[error("{collaborator} unavailable: {details}")]
    Unavailable {
        collaborator: &'static str,
        details: String,
    },

    #[error("{collaborator} did not answer within {after:?}")]
    Timeout {
        collaborator: &'static str,
        after: Duration,
    },
}

impl CollaboratorError {
    pub fn unavailable<S: Into<String>>(collaborator: &'static str, details: S) -> Self {
        Self::Unavailable {
            collaborator,
            details: details.into(),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Face recognition model not found at {path}")]
    MissingModel { path: String },
}

#[derive(Error, Debug, Clone)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },
}

/// Classification helpers for component errors
pub trait GlassesErrorExt {
    fn is_recoverable(&self) -> bool;
    fn user_message(&self) -> String;
}

impl GlassesErrorExt for RangeError {
    fn is_recoverable(&self) -> bool {
        matches!(self, RangeError::EchoTimeout { .. })
    }

    fn user_message(&self) -> String {
        match self {
            RangeError::EchoTimeout { .. } => "Distance sensor did not answer".to_string(),
            RangeError::Line(e) => format!("Distance sensor wiring problem: {}", e),
        }
    }
}

impl GlassesErrorExt for CameraError {
    fn is_recoverable(&self) -> bool {
        !matches!(self, CameraError::NotStarted)
    }

    fn user_message(&self) -> String {
        match self {
            CameraError::Busy => "Camera is busy, try again".to_string(),
            CameraError::DeviceFailure { .. } => "Camera capture failed".to_string(),
            CameraError::NotStarted => "Camera is not available".to_string(),
        }
    }
}

impl GlassesErrorExt for CollaboratorError {
    fn is_recoverable(&self) -> bool {
        true
    }

    fn user_message(&self) -> String {
        match self {
            CollaboratorError::Unavailable { collaborator, .. } => {
                format!("{} is not available", collaborator)
            }
            CollaboratorError::Timeout { collaborator, .. } => {
                format!("{} took too long", collaborator)
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum GlassesError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Model configuration error: {0}")]
    Model(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GPIO error: {0}")]
    Gpio(#[from] GpioError),

    #[error("Ranging error: {0}")]
    Range(#[from] RangeError),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl GlassesError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Errors the main loop can shrug off; anything else aborts startup
    pub fn is_recoverable(&self) -> bool {
        match self {
            GlassesError::Range(_)
            | GlassesError::Collaborator(_)
            | GlassesError::EventBus(_)
            | GlassesError::Model(_) => true,
            GlassesError::Camera(e) => matches!(e, CameraError::Busy),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, GlassesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        let timeout = GlassesError::from(RangeError::EchoTimeout {
            edge: EchoEdge::Rising,
            waited: Duration::from_millis(30),
        });
        assert!(timeout.is_recoverable());

        assert!(GlassesError::from(CameraError::Busy).is_recoverable());
        assert!(!GlassesError::from(CameraError::DeviceFailure {
            details: "gone".to_string()
        })
        .is_recoverable());

        let gpio = GlassesError::from(GpioError::Export {
            pin: 17,
            details: "permission denied".to_string(),
        });
        assert!(!gpio.is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = RangeError::EchoTimeout {
            edge: EchoEdge::Falling,
            waited: Duration::from_millis(30),
        };
        assert_eq!(err.to_string(), "Echo falling edge not seen within 30ms");

        let err = CollaboratorError::unavailable("ocr", "tesseract not installed");
        assert_eq!(err.to_string(), "ocr unavailable: tesseract not installed");
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(CameraError::Busy.user_message(), "Camera is busy, try again");
        assert!(CameraError::Busy.is_recoverable());
        assert!(!CameraError::NotStarted.is_recoverable());

        let err = CollaboratorError::Timeout {
            collaborator: "speech",
            after: Duration::from_secs(30),
        };
        assert_eq!(err.user_message(), "speech took too long");

        let err = RangeError::Line(GpioError::Released { pin: 24 });
        assert!(!err.is_recoverable());
    }
}
