use crate::collaborators::{IdentityLabels, Prediction};
use crate::config::GlassesConfig;
use crate::error::{CameraError, CollaboratorError, GlassesErrorExt};
use std::time::Duration;
use thiserror::Error;

/// The two camera actions a gesture can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Double tap: read text aloud
    ReadText,
    /// Single tap: identify faces
    IdentifyFaces,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::ReadText => write!(f, "text capture"),
            ActionKind::IdentifyFaces => write!(f, "face identification"),
        }
    }
}

/// Why an action was abandoned
#[derive(Error, Debug, Clone)]
pub enum ActionError {
    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

impl GlassesErrorExt for ActionError {
    fn is_recoverable(&self) -> bool {
        match self {
            ActionError::Camera(e) => e.is_recoverable(),
            ActionError::Collaborator(e) => e.is_recoverable(),
        }
    }

    fn user_message(&self) -> String {
        match self {
            ActionError::Camera(e) => e.user_message(),
            ActionError::Collaborator(e) => e.user_message(),
        }
    }
}

/// Result of one face region
#[derive(Debug, Clone, PartialEq)]
pub enum FaceReport {
    Recognized { name: String, confidence: f64 },
    Unknown,
}

impl FaceReport {
    /// A prediction counts as a match only when its confidence is strictly
    /// below `threshold` (lower confidence means a closer match)
    pub fn classify(prediction: Prediction, threshold: f64, labels: &IdentityLabels) -> Self {
        if prediction.confidence < threshold {
            FaceReport::Recognized {
                name: labels.name(prediction.label).to_string(),
                confidence: prediction.confidence,
            }
        } else {
            FaceReport::Unknown
        }
    }
}

/// What a dispatched gesture ended up doing
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    /// Nothing to do for this gesture
    NoOp,
    /// Text was recognized and handed to speech; `spoken` is false when
    /// playback failed
    TextNarrated { text: String, spoken: bool },
    NoTextFound,
    /// One report per detected face, possibly none
    Faces(Vec<FaceReport>),
    Failed {
        action: ActionKind,
        error: ActionError,
    },
}

impl ActionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ActionOutcome::Failed { .. })
    }
}

/// Tunables the dispatcher reads on every action
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub binarize_threshold: u8,
    pub language: String,
    pub confidence_threshold: f64,
    pub ocr_timeout: Duration,
    pub speech_timeout: Duration,
    pub face_timeout: Duration,
    pub announce_failures: bool,
}

impl DispatchSettings {
    pub fn from_config(config: &GlassesConfig) -> Self {
        Self {
            binarize_threshold: config.ocr.binarize_threshold,
            language: config.speech.language.clone(),
            confidence_threshold: config.face.confidence_threshold,
            ocr_timeout: config.ocr.timeout(),
            speech_timeout: config.speech.timeout(),
            face_timeout: config.face.timeout(),
            announce_failures: config.speech.announce_failures,
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from_config(&GlassesConfig::default())
    }
}
