use super::types::{ActionError, ActionKind, ActionOutcome, DispatchSettings, FaceReport};
use crate::camera::CameraResource;
use crate::collaborators::{
    BoundingBox, FaceRecognizer, IdentityLabels, SpeechSynthesizer, TextRecognizer,
};
use crate::error::{CameraError, CollaboratorError, GlassesErrorExt};
use crate::events::{EventBus, GlassesEvent};
use crate::gesture::GestureClassification;
use image::{imageops, GrayImage};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

/// The external services an action may call, shared read-only
#[derive(Clone)]
pub struct Collaborators {
    pub ocr: Arc<dyn TextRecognizer>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub faces: Arc<dyn FaceRecognizer>,
    pub labels: IdentityLabels,
}

/// Turns classified gestures into camera actions.
///
/// Double tap reads text aloud, single tap identifies faces. Every failure is
/// caught here and reported as [`ActionOutcome::Failed`], so the caller's
/// loop always survives to take the next gesture.
pub struct ActionDispatcher {
    camera: CameraResource,
    collaborators: Collaborators,
    settings: DispatchSettings,
    event_bus: EventBus,
}

impl ActionDispatcher {
    pub fn new(
        camera: CameraResource,
        collaborators: Collaborators,
        settings: DispatchSettings,
        event_bus: EventBus,
    ) -> Self {
        Self {
            camera,
            collaborators,
            settings,
            event_bus,
        }
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    pub async fn dispatch(&self, gesture: GestureClassification) -> ActionOutcome {
        let action = match gesture {
            GestureClassification::None => return ActionOutcome::NoOp,
            GestureClassification::DoubleTap => ActionKind::ReadText,
            GestureClassification::SingleTap => ActionKind::IdentifyFaces,
        };

        info!("{:?} detected, starting {}", gesture, action);
        self.publish(GlassesEvent::GestureDetected {
            gesture,
            timestamp: SystemTime::now(),
        });

        let result = match action {
            ActionKind::ReadText => self.read_text().await,
            ActionKind::IdentifyFaces => self.identify_faces().await,
        };

        match result {
            Ok(outcome) => outcome,
            Err(error) => self.handle_failure(action, error).await,
        }
    }

    async fn read_text(&self) -> Result<ActionOutcome, ActionError> {
        let threshold = self.settings.binarize_threshold;
        let ocr = &self.collaborators.ocr;

        let text = self
            .camera
            .with_capture(|frame| async move {
                let image = frame.binarize(threshold);
                bounded("ocr", self.settings.ocr_timeout, ocr.recognize_text(&image)).await
            })
            .await??;

        let text = text.trim();
        if text.is_empty() {
            info!("No text found");
            self.publish(GlassesEvent::NoTextFound);
            return Ok(ActionOutcome::NoTextFound);
        }

        let text = text.to_string();
        info!("Speaking: {}", text);
        self.publish(GlassesEvent::TextNarrated { text: text.clone() });

        let spoken = match self.speak(&text).await {
            Ok(()) => true,
            Err(e) => {
                error!("Narration failed: {}", e);
                self.publish(GlassesEvent::ActionFailed {
                    action: "narration".to_string(),
                    error: e.to_string(),
                });
                false
            }
        };

        Ok(ActionOutcome::TextNarrated { text, spoken })
    }

    async fn identify_faces(&self) -> Result<ActionOutcome, ActionError> {
        let faces = &self.collaborators.faces;

        let reports = self
            .camera
            .with_capture(|frame| async move {
                let gray = frame.to_grayscale();
                let regions =
                    bounded("face recognizer", self.settings.face_timeout, faces.detect_faces(&gray))
                        .await?;

                let mut reports = Vec::with_capacity(regions.len());
                for region in regions {
                    let Some(region) = region.clamp_to(gray.width(), gray.height()) else {
                        debug!("Ignoring face region {:?} outside the frame", region);
                        continue;
                    };
                    reports.push(self.identify_region(&gray, region).await);
                }
                Ok::<_, CollaboratorError>(reports)
            })
            .await??;

        if reports.is_empty() {
            debug!("No faces detected");
        }

        for report in &reports {
            match report {
                FaceReport::Recognized { name, confidence } => {
                    info!("Recognized: {} (Confidence: {:.2})", name, confidence);
                    self.publish(GlassesEvent::FaceRecognized {
                        name: name.clone(),
                        confidence: *confidence,
                    });
                }
                FaceReport::Unknown => {
                    info!("Face detected: Unknown");
                    self.publish(GlassesEvent::UnknownFace);
                }
            }
        }

        Ok(ActionOutcome::Faces(reports))
    }

    async fn identify_region(&self, gray: &GrayImage, region: BoundingBox) -> FaceReport {
        let faces = &self.collaborators.faces;
        if !faces.has_model() {
            return FaceReport::Unknown;
        }

        let crop =
            imageops::crop_imm(gray, region.x, region.y, region.width, region.height).to_image();

        match bounded(
            "face recognizer",
            self.settings.face_timeout,
            faces.predict_identity(&crop),
        )
        .await
        {
            Ok(prediction) => FaceReport::classify(
                prediction,
                self.settings.confidence_threshold,
                &self.collaborators.labels,
            ),
            Err(e) => {
                warn!("Identity prediction failed, reporting unknown: {}", e);
                FaceReport::Unknown
            }
        }
    }

    async fn speak(&self, text: &str) -> Result<(), CollaboratorError> {
        bounded(
            "speech",
            self.settings.speech_timeout,
            self.collaborators
                .speech
                .synthesize_and_play(text, &self.settings.language),
        )
        .await
    }

    async fn handle_failure(&self, action: ActionKind, error: ActionError) -> ActionOutcome {
        match &error {
            ActionError::Camera(CameraError::Busy) => warn!("{} skipped: {}", action, error),
            _ => error!("{} failed: {}", action, error),
        }

        self.publish(GlassesEvent::ActionFailed {
            action: action.to_string(),
            error: error.to_string(),
        });

        if self.settings.announce_failures {
            if let Err(e) = self.speak(&error.user_message()).await {
                debug!("Could not announce failure: {}", e);
            }
        }

        ActionOutcome::Failed { action, error }
    }

    fn publish(&self, event: GlassesEvent) {
        if let Err(e) = self.event_bus.publish(event) {
            debug!("Event not delivered: {}", e);
        }
    }
}

/// Bound a collaborator call so a hung program cannot stall the dispatch loop
async fn bounded<T, F>(
    collaborator: &'static str,
    limit: Duration,
    call: F,
) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!("{} did not answer within {:?}", collaborator, limit);
            Err(CollaboratorError::Timeout {
                collaborator,
                after: limit,
            })
        }
    }
}
