use super::*;
use crate::camera::{CameraResource, SyntheticCamera, SyntheticPattern};
use crate::collaborators::{
    BoundingBox, IdentityLabels, MockFaceRecognizer, MockSpeech, MockTextRecognizer, Prediction,
};
use crate::error::{CameraError, CollaboratorError};
use crate::events::{EventBus, GlassesEvent};
use crate::gesture::GestureClassification;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

struct Harness {
    dispatcher: ActionDispatcher,
    camera: CameraResource,
    ocr: MockTextRecognizer,
    speech: MockSpeech,
    faces: MockFaceRecognizer,
    events: broadcast::Receiver<GlassesEvent>,
}

fn quiet_settings() -> DispatchSettings {
    DispatchSettings {
        announce_failures: false,
        ..DispatchSettings::default()
    }
}

async fn harness(
    ocr: MockTextRecognizer,
    speech: MockSpeech,
    faces: MockFaceRecognizer,
    settings: DispatchSettings,
) -> Harness {
    let camera = CameraResource::new(Box::new(SyntheticCamera::new(
        32,
        16,
        SyntheticPattern::Gradient,
    )));
    camera.start(Duration::ZERO).await.unwrap();

    let bus = EventBus::new(64);
    let events = bus.subscribe();

    let collaborators = Collaborators {
        ocr: Arc::new(ocr.clone()),
        speech: Arc::new(speech.clone()),
        faces: Arc::new(faces.clone()),
        labels: IdentityLabels::default(),
    };

    Harness {
        dispatcher: ActionDispatcher::new(camera.clone(), collaborators, settings, bus),
        camera,
        ocr,
        speech,
        faces,
        events,
    }
}

async fn text_harness(text: &str) -> Harness {
    harness(
        MockTextRecognizer::returning(text),
        MockSpeech::new(),
        MockFaceRecognizer::new(Vec::new()),
        quiet_settings(),
    )
    .await
}

fn drain(events: &mut broadcast::Receiver<GlassesEvent>) -> Vec<&'static str> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event.event_type());
    }
    seen
}

fn prediction(label: i32, confidence: f64) -> Prediction {
    Prediction { label, confidence }
}

#[tokio::test]
async fn test_none_gesture_is_noop() {
    let mut h = text_harness("text").await;
    let outcome = h.dispatcher.dispatch(GestureClassification::None).await;

    assert!(matches!(outcome, ActionOutcome::NoOp));
    assert_eq!(h.ocr.calls(), 0);
    assert_eq!(h.faces.detect_calls(), 0);
    assert!(drain(&mut h.events).is_empty());
}

#[tokio::test]
async fn test_whitespace_text_is_not_spoken() {
    let mut h = text_harness("  \n\t  ").await;
    let outcome = h.dispatcher.dispatch(GestureClassification::DoubleTap).await;

    assert!(matches!(outcome, ActionOutcome::NoTextFound));
    assert_eq!(h.ocr.calls(), 1);
    assert_eq!(h.speech.calls(), 0);
    assert_eq!(
        drain(&mut h.events),
        vec!["gesture_detected", "no_text_found"]
    );
}

#[tokio::test]
async fn test_text_is_trimmed_and_spoken_once() {
    let mut h = text_harness("\n  Exit on the left \n").await;
    let outcome = h.dispatcher.dispatch(GestureClassification::DoubleTap).await;

    match outcome {
        ActionOutcome::TextNarrated { text, spoken } => {
            assert_eq!(text, "Exit on the left");
            assert!(spoken);
        }
        other => panic!("Unexpected outcome: {:?}", other),
    }
    assert_eq!(h.speech.spoken(), vec!["Exit on the left".to_string()]);
    assert_eq!(h.speech.languages(), vec!["en".to_string()]);
    assert_eq!(
        drain(&mut h.events),
        vec!["gesture_detected", "text_narrated"]
    );
    assert!(!h.camera.is_busy());
}

#[tokio::test]
async fn test_speech_failure_does_not_fail_action() {
    let h = harness(
        MockTextRecognizer::returning("Platform 4"),
        MockSpeech::failing("no audio device"),
        MockFaceRecognizer::new(Vec::new()),
        quiet_settings(),
    )
    .await;

    match h.dispatcher.dispatch(GestureClassification::DoubleTap).await {
        ActionOutcome::TextNarrated { text, spoken } => {
            assert_eq!(text, "Platform 4");
            assert!(!spoken);
        }
        other => panic!("Unexpected outcome: {:?}", other),
    }
    assert_eq!(h.speech.calls(), 1);
}

#[test]
fn test_confidence_boundary() {
    let labels = IdentityLabels::default();

    assert_eq!(
        FaceReport::classify(prediction(1, 79.9), 80.0, &labels),
        FaceReport::Recognized {
            name: "Person1".to_string(),
            confidence: 79.9
        }
    );
    assert_eq!(
        FaceReport::classify(prediction(1, 80.0), 80.0, &labels),
        FaceReport::Unknown
    );
    assert_eq!(
        FaceReport::classify(prediction(1, 80.1), 80.0, &labels),
        FaceReport::Unknown
    );
}

#[tokio::test]
async fn test_faces_reported_per_region() {
    let faces = MockFaceRecognizer::new(vec![
        BoundingBox::new(0, 0, 8, 8),
        BoundingBox::new(8, 0, 8, 8),
        BoundingBox::new(16, 0, 8, 8),
    ])
    .with_predictions(vec![
        prediction(1, 79.9),
        prediction(1, 80.0),
        prediction(2, 80.1),
    ]);
    let mut h = harness(
        MockTextRecognizer::returning(""),
        MockSpeech::new(),
        faces,
        quiet_settings(),
    )
    .await;

    match h.dispatcher.dispatch(GestureClassification::SingleTap).await {
        ActionOutcome::Faces(reports) => assert_eq!(
            reports,
            vec![
                FaceReport::Recognized {
                    name: "Person1".to_string(),
                    confidence: 79.9
                },
                FaceReport::Unknown,
                FaceReport::Unknown,
            ]
        ),
        other => panic!("Unexpected outcome: {:?}", other),
    }
    assert_eq!(h.faces.predict_calls(), 3);
    assert_eq!(
        drain(&mut h.events),
        vec![
            "gesture_detected",
            "face_recognized",
            "unknown_face",
            "unknown_face"
        ]
    );
}

#[tokio::test]
async fn test_missing_model_reports_unknown() {
    let faces = MockFaceRecognizer::new(vec![BoundingBox::new(0, 0, 8, 8)])
        .with_predictions(vec![prediction(1, 10.0)])
        .without_model();
    let h = harness(
        MockTextRecognizer::returning(""),
        MockSpeech::new(),
        faces,
        quiet_settings(),
    )
    .await;

    match h.dispatcher.dispatch(GestureClassification::SingleTap).await {
        ActionOutcome::Faces(reports) => assert_eq!(reports, vec![FaceReport::Unknown]),
        other => panic!("Unexpected outcome: {:?}", other),
    }
    assert_eq!(h.faces.detect_calls(), 1);
    assert_eq!(h.faces.predict_calls(), 0);
}

#[tokio::test]
async fn test_no_faces_produces_no_output() {
    let mut h = text_harness("").await;

    match h.dispatcher.dispatch(GestureClassification::SingleTap).await {
        ActionOutcome::Faces(reports) => assert!(reports.is_empty()),
        other => panic!("Unexpected outcome: {:?}", other),
    }
    assert_eq!(drain(&mut h.events), vec!["gesture_detected"]);
}

#[tokio::test]
async fn test_regions_outside_frame_are_skipped() {
    let faces = MockFaceRecognizer::new(vec![
        BoundingBox::new(100, 100, 8, 8),
        BoundingBox::new(28, 12, 8, 8),
    ])
    .with_predictions(vec![prediction(2, 30.0)]);
    let h = harness(
        MockTextRecognizer::returning(""),
        MockSpeech::new(),
        faces,
        quiet_settings(),
    )
    .await;

    match h.dispatcher.dispatch(GestureClassification::SingleTap).await {
        ActionOutcome::Faces(reports) => assert_eq!(
            reports,
            vec![FaceReport::Recognized {
                name: "Person2".to_string(),
                confidence: 30.0
            }]
        ),
        other => panic!("Unexpected outcome: {:?}", other),
    }
    assert_eq!(h.faces.predict_calls(), 1);
}

#[tokio::test]
async fn test_busy_camera_fails_action_and_announces() {
    let mut h = harness(
        MockTextRecognizer::returning("text"),
        MockSpeech::new(),
        MockFaceRecognizer::new(Vec::new()),
        DispatchSettings::default(),
    )
    .await;

    let lease = h.camera.try_lease().unwrap();
    let outcome = h.dispatcher.dispatch(GestureClassification::DoubleTap).await;
    match outcome {
        ActionOutcome::Failed { action, error } => {
            assert_eq!(action, ActionKind::ReadText);
            assert!(matches!(error, ActionError::Camera(CameraError::Busy)));
        }
        other => panic!("Unexpected outcome: {:?}", other),
    }
    assert_eq!(h.ocr.calls(), 0);
    assert_eq!(h.speech.spoken(), vec!["Camera is busy, try again".to_string()]);
    assert_eq!(
        drain(&mut h.events),
        vec!["gesture_detected", "action_failed"]
    );

    drop(lease);
    let outcome = h.dispatcher.dispatch(GestureClassification::DoubleTap).await;
    assert!(matches!(outcome, ActionOutcome::TextNarrated { .. }));
}

#[tokio::test]
async fn test_hung_ocr_times_out_and_releases_camera() {
    let settings = DispatchSettings {
        ocr_timeout: Duration::from_millis(50),
        ..quiet_settings()
    };
    let h = harness(
        MockTextRecognizer::returning("late").with_latency(Duration::from_secs(5)),
        MockSpeech::new(),
        MockFaceRecognizer::new(Vec::new()),
        settings,
    )
    .await;

    let outcome = h.dispatcher.dispatch(GestureClassification::DoubleTap).await;
    match outcome {
        ActionOutcome::Failed { error, .. } => assert!(matches!(
            error,
            ActionError::Collaborator(CollaboratorError::Timeout {
                collaborator: "ocr",
                ..
            })
        )),
        other => panic!("Unexpected outcome: {:?}", other),
    }
    assert!(!h.camera.is_busy());
    assert_eq!(h.speech.calls(), 0);
}

#[tokio::test]
async fn test_detection_failure_then_next_gesture_still_works() {
    let h = harness(
        MockTextRecognizer::returning("Gate B"),
        MockSpeech::new(),
        MockFaceRecognizer::new(Vec::new()).failing_detection("cascade missing"),
        quiet_settings(),
    )
    .await;

    let outcome = h.dispatcher.dispatch(GestureClassification::SingleTap).await;
    assert!(outcome.is_failure());

    let outcome = h.dispatcher.dispatch(GestureClassification::DoubleTap).await;
    assert!(matches!(outcome, ActionOutcome::TextNarrated { .. }));
    assert_eq!(h.speech.spoken(), vec!["Gate B".to_string()]);
}
