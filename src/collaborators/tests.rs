use super::*;
use crate::config::GlassesConfig;
use crate::error::{CollaboratorError, ConfigError};
use image::{GrayImage, Luma};
use std::path::Path;
use tempfile::TempDir;

fn blank_image() -> GrayImage {
    GrayImage::from_pixel(16, 8, Luma([255]))
}

fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).map(|mut d| d.next().is_none()).unwrap_or(true)
}

#[test]
fn test_identity_labels_lookup() {
    let labels = IdentityLabels::default();
    assert_eq!(labels.len(), 3);
    assert_eq!(labels.name(1), "Person1");
    assert_eq!(labels.name(2), "Person2");
    assert_eq!(labels.name(0), "Unknown");
    assert_eq!(labels.name(7), "Unknown");
    assert_eq!(labels.name(-1), "Unknown");
}

#[test]
fn test_empty_label_table_keeps_unknown() {
    let labels = IdentityLabels::new(Vec::new());
    assert_eq!(labels.len(), 1);
    assert_eq!(labels.unknown(), "Unknown");
    assert_eq!(labels.name(3), "Unknown");
}

#[test]
fn test_label_table_without_unknown_gets_it_inserted() {
    let labels = IdentityLabels::new(vec!["Alice".to_string(), "Bob".to_string()]);
    assert_eq!(labels.len(), 3);
    assert_eq!(labels.unknown(), "Unknown");
    assert_eq!(labels.name(1), "Alice");
    assert_eq!(labels.name(2), "Bob");
    assert_eq!(labels.name(99), "Unknown");
    assert_eq!(labels.name(-1), "Unknown");
}

#[test]
fn test_bounding_box_clamping() {
    let inside = BoundingBox::new(2, 2, 4, 4);
    assert_eq!(inside.clamp_to(16, 8), Some(inside));

    let overhang = BoundingBox::new(12, 6, 10, 10);
    assert_eq!(overhang.clamp_to(16, 8), Some(BoundingBox::new(12, 6, 4, 2)));

    assert_eq!(BoundingBox::new(16, 0, 4, 4).clamp_to(16, 8), None);
    assert_eq!(BoundingBox::new(0, 0, 0, 4).clamp_to(16, 8), None);
}

#[test]
fn test_missing_model_is_reported() {
    let work = TempDir::new().unwrap();
    let mut config = GlassesConfig::default().face;
    config.model_path = work.path().join("trainer.yml").display().to_string();

    match HelperFaceRecognizer::load(&config, work.path()) {
        Err(ConfigError::MissingModel { path }) => assert_eq!(path, config.model_path),
        Ok(_) => panic!("Expected a missing model error"),
    }

    let detector = HelperFaceRecognizer::detector_only(&config, work.path());
    assert!(!detector.has_model());
}

#[test]
fn test_existing_model_enables_identification() {
    let work = TempDir::new().unwrap();
    let model = work.path().join("trainer.yml");
    std::fs::write(&model, "model").unwrap();

    let mut config = GlassesConfig::default().face;
    config.model_path = model.display().to_string();

    let recognizer = HelperFaceRecognizer::load(&config, work.path()).unwrap();
    assert!(recognizer.has_model());
    assert_eq!(recognizer.model_path(), Some(model.as_path()));
}

#[tokio::test]
async fn test_detector_only_refuses_prediction() {
    let work = TempDir::new().unwrap();
    let config = GlassesConfig::default().face;
    let detector = HelperFaceRecognizer::detector_only(&config, work.path());

    let result = detector.predict_identity(&blank_image()).await;
    assert!(matches!(result, Err(CollaboratorError::Unavailable { .. })));
}

#[tokio::test]
async fn test_ocr_passes_image_and_cleans_up() {
    let work = TempDir::new().unwrap();
    let mut config = GlassesConfig::default().ocr;
    config.command = "echo".to_string();

    let ocr = TesseractOcr::new(&config, work.path());
    let text = ocr.recognize_text(&blank_image()).await.unwrap();

    // echo prints "<scratch file> stdout"
    assert!(text.contains(".png stdout"));
    assert!(text.contains(&work.path().display().to_string()));
    assert!(dir_is_empty(work.path()));
}

#[tokio::test]
async fn test_ocr_failure_is_unavailable() {
    let work = TempDir::new().unwrap();
    let mut config = GlassesConfig::default().ocr;
    config.command = "smart-glasses-no-such-ocr".to_string();

    let ocr = TesseractOcr::new(&config, work.path());
    match ocr.recognize_text(&blank_image()).await {
        Err(CollaboratorError::Unavailable { collaborator, .. }) => assert_eq!(collaborator, "ocr"),
        other => panic!("Unexpected result: {:?}", other),
    }
    assert!(dir_is_empty(work.path()));
}

#[tokio::test]
async fn test_speech_commands() {
    let mut config = GlassesConfig::default().speech;
    config.synth_command = "true".to_string();
    config.player_command = "true".to_string();
    assert!(CommandSpeech::new(&config)
        .synthesize_and_play("hello", "en")
        .await
        .is_ok());

    config.player_command = "false".to_string();
    assert!(matches!(
        CommandSpeech::new(&config)
            .synthesize_and_play("hello", "en")
            .await,
        Err(CollaboratorError::Unavailable { .. })
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn test_face_helper_protocol() {
    use std::os::unix::fs::PermissionsExt;

    let work = TempDir::new().unwrap();
    let helper = work.path().join("face-helper");
    std::fs::write(
        &helper,
        "#!/bin/sh\n\
         case \"$1\" in\n\
         detect) echo '[{\"x\":1,\"y\":2,\"width\":3,\"height\":4}]' ;;\n\
         predict) echo '{\"label\":1,\"confidence\":42.5}' ;;\n\
         *) exit 2 ;;\n\
         esac\n",
    )
    .unwrap();
    std::fs::set_permissions(&helper, std::fs::Permissions::from_mode(0o755)).unwrap();

    let model = work.path().join("trainer.yml");
    std::fs::write(&model, "model").unwrap();
    let scratch = work.path().join("scratch");

    let mut config = GlassesConfig::default().face;
    config.helper_command = helper.display().to_string();
    config.model_path = model.display().to_string();

    let recognizer = HelperFaceRecognizer::load(&config, &scratch).unwrap();
    let faces = recognizer.detect_faces(&blank_image()).await.unwrap();
    assert_eq!(faces, vec![BoundingBox::new(1, 2, 3, 4)]);

    let prediction = recognizer.predict_identity(&blank_image()).await.unwrap();
    assert_eq!(
        prediction,
        Prediction {
            label: 1,
            confidence: 42.5
        }
    );
    assert!(dir_is_empty(&scratch));
}

#[tokio::test]
async fn test_mock_collaborators_count_calls() {
    let ocr = MockTextRecognizer::returning("  hello  ");
    assert_eq!(ocr.recognize_text(&blank_image()).await.unwrap(), "  hello  ");
    ocr.set_text("bye");
    assert_eq!(ocr.recognize_text(&blank_image()).await.unwrap(), "bye");
    assert_eq!(ocr.calls(), 2);

    let speech = MockSpeech::new();
    speech.synthesize_and_play("hi", "en").await.unwrap();
    assert_eq!(speech.spoken(), vec!["hi".to_string()]);
    assert_eq!(speech.languages(), vec!["en".to_string()]);

    let face = MockFaceRecognizer::new(vec![BoundingBox::new(0, 0, 2, 2)]).with_predictions(vec![
        Prediction {
            label: 2,
            confidence: 10.0,
        },
    ]);
    assert_eq!(face.detect_faces(&blank_image()).await.unwrap().len(), 1);
    assert_eq!(face.predict_identity(&blank_image()).await.unwrap().label, 2);
    assert_eq!(face.predict_identity(&blank_image()).await.unwrap().label, 0);
    assert_eq!(face.predict_calls(), 2);
}
