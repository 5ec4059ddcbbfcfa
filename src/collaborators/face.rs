use super::support::{run_checked, ScratchImage};
use super::types::{BoundingBox, FaceRecognizer, Prediction};
use crate::config::FaceConfig;
use crate::error::{CollaboratorError, ConfigError};
use async_trait::async_trait;
use image::GrayImage;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const COLLABORATOR: &str = "face recognizer";

/// Face detection and identification through an external helper program.
///
/// The helper speaks two subcommands:
///
/// ```text
/// <helper> detect --cascade <file> --scale-factor <f> --min-neighbors <n> <image>
///     -> [{"x":..,"y":..,"width":..,"height":..}, ...]
/// <helper> predict --model <file> <image>
///     -> {"label":..,"confidence":..}
/// ```
pub struct HelperFaceRecognizer {
    helper_command: String,
    cascade_path: PathBuf,
    model_path: Option<PathBuf>,
    scale_factor: f64,
    min_neighbors: u32,
    work_dir: PathBuf,
}

impl HelperFaceRecognizer {
    /// Build a recognizer with identification enabled.
    ///
    /// Fails with [`ConfigError::MissingModel`] if the trained model file
    /// does not exist.
    pub fn load(config: &FaceConfig, work_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let model_path = PathBuf::from(&config.model_path);
        if !model_path.is_file() {
            return Err(ConfigError::MissingModel {
                path: config.model_path.clone(),
            });
        }

        info!("Face model loaded from {}", model_path.display());
        let mut recognizer = Self::detector_only(config, work_dir);
        recognizer.model_path = Some(model_path);
        Ok(recognizer)
    }

    /// Build a recognizer that detects faces but cannot identify them
    pub fn detector_only(config: &FaceConfig, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            helper_command: config.helper_command.clone(),
            cascade_path: PathBuf::from(&config.cascade_path),
            model_path: None,
            scale_factor: config.scale_factor,
            min_neighbors: config.min_neighbors,
            work_dir: work_dir.into(),
        }
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }
}

#[async_trait]
impl FaceRecognizer for HelperFaceRecognizer {
    fn has_model(&self) -> bool {
        self.model_path.is_some()
    }

    async fn detect_faces(&self, image: &GrayImage) -> Result<Vec<BoundingBox>, CollaboratorError> {
        let scratch = ScratchImage::write(&self.work_dir, "face", image).await?;

        let scale_factor = self.scale_factor.to_string();
        let min_neighbors = self.min_neighbors.to_string();
        let output = run_checked(
            COLLABORATOR,
            &self.helper_command,
            [
                OsStr::new("detect"),
                OsStr::new("--cascade"),
                self.cascade_path.as_os_str(),
                OsStr::new("--scale-factor"),
                OsStr::new(&scale_factor),
                OsStr::new("--min-neighbors"),
                OsStr::new(&min_neighbors),
                scratch.path().as_os_str(),
            ],
        )
        .await?;

        let faces: Vec<BoundingBox> = serde_json::from_slice(&output.stdout).map_err(|e| {
            CollaboratorError::unavailable(COLLABORATOR, format!("bad detect output: {}", e))
        })?;
        debug!("Detected {} face region(s)", faces.len());
        Ok(faces)
    }

    async fn predict_identity(&self, region: &GrayImage) -> Result<Prediction, CollaboratorError> {
        let model_path = self
            .model_path
            .as_ref()
            .ok_or_else(|| CollaboratorError::unavailable(COLLABORATOR, "no trained model loaded"))?;

        let scratch = ScratchImage::write(&self.work_dir, "face", region).await?;
        let output = run_checked(
            COLLABORATOR,
            &self.helper_command,
            [
                OsStr::new("predict"),
                OsStr::new("--model"),
                model_path.as_os_str(),
                scratch.path().as_os_str(),
            ],
        )
        .await?;

        serde_json::from_slice(&output.stdout).map_err(|e| {
            CollaboratorError::unavailable(COLLABORATOR, format!("bad predict output: {}", e))
        })
    }
}
