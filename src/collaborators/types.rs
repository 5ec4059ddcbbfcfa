use crate::error::CollaboratorError;
use crate::frame::BinarizedImage;
use async_trait::async_trait;
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Face region reported by a detector, in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersect with an image of the given size. `None` if nothing remains.
    pub fn clamp_to(&self, image_width: u32, image_height: u32) -> Option<BoundingBox> {
        if self.x >= image_width || self.y >= image_height {
            return None;
        }
        let width = self.width.min(image_width - self.x);
        let height = self.height.min(image_height - self.y);
        if width == 0 || height == 0 {
            return None;
        }
        Some(BoundingBox::new(self.x, self.y, width, height))
    }
}

/// Identity prediction for one face region.
///
/// `confidence` is distance-like: lower means a better match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: i32,
    pub confidence: f64,
}

#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize_text(&self, image: &BinarizedImage) -> Result<String, CollaboratorError>;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Render `text` to audio and play it to the wearer
    async fn synthesize_and_play(&self, text: &str, language: &str)
        -> Result<(), CollaboratorError>;
}

#[async_trait]
pub trait FaceRecognizer: Send + Sync {
    /// Whether a trained identity model is loaded
    fn has_model(&self) -> bool;

    async fn detect_faces(&self, image: &GrayImage) -> Result<Vec<BoundingBox>, CollaboratorError>;

    async fn predict_identity(&self, region: &GrayImage) -> Result<Prediction, CollaboratorError>;
}
