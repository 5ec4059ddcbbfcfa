use super::types::{BoundingBox, FaceRecognizer, Prediction, SpeechSynthesizer, TextRecognizer};
use crate::error::CollaboratorError;
use crate::frame::BinarizedImage;
use async_trait::async_trait;
use image::GrayImage;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Text recognizer returning canned text
#[derive(Clone)]
pub struct MockTextRecognizer {
    text: Arc<Mutex<String>>,
    failure: Option<String>,
    latency: Duration,
    calls: Arc<AtomicUsize>,
}

impl MockTextRecognizer {
    pub fn returning(text: impl Into<String>) -> Self {
        Self {
            text: Arc::new(Mutex::new(text.into())),
            failure: None,
            latency: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(details: impl Into<String>) -> Self {
        let mut mock = Self::returning("");
        mock.failure = Some(details.into());
        mock
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn set_text(&self, text: impl Into<String>) {
        *self.text.lock() = text.into();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextRecognizer for MockTextRecognizer {
    async fn recognize_text(&self, image: &BinarizedImage) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        debug!("Mock OCR on {}x{} image", image.width(), image.height());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(details) = &self.failure {
            return Err(CollaboratorError::unavailable("ocr", details.clone()));
        }
        Ok(self.text.lock().clone())
    }
}

/// Speech synthesizer that records what it was asked to say
#[derive(Clone, Default)]
pub struct MockSpeech {
    spoken: Arc<Mutex<Vec<(String, String)>>>,
    failure: Option<String>,
    latency: Duration,
}

impl MockSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(details: impl Into<String>) -> Self {
        Self {
            failure: Some(details.into()),
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.spoken.lock().len()
    }

    /// Texts passed to synthesis, in call order
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().iter().map(|(text, _)| text.clone()).collect()
    }

    pub fn languages(&self) -> Vec<String> {
        self.spoken.lock().iter().map(|(_, lang)| lang.clone()).collect()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSpeech {
    async fn synthesize_and_play(
        &self,
        text: &str,
        language: &str,
    ) -> Result<(), CollaboratorError> {
        self.spoken
            .lock()
            .push((text.to_string(), language.to_string()));

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match &self.failure {
            Some(details) => Err(CollaboratorError::unavailable("speech", details.clone())),
            None => Ok(()),
        }
    }
}

/// Face recognizer with fixed detections and queued predictions
#[derive(Clone)]
pub struct MockFaceRecognizer {
    faces: Vec<BoundingBox>,
    predictions: Arc<Mutex<VecDeque<Prediction>>>,
    has_model: bool,
    detect_failure: Option<String>,
    latency: Duration,
    detect_calls: Arc<AtomicUsize>,
    predict_calls: Arc<AtomicUsize>,
}

impl MockFaceRecognizer {
    pub fn new(faces: Vec<BoundingBox>) -> Self {
        Self {
            faces,
            predictions: Arc::new(Mutex::new(VecDeque::new())),
            has_model: true,
            detect_failure: None,
            latency: Duration::ZERO,
            detect_calls: Arc::new(AtomicUsize::new(0)),
            predict_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Predictions handed out one per call; once exhausted every call
    /// reports label 0 with confidence 100
    pub fn with_predictions(self, predictions: Vec<Prediction>) -> Self {
        *self.predictions.lock() = predictions.into();
        self
    }

    pub fn without_model(mut self) -> Self {
        self.has_model = false;
        self
    }

    pub fn failing_detection(mut self, details: impl Into<String>) -> Self {
        self.detect_failure = Some(details.into());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn detect_calls(&self) -> usize {
        self.detect_calls.load(Ordering::SeqCst)
    }

    pub fn predict_calls(&self) -> usize {
        self.predict_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FaceRecognizer for MockFaceRecognizer {
    fn has_model(&self) -> bool {
        self.has_model
    }

    async fn detect_faces(&self, _image: &GrayImage) -> Result<Vec<BoundingBox>, CollaboratorError> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(details) = &self.detect_failure {
            return Err(CollaboratorError::unavailable("face recognizer", details.clone()));
        }
        Ok(self.faces.clone())
    }

    async fn predict_identity(&self, _region: &GrayImage) -> Result<Prediction, CollaboratorError> {
        self.predict_calls.fetch_add(1, Ordering::SeqCst);

        if !self.has_model {
            return Err(CollaboratorError::unavailable(
                "face recognizer",
                "no trained model loaded",
            ));
        }
        Ok(self.predictions.lock().pop_front().unwrap_or(Prediction {
            label: 0,
            confidence: 100.0,
        }))
    }
}
