use super::support::{run_checked, ScratchImage};
use super::types::TextRecognizer;
use crate::config::OcrConfig;
use crate::error::CollaboratorError;
use crate::frame::BinarizedImage;
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::PathBuf;
use tracing::debug;

const COLLABORATOR: &str = "ocr";

/// Text recognition through the `tesseract` command line tool
pub struct TesseractOcr {
    command: String,
    work_dir: PathBuf,
}

impl TesseractOcr {
    pub fn new(config: &OcrConfig, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: config.command.clone(),
            work_dir: work_dir.into(),
        }
    }
}

#[async_trait]
impl TextRecognizer for TesseractOcr {
    async fn recognize_text(&self, image: &BinarizedImage) -> Result<String, CollaboratorError> {
        let scratch = ScratchImage::write(&self.work_dir, COLLABORATOR, image).await?;

        let output = run_checked(
            COLLABORATOR,
            &self.command,
            [scratch.path().as_os_str(), OsStr::new("stdout")],
        )
        .await?;

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("OCR returned {} bytes", text.len());
        Ok(text)
    }
}
