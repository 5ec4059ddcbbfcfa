//! External collaborators: text recognition, speech and face recognition.
//!
//! The controller only sees the collaborator traits; the command-backed
//! implementations shell out to the programs installed on the device.

mod face;
mod labels;
mod mock;
mod ocr;
mod speech;
mod support;
mod types;

#[cfg(test)]
mod tests;

pub use face::HelperFaceRecognizer;
pub use labels::IdentityLabels;
pub use mock::{MockFaceRecognizer, MockSpeech, MockTextRecognizer};
pub use ocr::TesseractOcr;
pub use speech::CommandSpeech;
pub use types::{BoundingBox, FaceRecognizer, Prediction, SpeechSynthesizer, TextRecognizer};
