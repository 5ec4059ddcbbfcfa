mod detector;
mod types;

pub use detector::TapGestureDetector;
pub use types::{GestureClassification, LineState, TapEvent, TapState};
