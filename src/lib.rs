pub mod app;
pub mod camera;
pub mod clock;
pub mod collaborators;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod frame;
pub mod gesture;
pub mod gpio;
pub mod keyboard_input;
pub mod ranging;

pub use app::{ComponentState, HardwareGuard, HardwareSetup, ShutdownReason, ShutdownReport, Supervisor};
pub use camera::{CameraLease, CameraResource, CaptureDevice};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use collaborators::{FaceRecognizer, IdentityLabels, SpeechSynthesizer, TextRecognizer};
pub use config::GlassesConfig;
pub use dispatch::{ActionDispatcher, ActionOutcome, Collaborators};
pub use error::{GlassesError, GlassesErrorExt, Result};
pub use events::{EventBus, GlassesEvent};
pub use frame::{Frame, PixelFormat, RawFrame};
pub use gesture::{GestureClassification, TapGestureDetector};
pub use gpio::{GpioBackend, Level};
pub use keyboard_input::KeyboardTapSimulator;
pub use ranging::RangeSensor;
