use super::hardware::HardwareSetup;
use crate::camera::{SyntheticCamera, SyntheticPattern};
use crate::collaborators::{
    CommandSpeech, HelperFaceRecognizer, IdentityLabels, TesseractOcr,
};
use crate::config::GlassesConfig;
use crate::dispatch::Collaborators;
use crate::error::Result;
use crate::gpio::{MockGpio, MockLevel, SysfsGpio};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Hardware for running the controller without a board attached
pub struct SimulatedHardware {
    pub setup: HardwareSetup,
    /// Logical level of the tap button; set it high to press
    pub tap: MockLevel,
    pub gpio: MockGpio,
}

/// Mock GPIO whose echo never answers, a synthetic camera and a settable
/// tap button
pub fn simulated_hardware(config: &GlassesConfig) -> SimulatedHardware {
    let gpio = MockGpio::new();
    let tap = gpio.input_level(config.gpio.tap_pin);
    let (width, height) = config.camera.resolution;

    info!("Using simulated hardware ({}x{} synthetic camera)", width, height);
    SimulatedHardware {
        setup: HardwareSetup {
            gpio: Box::new(gpio.clone()),
            camera: Box::new(SyntheticCamera::new(width, height, SyntheticPattern::Gradient)),
        },
        tap,
        gpio,
    }
}

/// Sysfs GPIO and the GStreamer camera
pub fn device_hardware(config: &GlassesConfig) -> Result<HardwareSetup> {
    let gpio = Box::new(SysfsGpio::new(&config.gpio.sysfs_root, config.gpio.chip_base));

    #[cfg(all(feature = "camera", target_os = "linux"))]
    {
        let camera = crate::camera::GStreamerCamera::new(config.camera.clone())?;
        Ok(HardwareSetup {
            gpio,
            camera: Box::new(camera),
        })
    }

    #[cfg(not(all(feature = "camera", target_os = "linux")))]
    {
        drop(gpio);
        Err(crate::error::GlassesError::system(
            "Built without camera support; rebuild with --features camera or run with --simulate",
        ))
    }
}

/// Collaborators backed by the programs named in the configuration.
///
/// A missing face model is not fatal: identification is disabled and every
/// detected face reports as unknown.
pub fn command_collaborators(config: &GlassesConfig) -> Collaborators {
    let work_dir = PathBuf::from(&config.system.work_dir);

    let faces = match HelperFaceRecognizer::load(&config.face, &work_dir) {
        Ok(recognizer) => recognizer,
        Err(e) => {
            warn!("{}; face identification disabled", e);
            HelperFaceRecognizer::detector_only(&config.face, &work_dir)
        }
    };

    Collaborators {
        ocr: Arc::new(TesseractOcr::new(&config.ocr, &work_dir)),
        speech: Arc::new(CommandSpeech::new(&config.speech)),
        faces: Arc::new(faces),
        labels: IdentityLabels::new(config.face.labels.clone()),
    }
}
