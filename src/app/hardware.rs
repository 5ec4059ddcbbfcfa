use crate::camera::{CameraResource, CaptureDevice};
use crate::error::{GlassesError, Result};
use crate::gpio::{Bias, GpioBackend, InputLine, Level, OutputLine};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info};

/// Raw hardware handed to the supervisor at startup
pub struct HardwareSetup {
    pub gpio: Box<dyn GpioBackend>,
    pub camera: Box<dyn CaptureDevice>,
}

/// Sole owner of the GPIO backend and the camera for the process lifetime.
///
/// Teardown (stop camera, release every line) runs exactly once: either via
/// [`HardwareGuard::teardown`] or, failing that, when the guard is dropped.
pub struct HardwareGuard {
    gpio: Mutex<Box<dyn GpioBackend>>,
    camera: CameraResource,
    torn_down: AtomicBool,
}

impl HardwareGuard {
    pub fn new(setup: HardwareSetup) -> Self {
        info!("Hardware: GPIO backend '{}'", setup.gpio.name());
        Self {
            gpio: Mutex::new(setup.gpio),
            camera: CameraResource::new(setup.camera),
            torn_down: AtomicBool::new(false),
        }
    }

    pub fn camera(&self) -> &CameraResource {
        &self.camera
    }

    pub fn claim_output(&self, pin: u32, initial: Level) -> Result<Box<dyn OutputLine>> {
        Ok(self.gpio.lock().claim_output(pin, initial)?)
    }

    pub fn claim_input(
        &self,
        pin: u32,
        bias: Bias,
        active_low: bool,
    ) -> Result<Box<dyn InputLine>> {
        Ok(self.gpio.lock().claim_input(pin, bias, active_low)?)
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Stop the camera and release all lines. Later calls do nothing.
    ///
    /// Both steps are attempted even if the first fails; the first error is
    /// returned.
    pub fn teardown(&self) -> Result<()> {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            debug!("Hardware already torn down");
            return Ok(());
        }

        info!("Tearing down hardware");

        let camera_result = self.camera.stop().map_err(GlassesError::from);
        if let Err(e) = &camera_result {
            error!("Failed to stop camera: {}", e);
        }

        let gpio_result = self.gpio.lock().cleanup().map_err(GlassesError::from);
        if let Err(e) = &gpio_result {
            error!("Failed to release GPIO lines: {}", e);
        }

        camera_result.and(gpio_result)
    }
}

impl Drop for HardwareGuard {
    fn drop(&mut self) {
        if !self.is_torn_down() {
            if let Err(e) = self.teardown() {
                error!("Teardown on drop failed: {}", e);
            }
        }
    }
}
