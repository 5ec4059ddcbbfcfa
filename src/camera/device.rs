use crate::error::CameraError;
use crate::frame::{PixelFormat, RawFrame};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Physical (or simulated) capture device
pub trait CaptureDevice: Send {
    fn name(&self) -> &str;

    fn start(&mut self) -> Result<(), CameraError>;

    /// Grab exactly one frame. May block up to the device's own bound.
    fn capture_frame(&mut self) -> Result<RawFrame, CameraError>;

    fn stop(&mut self) -> Result<(), CameraError>;
}

/// Lifecycle counters shared between a synthetic camera and its observers
#[derive(Debug, Default)]
pub struct DeviceCounters {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub captures: AtomicUsize,
}

impl DeviceCounters {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

/// What a synthetic camera draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticPattern {
    /// Every pixel the same gray value
    Solid(u8),
    /// Horizontal ramp from black to white
    Gradient,
}

/// Camera that renders a deterministic pattern in XRGB8888.
///
/// Used in simulation mode and tests; supports artificial start and capture
/// delays and one-shot failure injection.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    pattern: SyntheticPattern,
    capture_delay: Duration,
    start_delay: Duration,
    running: bool,
    frame_counter: u64,
    fail_next: Arc<Mutex<Option<String>>>,
    counters: Arc<DeviceCounters>,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32, pattern: SyntheticPattern) -> Self {
        Self {
            width,
            height,
            pattern,
            capture_delay: Duration::ZERO,
            start_delay: Duration::ZERO,
            running: false,
            frame_counter: 0,
            fail_next: Arc::new(Mutex::new(None)),
            counters: Arc::new(DeviceCounters::default()),
        }
    }

    pub fn with_capture_delay(mut self, delay: Duration) -> Self {
        self.capture_delay = delay;
        self
    }

    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    pub fn counters(&self) -> Arc<DeviceCounters> {
        Arc::clone(&self.counters)
    }

    /// Handle that makes the next capture fail with `details`
    pub fn failure_injector(&self) -> Arc<Mutex<Option<String>>> {
        Arc::clone(&self.fail_next)
    }

    fn render(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity((self.width * self.height * 4) as usize);
        for _y in 0..self.height {
            for x in 0..self.width {
                let v = match self.pattern {
                    SyntheticPattern::Solid(v) => v,
                    SyntheticPattern::Gradient => {
                        ((x as u64 * 255) / (self.width.max(2) as u64 - 1)) as u8
                    }
                };
                data.extend_from_slice(&[v, v, v, 0xff]);
            }
        }
        data
    }
}

impl CaptureDevice for SyntheticCamera {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn start(&mut self) -> Result<(), CameraError> {
        if !self.start_delay.is_zero() {
            std::thread::sleep(self.start_delay);
        }
        self.running = true;
        self.counters.starts.fetch_add(1, Ordering::SeqCst);
        info!(
            "Synthetic camera started ({}x{}, {:?})",
            self.width, self.height, self.pattern
        );
        Ok(())
    }

    fn capture_frame(&mut self) -> Result<RawFrame, CameraError> {
        if !self.running {
            return Err(CameraError::NotStarted);
        }

        if !self.capture_delay.is_zero() {
            std::thread::sleep(self.capture_delay);
        }

        if let Some(details) = self.fail_next.lock().take() {
            return Err(CameraError::DeviceFailure { details });
        }

        self.frame_counter += 1;
        self.counters.captures.fetch_add(1, Ordering::SeqCst);
        debug!("Synthetic frame {} captured", self.frame_counter);

        Ok(RawFrame::new(
            self.frame_counter,
            self.render(),
            self.width,
            self.height,
            PixelFormat::Xrgb8888,
        ))
    }

    fn stop(&mut self) -> Result<(), CameraError> {
        self.running = false;
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
        info!("Synthetic camera stopped");
        Ok(())
    }
}
