use super::device::CaptureDevice;
use crate::error::CameraError;
use crate::frame::Frame;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task;
use tracing::{debug, info, warn};

/// Exclusive-access wrapper around the one physical camera.
///
/// At most one capture is in flight. A request arriving while another holds
/// the camera fails immediately with [`CameraError::Busy`] instead of waiting.
#[derive(Clone)]
pub struct CameraResource {
    device: Arc<Mutex<Box<dyn CaptureDevice>>>,
    in_use: Arc<AtomicBool>,
    started: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

/// Proof of exclusive camera access; releases on drop.
///
/// Not `Clone`, so it can't be duplicated, and dropping it on any path
/// (return, error, panic unwinding or a cancelled future) frees the camera.
pub struct CameraLease {
    in_use: Arc<AtomicBool>,
    acquired_at: Instant,
}

impl CameraLease {
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }
}

impl Drop for CameraLease {
    fn drop(&mut self) {
        self.in_use.store(false, Ordering::Release);
        debug!("Camera lease released after {:?}", self.held_for());
    }
}

impl CameraResource {
    pub fn new(device: Box<dyn CaptureDevice>) -> Self {
        Self {
            device: Arc::new(Mutex::new(device)),
            in_use: Arc::new(AtomicBool::new(false)),
            started: Arc::new(AtomicBool::new(false)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the device and let it settle for `warmup`.
    ///
    /// Fails with `NotStarted` once `stop` has been called. A start abandoned
    /// mid-way still finishes on its blocking thread, and a later `stop`
    /// waits for it and stops the device.
    pub async fn start(&self, warmup: Duration) -> Result<(), CameraError> {
        let device = Arc::clone(&self.device);
        let started = Arc::clone(&self.started);
        let closed = Arc::clone(&self.closed);
        let name = task::spawn_blocking(move || {
            let mut device = device.lock();
            if closed.load(Ordering::Acquire) {
                return Err(CameraError::NotStarted);
            }
            device.start()?;
            started.store(true, Ordering::Release);
            Ok(device.name().to_string())
        })
        .await
        .map_err(|e| CameraError::DeviceFailure {
            details: format!("Camera start task failed: {}", e),
        })??;

        if !warmup.is_zero() {
            debug!("Camera warm-up for {:?}", warmup);
            tokio::time::sleep(warmup).await;
        }

        info!("Camera '{}' ready", name);
        Ok(())
    }

    /// Try to take exclusive access without waiting
    pub fn try_lease(&self) -> Result<CameraLease, CameraError> {
        self.in_use
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CameraError::Busy)?;

        Ok(CameraLease {
            in_use: Arc::clone(&self.in_use),
            acquired_at: Instant::now(),
        })
    }

    /// Capture one frame and run `action` on it while holding the camera.
    ///
    /// The lease lives until `action` completes, so the camera stays claimed
    /// for the whole capture-and-process cycle.
    pub async fn with_capture<F, Fut, T>(&self, action: F) -> Result<T, CameraError>
    where
        F: FnOnce(Frame) -> Fut,
        Fut: Future<Output = T>,
    {
        let lease = self.try_lease()?;

        if !self.started.load(Ordering::Acquire) {
            return Err(CameraError::NotStarted);
        }

        let device = Arc::clone(&self.device);
        let raw = task::spawn_blocking(move || device.lock().capture_frame())
            .await
            .map_err(|e| CameraError::DeviceFailure {
                details: format!("Capture task failed: {}", e),
            })??;

        let frame = Frame::new(raw)?;
        debug!("Frame {} captured for action", frame.raw().id);

        let output = action(frame).await;
        drop(lease);
        Ok(output)
    }

    pub fn is_busy(&self) -> bool {
        self.in_use.load(Ordering::Acquire)
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Stop the device and refuse any later start.
    ///
    /// Waits for a start or capture already inside the device.
    pub fn stop(&self) -> Result<(), CameraError> {
        self.closed.store(true, Ordering::Release);
        let mut device = self.device.lock();

        if !self.started.swap(false, Ordering::AcqRel) {
            debug!("Camera not started, nothing to stop");
            return Ok(());
        }

        if self.is_busy() {
            warn!("Stopping camera while a capture action is in flight");
        }

        device.stop()
    }
}
