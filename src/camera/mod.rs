mod device;
#[cfg(all(feature = "camera", target_os = "linux"))]
mod gst_camera;
mod resource;

pub use device::{CaptureDevice, DeviceCounters, SyntheticCamera, SyntheticPattern};
#[cfg(all(feature = "camera", target_os = "linux"))]
pub use gst_camera::GStreamerCamera;
pub use resource::{CameraLease, CameraResource};
