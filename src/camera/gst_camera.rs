use super::device::CaptureDevice;
use crate::config::CameraConfig;
use crate::error::CameraError;
use crate::frame::{PixelFormat, RawFrame};
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use tracing::{debug, info, trace, warn};

/// Still-capture camera backed by a GStreamer `appsink` pipeline.
///
/// The pipeline delivers BGRx (XRGB8888 in little-endian memory order) at the
/// configured resolution; each capture pulls the most recent sample.
pub struct GStreamerCamera {
    config: CameraConfig,
    pipeline: Pipeline,
    appsink: AppSink,
    frame_counter: u64,
    playing: bool,
}

impl GStreamerCamera {
    pub fn new(config: CameraConfig) -> Result<Self, CameraError> {
        info!(
            "Initializing GStreamer camera ({}x{} via {})",
            config.resolution.0, config.resolution.1, config.pipeline
        );

        gstreamer::init().map_err(|e| CameraError::DeviceFailure {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        let pipeline_desc = Self::build_pipeline_string(&config);
        info!("Creating GStreamer pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| CameraError::DeviceFailure {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| CameraError::DeviceFailure {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| CameraError::DeviceFailure {
                details: "Pipeline has no appsink named 'sink'".to_string(),
            })?
            .downcast::<AppSink>()
            .map_err(|_| CameraError::DeviceFailure {
                details: "Failed to downcast to AppSink".to_string(),
            })?;

        Ok(Self {
            config,
            pipeline,
            appsink,
            frame_counter: 0,
            playing: false,
        })
    }

    fn build_pipeline_string(config: &CameraConfig) -> String {
        let (width, height) = config.resolution;
        format!(
            "{} ! videoconvert ! video/x-raw,format=BGRx,width={},height={} ! \
             appsink name=sink sync=false max-buffers=1 drop=true enable-last-sample=false",
            config.pipeline, width, height
        )
    }

    fn sample_to_frame(&mut self, sample: gstreamer::Sample) -> Result<RawFrame, CameraError> {
        let buffer = sample.buffer().ok_or_else(|| CameraError::DeviceFailure {
            details: "No buffer in sample".to_string(),
        })?;

        let caps = sample.caps().ok_or_else(|| CameraError::DeviceFailure {
            details: "No caps in sample".to_string(),
        })?;

        let video_info = VideoInfo::from_caps(caps).map_err(|e| CameraError::DeviceFailure {
            details: format!("Failed to get video info: {}", e),
        })?;

        let width = video_info.width();
        let height = video_info.height();
        let stride = video_info.stride()[0] as usize;
        let row_bytes = width as usize * PixelFormat::Xrgb8888.bytes_per_pixel();

        let map = buffer
            .map_readable()
            .map_err(|e| CameraError::DeviceFailure {
                details: format!("Failed to map buffer: {}", e),
            })?;
        let src = map.as_slice();

        // Drop row padding so the frame is tightly packed
        let mut data = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            let end = start + row_bytes;
            if end > src.len() {
                return Err(CameraError::DeviceFailure {
                    details: format!("Short buffer: row {} ends past {} bytes", row, src.len()),
                });
            }
            data.extend_from_slice(&src[start..end]);
        }

        self.frame_counter += 1;
        trace!(
            "Captured frame {} ({}x{}, stride {})",
            self.frame_counter,
            width,
            height,
            stride
        );

        Ok(RawFrame::new(
            self.frame_counter,
            data,
            width,
            height,
            PixelFormat::Xrgb8888,
        ))
    }
}

impl CaptureDevice for GStreamerCamera {
    fn name(&self) -> &str {
        "gstreamer"
    }

    fn start(&mut self) -> Result<(), CameraError> {
        self.pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| CameraError::DeviceFailure {
                details: format!("Failed to start pipeline: {}", e),
            })?;
        self.playing = true;
        info!("GStreamer pipeline started");
        Ok(())
    }

    fn capture_frame(&mut self) -> Result<RawFrame, CameraError> {
        if !self.playing {
            return Err(CameraError::NotStarted);
        }

        let timeout = gstreamer::ClockTime::from_mseconds(self.config.capture_timeout_ms);
        let sample = self
            .appsink
            .try_pull_sample(timeout)
            .ok_or_else(|| CameraError::DeviceFailure {
                details: format!(
                    "No frame within {} ms",
                    self.config.capture_timeout_ms
                ),
            })?;

        self.sample_to_frame(sample)
    }

    fn stop(&mut self) -> Result<(), CameraError> {
        if !self.playing {
            debug!("GStreamer pipeline already stopped");
            return Ok(());
        }

        self.playing = false;
        self.pipeline
            .set_state(gstreamer::State::Null)
            .map_err(|e| {
                warn!("Failed to stop pipeline: {}", e);
                CameraError::DeviceFailure {
                    details: format!("Failed to stop pipeline: {}", e),
                }
            })?;
        info!("GStreamer pipeline stopped");
        Ok(())
    }
}
