use crate::error::CameraError;
use image::{GrayImage, Luma, RgbImage};
use imageproc::contrast::threshold;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

/// Grayscale image thresholded to pure black and white
pub type BinarizedImage = GrayImage;

/// Pixel layout of a raw capture buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 32-bit XRGB, little-endian in memory: B, G, R, X
    Xrgb8888,
    /// Packed R, G, B
    Rgb24,
    /// Single luma byte
    Gray8,
}

impl PixelFormat {
    /// Get bytes per pixel for the format
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Xrgb8888 => 4,
            PixelFormat::Rgb24 => 3,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// Raw capture buffer as delivered by a device
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Unique frame identifier
    pub id: u64,
    /// Timestamp when frame was captured
    pub timestamp: SystemTime,
    /// Tightly packed pixel rows
    pub data: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl RawFrame {
    pub fn new(id: u64, data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            id,
            timestamp: SystemTime::now(),
            data: Arc::new(data),
            width,
            height,
            format,
        }
    }

    pub fn expected_size(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    /// Validate frame data size against expected size
    pub fn validate_size(&self) -> Result<(), CameraError> {
        if self.data.len() != self.expected_size() {
            return Err(CameraError::DeviceFailure {
                details: format!(
                    "Frame {} has {} bytes, expected {} for {}x{} {:?}",
                    self.id,
                    self.data.len(),
                    self.expected_size(),
                    self.width,
                    self.height,
                    self.format
                ),
            });
        }
        Ok(())
    }
}

/// A validated frame handed to a capture action.
///
/// Provides the representations the collaborators consume: RGB, grayscale for
/// face detection and binarized grayscale for text recognition.
#[derive(Debug, Clone)]
pub struct Frame {
    raw: RawFrame,
}

impl Frame {
    pub fn new(raw: RawFrame) -> Result<Self, CameraError> {
        raw.validate_size()?;
        Ok(Self { raw })
    }

    pub fn raw(&self) -> &RawFrame {
        &self.raw
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.raw.width, self.raw.height)
    }

    /// Reorder the capture buffer into packed RGB
    pub fn to_rgb(&self) -> RgbImage {
        let (width, height) = self.dimensions();
        let data = &self.raw.data;

        match self.raw.format {
            PixelFormat::Rgb24 => RgbImage::from_fn(width, height, |x, y| {
                let i = (y * width + x) as usize * 3;
                image::Rgb([data[i], data[i + 1], data[i + 2]])
            }),
            PixelFormat::Xrgb8888 => RgbImage::from_fn(width, height, |x, y| {
                let i = (y * width + x) as usize * 4;
                image::Rgb([data[i + 2], data[i + 1], data[i]])
            }),
            PixelFormat::Gray8 => RgbImage::from_fn(width, height, |x, y| {
                let v = data[(y * width + x) as usize];
                image::Rgb([v, v, v])
            }),
        }
    }

    /// Luma conversion with the ITU-R BT.601 weights
    pub fn to_grayscale(&self) -> GrayImage {
        let (width, height) = self.dimensions();

        if self.raw.format == PixelFormat::Gray8 {
            return GrayImage::from_fn(width, height, |x, y| {
                Luma([self.raw.data[(y * width + x) as usize]])
            });
        }

        let rgb = self.to_rgb();
        let mut gray_image = GrayImage::new(width, height);
        for (x, y, pixel) in rgb.enumerate_pixels() {
            let gray_value = (0.299 * pixel[0] as f32
                + 0.587 * pixel[1] as f32
                + 0.114 * pixel[2] as f32)
                .round()
                .min(255.0) as u8;
            gray_image.put_pixel(x, y, Luma([gray_value]));
        }
        gray_image
    }

    /// Grayscale, then values above `level` become 255 and the rest 0
    pub fn binarize(&self, level: u8) -> BinarizedImage {
        threshold(&self.to_grayscale(), level)
    }
}
