//! Frames handed to a recording session.
//!
//! A `Frame` owns decoded RGB8 pixels. Camera sources that deliver other
//! layouts are normalized at construction so the session and its transforms
//! only ever see one pixel format.

use image::{DynamicImage, RgbImage};
use std::path::Path;
use std::time::Instant;

use crate::error::{RecorderError, Result};

mod normalize;

pub use normalize::PixelLayout;

pub struct Frame {
    image: RgbImage,
    /// Monotonic capture instant, for callers measuring pipeline latency.
    captured_at: Instant,
}

impl Frame {
    pub fn from_image(image: RgbImage) -> Self {
        Self {
            image,
            captured_at: Instant::now(),
        }
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self::from_image(image.into_rgb8())
    }

    /// Convert a raw camera buffer. The length must match `layout` exactly.
    pub fn from_raw(pixels: &[u8], width: u32, height: u32, layout: PixelLayout) -> Result<Self> {
        normalize::to_rgb_image(pixels, width, height, layout).map(Self::from_image)
    }

    pub fn from_rgb24(pixels: &[u8], width: u32, height: u32) -> Result<Self> {
        Self::from_raw(pixels, width, height, PixelLayout::Rgb24)
    }

    pub fn from_nv12(pixels: &[u8], width: u32, height: u32) -> Result<Self> {
        Self::from_raw(pixels, width, height, PixelLayout::Nv12)
    }

    /// Decode an image file (JPEG or PNG) into a frame.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|e| {
            RecorderError::InvalidFrame(format!("failed to decode {}: {}", path.display(), e))
        })?;
        Ok(Self::from_dynamic(image))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

impl From<RgbImage> for Frame {
    fn from(image: RgbImage) -> Self {
        Self::from_image(image)
    }
}

impl From<DynamicImage> for Frame {
    fn from(image: DynamicImage) -> Self {
        Self::from_dynamic(image)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}
