//! Pre-write frame transforms.
//!
//! The session runs exactly one transform on every accepted frame before it
//! reaches the clip writer. A transform must return an image of exactly the
//! session resolution; the session rejects anything else.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use crate::error::Result;
use crate::frame::Frame;
use crate::resolution::Resolution;

pub trait FrameTransform: Send {
    fn name(&self) -> &'static str;

    fn apply(&self, frame: &Frame, resolution: Resolution) -> Result<RgbImage>;
}

/// Stretch the frame to the output resolution, ignoring aspect ratio.
#[derive(Clone, Copy, Debug)]
pub struct Resize {
    pub filter: FilterType,
}

impl Default for Resize {
    fn default() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }
}

impl FrameTransform for Resize {
    fn name(&self) -> &'static str {
        "resize"
    }

    fn apply(&self, frame: &Frame, resolution: Resolution) -> Result<RgbImage> {
        let (width, height) = resolution.dimensions();
        if frame.dimensions() == (width, height) {
            return Ok(frame.as_image().clone());
        }
        Ok(imageops::resize(frame.as_image(), width, height, self.filter))
    }
}

/// Fit the whole frame inside the output, padding the remainder.
#[derive(Clone, Copy, Debug)]
pub struct Letterbox {
    pub filter: FilterType,
    pub fill: Rgb<u8>,
}

impl Default for Letterbox {
    fn default() -> Self {
        Self {
            filter: FilterType::Triangle,
            fill: Rgb([0, 0, 0]),
        }
    }
}

impl FrameTransform for Letterbox {
    fn name(&self) -> &'static str {
        "letterbox"
    }

    fn apply(&self, frame: &Frame, resolution: Resolution) -> Result<RgbImage> {
        let (width, height) = resolution.dimensions();
        if frame.dimensions() == (width, height) {
            return Ok(frame.as_image().clone());
        }
        let scale = f64::min(
            width as f64 / frame.width() as f64,
            height as f64 / frame.height() as f64,
        );
        let fit_w = scaled(frame.width(), scale).min(width);
        let fit_h = scaled(frame.height(), scale).min(height);
        let fitted = imageops::resize(frame.as_image(), fit_w, fit_h, self.filter);

        let mut canvas = RgbImage::from_pixel(width, height, self.fill);
        let x = (width - fit_w) / 2;
        let y = (height - fit_h) / 2;
        imageops::overlay(&mut canvas, &fitted, x as i64, y as i64);
        Ok(canvas)
    }
}

/// Fill the output completely, cropping whatever overflows around the center.
#[derive(Clone, Copy, Debug)]
pub struct CenterCrop {
    pub filter: FilterType,
}

impl Default for CenterCrop {
    fn default() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }
}

impl FrameTransform for CenterCrop {
    fn name(&self) -> &'static str {
        "center-crop"
    }

    fn apply(&self, frame: &Frame, resolution: Resolution) -> Result<RgbImage> {
        let (width, height) = resolution.dimensions();
        if frame.dimensions() == (width, height) {
            return Ok(frame.as_image().clone());
        }
        let scale = f64::max(
            width as f64 / frame.width() as f64,
            height as f64 / frame.height() as f64,
        );
        let cover_w = scaled(frame.width(), scale).max(width);
        let cover_h = scaled(frame.height(), scale).max(height);
        let covered = imageops::resize(frame.as_image(), cover_w, cover_h, self.filter);

        let x = (cover_w - width) / 2;
        let y = (cover_h - height) / 2;
        Ok(imageops::crop_imm(&covered, x, y, width, height).to_image())
    }
}

fn scaled(length: u32, scale: f64) -> u32 {
    ((length as f64 * scale).round() as u32).max(1)
}
