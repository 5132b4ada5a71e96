//! Raw camera buffers to `RgbImage`.

use image::{Rgb, RgbImage};

use crate::error::{RecorderError, Result};

/// Memory layout of a raw camera buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    /// Packed 8-bit R, G, B.
    Rgb24,
    /// Full-resolution Y plane followed by interleaved half-resolution U/V.
    Nv12,
}

impl PixelLayout {
    /// Exact buffer length for a `width` x `height` frame in this layout.
    pub fn buffer_len(self, width: u32, height: u32) -> Result<usize> {
        let pixels = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| invalid(format!("{}x{} frame is too large", width, height)))?;
        let len = match self {
            PixelLayout::Rgb24 => pixels.checked_mul(3),
            PixelLayout::Nv12 => pixels.checked_add(pixels / 2),
        };
        len.ok_or_else(|| invalid(format!("{}x{} frame is too large", width, height)))
    }
}

pub(crate) fn to_rgb_image(
    pixels: &[u8],
    width: u32,
    height: u32,
    layout: PixelLayout,
) -> Result<RgbImage> {
    if width == 0 || height == 0 {
        return Err(invalid(format!(
            "frame dimensions must be non-zero, got {}x{}",
            width, height
        )));
    }
    if layout == PixelLayout::Nv12 && (width % 2 != 0 || height % 2 != 0) {
        return Err(invalid(format!(
            "NV12 frames need even dimensions, got {}x{}",
            width, height
        )));
    }
    let expected = layout.buffer_len(width, height)?;
    if pixels.len() != expected {
        return Err(invalid(format!(
            "{:?} buffer length mismatch: expected {}, got {}",
            layout,
            expected,
            pixels.len()
        )));
    }

    match layout {
        PixelLayout::Rgb24 => RgbImage::from_raw(width, height, pixels.to_vec())
            .ok_or_else(|| invalid("RGB buffer too small".to_string())),
        PixelLayout::Nv12 => {
            let (luma, chroma) = pixels.split_at(width as usize * height as usize);
            let stride = width as usize;
            Ok(RgbImage::from_fn(width, height, |x, y| {
                let (x, y) = (x as usize, y as usize);
                let uv = (y / 2) * stride + (x / 2) * 2;
                yuv_to_rgb(luma[y * stride + x], chroma[uv], chroma[uv + 1])
            }))
        }
    }
}

/// BT.601 full-range YCbCr to RGB.
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> Rgb<u8> {
    let y = f32::from(y);
    let u = f32::from(u) - 128.0;
    let v = f32::from(v) - 128.0;
    Rgb([
        clamp_to_u8(y + 1.402 * v),
        clamp_to_u8(y - 0.344_136 * u - 0.714_136 * v),
        clamp_to_u8(y + 1.772 * u),
    ])
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn invalid(message: String) -> RecorderError {
    RecorderError::InvalidFrame(message)
}
