//! Motion-JPEG clip writer.
//!
//! Each frame is encoded as a baseline JPEG and appended to the artifact,
//! producing a raw MJPEG stream that ffplay/VLC open directly
//! (`ffplay -f mjpeg -framerate <fps> clip.mjpeg`).

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use super::{ClipWriter, EncodeResult, FrameEncoder};
use crate::resolution::Resolution;

pub const DEFAULT_JPEG_QUALITY: u8 = 85;

#[derive(Clone, Debug)]
pub struct MjpegEncoder {
    quality: u8,
}

impl MjpegEncoder {
    pub fn new() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Quality is clamped to the JPEG range 1..=100.
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for MjpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameEncoder for MjpegEncoder {
    type Writer = MjpegWriter;

    fn extension(&self) -> &str {
        "mjpeg"
    }

    fn open(
        &mut self,
        path: &Path,
        resolution: Resolution,
        frame_rate: u32,
    ) -> EncodeResult<MjpegWriter> {
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        log::debug!(
            "mjpeg: opened {} ({} @ {} fps, q{})",
            path.display(),
            resolution,
            frame_rate,
            self.quality
        );
        Ok(MjpegWriter {
            out: BufWriter::new(file),
            resolution,
            quality: self.quality,
            frames: 0,
        })
    }
}

pub struct MjpegWriter {
    out: BufWriter<File>,
    resolution: Resolution,
    quality: u8,
    frames: u64,
}

impl ClipWriter for MjpegWriter {
    fn append(&mut self, frame: &RgbImage) -> EncodeResult<()> {
        if frame.dimensions() != self.resolution.dimensions() {
            return Err(format!(
                "frame is {}x{}, clip is {}",
                frame.width(),
                frame.height(),
                self.resolution
            )
            .into());
        }
        let mut encoder = JpegEncoder::new_with_quality(&mut self.out, self.quality);
        encoder.encode_image(frame)?;
        self.frames += 1;
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames
    }

    fn finish(mut self) -> EncodeResult<()> {
        self.out.flush()?;
        self.out.get_ref().sync_all()?;
        Ok(())
    }
}
