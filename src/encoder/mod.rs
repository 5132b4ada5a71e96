//! Clip encoders.
//!
//! A `FrameEncoder` opens one `ClipWriter` per recording window. The session
//! owns the writer exclusively: nothing else appends to it or closes it.
//!
//! Backends:
//! - Motion-JPEG elementary stream (always available)
//! - MPEG-4 in MP4 via FFmpeg (feature: encode-ffmpeg)

#[cfg(feature = "encode-ffmpeg")]
pub mod ffmpeg;
pub mod mjpeg;

#[cfg(feature = "encode-ffmpeg")]
pub use ffmpeg::FfmpegEncoder;
pub use mjpeg::MjpegEncoder;

use image::RgbImage;
use std::path::Path;

use crate::resolution::Resolution;

pub type EncodeError = Box<dyn std::error::Error + Send + Sync + 'static>;
pub type EncodeResult<T> = std::result::Result<T, EncodeError>;

pub trait FrameEncoder: Send {
    type Writer: ClipWriter;

    /// File extension for artifacts produced by this encoder, without the dot.
    fn extension(&self) -> &str;

    /// Create a new artifact at `path`. Must fail rather than overwrite.
    fn open(
        &mut self,
        path: &Path,
        resolution: Resolution,
        frame_rate: u32,
    ) -> EncodeResult<Self::Writer>;
}

pub trait ClipWriter: Send {
    /// Append one frame. The image is already at the clip resolution.
    fn append(&mut self, frame: &RgbImage) -> EncodeResult<()>;

    fn frames_written(&self) -> u64;

    /// Flush and finalize the artifact so it is playable.
    fn finish(self) -> EncodeResult<()>;
}
