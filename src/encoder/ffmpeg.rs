//! MP4 clip writer using FFmpeg.
//!
//! Frames are converted to YUV420P with swscale and encoded as MPEG-4 Part 2
//! (the `mp4v` fourcc), one packet stream per artifact. The trailer is
//! written on `finish`; a clip that is never finished is not playable.

use anyhow::{anyhow, Context as _};
use ffmpeg_next as ffmpeg;
use image::RgbImage;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use super::{ClipWriter, EncodeResult, FrameEncoder};
use crate::resolution::Resolution;

#[derive(Clone, Debug, Default)]
pub struct FfmpegEncoder {
    /// Target bitrate in bits per second. Defaults to four bits per pixel per second.
    pub bit_rate: Option<usize>,
}

impl FrameEncoder for FfmpegEncoder {
    type Writer = FfmpegWriter;

    fn extension(&self) -> &str {
        "mp4"
    }

    fn open(
        &mut self,
        path: &Path,
        resolution: Resolution,
        frame_rate: u32,
    ) -> EncodeResult<FfmpegWriter> {
        // Claim the name first; FFmpeg reopens and truncates it.
        OpenOptions::new().write(true).create_new(true).open(path)?;
        let (width, height) = resolution.dimensions();
        let bit_rate = self
            .bit_rate
            .unwrap_or((width as usize) * (height as usize) * 4);
        let writer = match FfmpegWriter::create(path, width, height, frame_rate, bit_rate) {
            Ok(writer) => writer,
            Err(err) => {
                if let Err(e) = std::fs::remove_file(path) {
                    log::warn!("ffmpeg: failed to remove {}: {}", path.display(), e);
                }
                return Err(err.into());
            }
        };
        log::debug!(
            "ffmpeg: opened {} ({} @ {} fps, {} bps)",
            path.display(),
            resolution,
            frame_rate,
            bit_rate
        );
        Ok(writer)
    }
}

pub struct FfmpegWriter {
    path: PathBuf,
    output: ffmpeg::format::context::Output,
    encoder: ffmpeg::encoder::video::Encoder,
    scaler: ffmpeg::software::scaling::Context,
    encoder_time_base: ffmpeg::Rational,
    stream_time_base: ffmpeg::Rational,
    width: u32,
    height: u32,
    frames: u64,
}

impl FfmpegWriter {
    fn create(
        path: &Path,
        width: u32,
        height: u32,
        frame_rate: u32,
        bit_rate: usize,
    ) -> anyhow::Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let fps = i32::try_from(frame_rate).map_err(|_| anyhow!("frame rate out of range"))?;
        let mut output = ffmpeg::format::output(&path)
            .with_context(|| format!("failed to create output '{}'", path.display()))?;
        let global_header = output
            .format()
            .flags()
            .contains(ffmpeg::format::Flags::GLOBAL_HEADER);
        let codec = ffmpeg::encoder::find(ffmpeg::codec::Id::MPEG4)
            .ok_or_else(|| anyhow!("ffmpeg build has no MPEG-4 encoder"))?;
        let encoder_time_base = ffmpeg::Rational::new(1, fps);

        let encoder = {
            let mut stream = output.add_stream(codec).context("add video stream")?;
            let mut video =
                ffmpeg::codec::context::Context::from_parameters(stream.parameters())
                    .context("load encoder parameters")?
                    .encoder()
                    .video()
                    .context("create video encoder")?;
            video.set_width(width);
            video.set_height(height);
            video.set_format(ffmpeg::format::Pixel::YUV420P);
            video.set_time_base(encoder_time_base);
            video.set_frame_rate(Some(ffmpeg::Rational::new(fps, 1)));
            video.set_bit_rate(bit_rate);
            video.set_gop(frame_rate.saturating_mul(2).max(1));
            if global_header {
                video.set_flags(ffmpeg::codec::Flags::GLOBAL_HEADER);
            }
            let opened = video.open_as(codec).context("open MPEG-4 encoder")?;
            stream.set_parameters(&opened);
            stream.set_time_base(encoder_time_base);
            opened
        };

        let scaler = ffmpeg::software::scaling::context::Context::get(
            ffmpeg::util::format::pixel::Pixel::RGB24,
            width,
            height,
            ffmpeg::util::format::pixel::Pixel::YUV420P,
            width,
            height,
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        output.write_header().context("write container header")?;
        let stream_time_base = output
            .stream(0)
            .map(|stream| stream.time_base())
            .ok_or_else(|| anyhow!("output stream missing after header"))?;

        Ok(Self {
            path: path.to_path_buf(),
            output,
            encoder,
            scaler,
            encoder_time_base,
            stream_time_base,
            width,
            height,
            frames: 0,
        })
    }

    fn drain_packets(&mut self) -> anyhow::Result<()> {
        let mut packet = ffmpeg::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(0);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .context("write packet")?;
        }
        Ok(())
    }

    fn append_inner(&mut self, frame: &RgbImage) -> anyhow::Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            anyhow::bail!(
                "frame is {}x{}, clip is {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            );
        }
        let rgb = rgb_frame(frame);
        let mut yuv = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&rgb, &mut yuv)
            .context("scale frame to YUV420P")?;
        let pts = i64::try_from(self.frames).context("frame counter overflow")?;
        yuv.set_pts(Some(pts));
        self.encoder
            .send_frame(&yuv)
            .context("send frame to encoder")?;
        self.drain_packets()?;
        self.frames += 1;
        Ok(())
    }

    fn finish_inner(mut self) -> anyhow::Result<()> {
        self.encoder.send_eof().context("flush encoder")?;
        self.drain_packets()?;
        self.output
            .write_trailer()
            .with_context(|| format!("write trailer for {}", self.path.display()))?;
        Ok(())
    }
}

impl ClipWriter for FfmpegWriter {
    fn append(&mut self, frame: &RgbImage) -> EncodeResult<()> {
        Ok(self.append_inner(frame)?)
    }

    fn frames_written(&self) -> u64 {
        self.frames
    }

    fn finish(self) -> EncodeResult<()> {
        Ok(self.finish_inner()?)
    }
}

/// Copy an `RgbImage` into an RGB24 FFmpeg frame, honouring the frame's row stride.
fn rgb_frame(image: &RgbImage) -> ffmpeg::frame::Video {
    let mut frame = ffmpeg::frame::Video::new(
        ffmpeg::format::Pixel::RGB24,
        image.width(),
        image.height(),
    );
    let row_bytes = image.width() as usize * 3;
    let stride = frame.stride(0);
    let data = frame.data_mut(0);
    for (row, pixels) in image.as_raw().chunks_exact(row_bytes).enumerate() {
        let start = row * stride;
        data[start..start + row_bytes].copy_from_slice(pixels);
    }
    frame
}
