//! Triggered recording session.
//!
//! A `RecordingSession` writes frames into a clip only while a recording
//! window is open. Callers open or extend the window with `activate` whenever
//! a trigger fires and hand every acquired frame to `submit_frame`; frames
//! outside a window are dropped without error.
//!
//! Expiry is lazy. `window_start + active_duration` is the only deadline and
//! it is evaluated when the session is called, never by a timer. A session
//! that stops receiving calls keeps its clip open until `submit_frame`,
//! `activate`, `check_expiry` or `stop_recording` touches it.
//!
//! States:
//! - Idle: no window, no clip
//! - WindowOpen: window active, clip not opened yet (`OpenPolicy::OnFirstFrame`)
//! - Recording: clip open

use chrono::{DateTime, Local};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};
use crate::encoder::{ClipWriter, FrameEncoder};
use crate::error::{RecorderError, Result};
use crate::frame::Frame;
use crate::naming::next_clip_path;
use crate::resolution::Resolution;
use crate::transform::{FrameTransform, Resize};

pub const DEFAULT_FRAME_RATE: u32 = 2;
pub const DEFAULT_DURATION: Duration = Duration::from_secs(10);
pub const DEFAULT_OUTPUT_DIR: &str = "/tmp";

/// When the clip for a new window is created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenPolicy {
    /// Open the clip inside `activate`. A window with no frames leaves an
    /// empty artifact behind.
    #[default]
    Eager,
    /// Open the clip on the first accepted frame of a window.
    OnFirstFrame,
}

impl FromStr for OpenPolicy {
    type Err = RecorderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eager" => Ok(OpenPolicy::Eager),
            "on_first_frame" | "on-first-frame" | "lazy" => Ok(OpenPolicy::OnFirstFrame),
            other => Err(RecorderError::Configuration(format!(
                "invalid open policy '{}'; expected eager or on_first_frame",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub resolution: Resolution,
    pub frame_rate: u32,
    pub output_dir: PathBuf,
    /// Window length used when `activate` gets no duration (or zero).
    pub default_duration: Duration,
    pub open_policy: OpenPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            frame_rate: DEFAULT_FRAME_RATE,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            default_duration: DEFAULT_DURATION,
            open_policy: OpenPolicy::default(),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.frame_rate == 0 {
            return Err(RecorderError::Configuration(
                "frame rate must be greater than zero".to_string(),
            ));
        }
        if self.default_duration.is_zero() {
            return Err(RecorderError::Configuration(
                "default duration must be greater than zero".to_string(),
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(RecorderError::Configuration(
                "output directory must be set".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    WindowOpen,
    Recording,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// No window has been opened since construction or the last stop.
    Idle,
    /// The window deadline passed; the clip was finalized by this call.
    Expired,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameDisposition {
    Written,
    Dropped(DropReason),
}

impl FrameDisposition {
    pub fn is_written(self) -> bool {
        self == FrameDisposition::Written
    }
}

/// A clip that has been closed and will never be written again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClipSummary {
    pub path: PathBuf,
    pub frames: u64,
    pub opened_at: DateTime<Local>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub activations: u64,
    pub frames_written: u64,
    pub frames_dropped: u64,
    pub clips_opened: u64,
    pub clips_finalized: u64,
    pub write_errors: u64,
}

struct OpenClip<W> {
    writer: W,
    path: PathBuf,
    opened_at: DateTime<Local>,
}

pub struct RecordingSession<E: FrameEncoder, C: Clock = SystemClock> {
    config: SessionConfig,
    encoder: E,
    clock: C,
    transform: Box<dyn FrameTransform>,
    active_duration: Duration,
    /// `None` is the "never / long ago" sentinel: no window is active.
    window_start: Option<Instant>,
    clip: Option<OpenClip<E::Writer>>,
    last_clip: Option<ClipSummary>,
    stats: SessionStats,
}

impl<E: FrameEncoder> RecordingSession<E, SystemClock> {
    pub fn new(config: SessionConfig, encoder: E) -> Result<Self> {
        Self::with_clock(config, encoder, SystemClock)
    }
}

impl<E: FrameEncoder, C: Clock> RecordingSession<E, C> {
    pub fn with_clock(config: SessionConfig, encoder: E, clock: C) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.output_dir).map_err(|e| {
            RecorderError::Configuration(format!(
                "output directory {} is unusable: {}",
                config.output_dir.display(),
                e
            ))
        })?;
        log::debug!(
            "recording session: {} @ {} fps, default window {:?}, {:?} open, writing to {}",
            config.resolution,
            config.frame_rate,
            config.default_duration,
            config.open_policy,
            config.output_dir.display()
        );
        Ok(Self {
            active_duration: config.default_duration,
            config,
            encoder,
            clock,
            transform: Box::new(Resize::default()),
            window_start: None,
            clip: None,
            last_clip: None,
            stats: SessionStats::default(),
        })
    }

    /// Replace the pre-write transform (default: stretch resize).
    pub fn with_transform(mut self, transform: impl FrameTransform + 'static) -> Self {
        self.transform = Box::new(transform);
        self
    }

    /// Open a recording window, or restart the running one.
    ///
    /// The new deadline is `now + duration`; it replaces the previous deadline
    /// rather than adding to it. `None` or a zero duration selects the default.
    pub fn activate(&mut self, duration: Option<Duration>) -> Result<()> {
        let now = self.clock.now();
        if self.clip.is_some() && !self.is_active_at(now) {
            // Window lapsed without a call observing it; the old clip must not
            // absorb the new window.
            self.finalize_clip();
        }

        self.active_duration = match duration {
            Some(d) if !d.is_zero() => d,
            _ => self.config.default_duration,
        };
        self.window_start = Some(now);
        self.stats.activations += 1;
        log::debug!("activate: window {:?}", self.active_duration);

        if self.config.open_policy == OpenPolicy::Eager {
            if let Err(err) = self.ensure_encoder() {
                self.reset_window();
                return Err(err);
            }
        }
        Ok(())
    }

    /// Record `frame` if a window is active, otherwise drop it.
    pub fn submit_frame(&mut self, frame: &Frame) -> Result<FrameDisposition> {
        let now = self.clock.now();
        if !self.is_active_at(now) {
            let reason = if self.window_start.is_some() || self.clip.is_some() {
                DropReason::Expired
            } else {
                DropReason::Idle
            };
            self.stop_recording();
            self.stats.frames_dropped += 1;
            return Ok(FrameDisposition::Dropped(reason));
        }

        let image = self.transform.apply(frame, self.config.resolution)?;
        if image.dimensions() != self.config.resolution.dimensions() {
            return Err(RecorderError::Transform(format!(
                "{} produced {}x{}, expected {}",
                self.transform.name(),
                image.width(),
                image.height(),
                self.config.resolution
            )));
        }

        let clip = match self.ensure_encoder() {
            Ok(clip) => clip,
            Err(err) => {
                self.reset_window();
                return Err(err);
            }
        };
        match clip.writer.append(&image) {
            Ok(()) => {
                log::debug!("submit_frame: wrote frame to {}", clip.path.display());
                self.stats.frames_written += 1;
                Ok(FrameDisposition::Written)
            }
            Err(source) => {
                let path = clip.path.clone();
                self.stats.write_errors += 1;
                log::warn!("write to {} failed; discarding clip", path.display());
                self.finalize_clip();
                Err(RecorderError::Write { path, source })
            }
        }
    }

    /// Close any open clip and return to idle. Safe to call at any time.
    pub fn stop_recording(&mut self) -> Option<ClipSummary> {
        let summary = self.finalize_clip();
        self.reset_window();
        summary
    }

    /// Finalize the clip if the window has expired. Hosts that need clips
    /// closed promptly call this periodically instead of waiting for a frame.
    pub fn check_expiry(&mut self) -> Option<ClipSummary> {
        let idle = self.window_start.is_none() && self.clip.is_none();
        if idle || self.is_active_at(self.clock.now()) {
            return None;
        }
        log::debug!("check_expiry: window elapsed");
        self.stop_recording()
    }

    pub fn state(&self) -> SessionState {
        if self.clip.is_some() {
            SessionState::Recording
        } else if self.is_active_at(self.clock.now()) {
            SessionState::WindowOpen
        } else {
            SessionState::Idle
        }
    }

    pub fn is_window_active(&self) -> bool {
        self.is_active_at(self.clock.now())
    }

    /// Time left in the current window, `None` when no window is active.
    pub fn remaining(&self) -> Option<Duration> {
        self.elapsed_in_window(self.clock.now())
            .and_then(|elapsed| self.active_duration.checked_sub(elapsed))
            .filter(|left| !left.is_zero())
    }

    pub fn active_duration(&self) -> Duration {
        self.active_duration
    }

    pub fn current_clip(&self) -> Option<&Path> {
        self.clip.as_ref().map(|clip| clip.path.as_path())
    }

    pub fn last_clip(&self) -> Option<&ClipSummary> {
        self.last_clip.as_ref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Expiry compares elapsed time against the duration; `Instant + Duration`
    /// overflows for very long windows.
    fn elapsed_in_window(&self, now: Instant) -> Option<Duration> {
        self.window_start.map(|start| now.saturating_duration_since(start))
    }

    fn is_active_at(&self, now: Instant) -> bool {
        self.elapsed_in_window(now)
            .is_some_and(|elapsed| elapsed < self.active_duration)
    }

    fn reset_window(&mut self) {
        self.window_start = None;
        self.active_duration = self.config.default_duration;
    }

    fn ensure_encoder(&mut self) -> Result<&mut OpenClip<E::Writer>> {
        let clip = match self.clip.take() {
            Some(clip) => clip,
            None => self.open_clip()?,
        };
        Ok(self.clip.insert(clip))
    }

    fn open_clip(&mut self) -> Result<OpenClip<E::Writer>> {
        let opened_at = self.clock.wall_now();
        let path = next_clip_path(
            &self.config.output_dir,
            &opened_at,
            self.encoder.extension(),
        );
        let writer = self
            .encoder
            .open(&path, self.config.resolution, self.config.frame_rate)
            .map_err(|source| RecorderError::ResourceCreation {
                path: path.clone(),
                source,
            })?;
        self.stats.clips_opened += 1;
        log::info!("recording to {}", path.display());
        Ok(OpenClip {
            writer,
            path,
            opened_at,
        })
    }

    fn finalize_clip(&mut self) -> Option<ClipSummary> {
        let clip = self.clip.take()?;
        let summary = ClipSummary {
            path: clip.path,
            frames: clip.writer.frames_written(),
            opened_at: clip.opened_at,
        };
        match clip.writer.finish() {
            Ok(()) => log::info!(
                "finalized {} ({} frames)",
                summary.path.display(),
                summary.frames
            ),
            Err(e) => log::warn!("failed to finalize {}: {}", summary.path.display(), e),
        }
        self.stats.clips_finalized += 1;
        self.last_clip = Some(summary.clone());
        Some(summary)
    }
}

impl<E: FrameEncoder, C: Clock> Drop for RecordingSession<E, C> {
    fn drop(&mut self) {
        self.finalize_clip();
    }
}
