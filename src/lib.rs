//! Triggered DVR
//!
//! Event-windowed clip recording for camera pipelines. A trigger (motion,
//! a detector hit, a button) opens a recording window; frames submitted while
//! the window is open are written to a clip, and frames outside it are
//! dropped. Re-triggering restarts the window, so a burst of events becomes
//! one continuous clip.
//!
//! # Module Structure
//!
//! - `session`: the recording state machine (`RecordingSession`)
//! - `encoder`: clip writers (Motion-JPEG, FFmpeg MP4)
//! - `transform`: pre-write frame transforms (resize, letterbox, crop)
//! - `frame`: owned RGB frames and pixel-format normalization
//! - `actor`: single-owner session thread for multi-producer hosts
//! - `config`: file + environment configuration
//!
//! ```no_run
//! use std::time::Duration;
//! use triggered_dvr::{Frame, MjpegEncoder, RecordingSession, SessionConfig};
//!
//! # fn main() -> triggered_dvr::Result<()> {
//! let mut dvr = RecordingSession::new(SessionConfig::default(), MjpegEncoder::new())?;
//! # let motion_detected = true;
//! # let frame = Frame::from_rgb24(&[0; 12], 2, 2)?;
//! if motion_detected {
//!     dvr.activate(Some(Duration::from_secs(10)))?;
//! }
//! dvr.submit_frame(&frame)?; // recorded only while the window is open
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod clock;
pub mod config;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod naming;
pub mod resolution;
pub mod session;
pub mod transform;

pub use actor::{ActorConfig, ActorJoin, SessionActor, SessionHandle};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DvrConfig, EncoderKind};
#[cfg(feature = "encode-ffmpeg")]
pub use encoder::FfmpegEncoder;
pub use encoder::{ClipWriter, EncodeError, EncodeResult, FrameEncoder, MjpegEncoder};
pub use error::{RecorderError, Result};
pub use frame::{Frame, PixelLayout};
pub use resolution::Resolution;
pub use session::{
    ClipSummary, DropReason, FrameDisposition, OpenPolicy, RecordingSession, SessionConfig,
    SessionState, SessionStats,
};
pub use transform::{CenterCrop, FrameTransform, Letterbox, Resize};
