//! dvr_demo - scripted walk through the recording window lifecycle
//!
//! Replays a fixed trigger/frame script against a recording session:
//! activation, window expiry, re-activation with a shorter window, an explicit
//! stop, and a final window that expires on its own. By default time is
//! simulated with a manual clock; `--realtime` sleeps for real.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use triggered_dvr::{
    ClipSummary, Clock, DvrConfig, EncoderKind, Frame, FrameEncoder, ManualClock, MjpegEncoder,
    RecordingSession, Resolution,
};

const SYNTHETIC_WIDTH: u32 = 640;
const SYNTHETIC_HEIGHT: u32 = 480;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Output directory for clips (overrides DVR_OUTPUT_DIR / config file).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Output resolution: 480p, 720p or 1080p.
    #[arg(long)]
    resolution: Option<String>,
    /// Default recording window in seconds (overrides DVR_DURATION_SECS / config file).
    #[arg(long)]
    duration: Option<f64>,
    /// Frames per second written into the clip header.
    #[arg(long)]
    fps: Option<u32>,
    /// Image files used as frames, cycled in order. Synthetic frames if omitted.
    #[arg(long = "image", value_name = "PATH")]
    images: Vec<PathBuf>,
    /// Sleep in real time instead of advancing a simulated clock.
    #[arg(long)]
    realtime: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = DvrConfig::load()?;
    if let Some(out) = &args.out {
        cfg.output_dir = out.clone();
    }
    if let Some(resolution) = &args.resolution {
        cfg.resolution = Resolution::from_key(resolution)?;
    }
    if let Some(fps) = args.fps {
        if fps == 0 {
            return Err(anyhow!("fps must be >= 1"));
        }
        cfg.frame_rate = fps;
    }
    if let Some(duration) = args.duration {
        cfg.default_duration = parse_duration(duration)?;
    }

    stage("load frames");
    let frames = load_frames(&args.images)?;

    stage("run trigger script");
    let clips = match cfg.encoder.kind {
        EncoderKind::Mjpeg => run_with_encoder(
            &cfg,
            MjpegEncoder::with_quality(cfg.encoder.quality),
            &frames,
            args.realtime,
        )?,
        #[cfg(feature = "encode-ffmpeg")]
        EncoderKind::Ffmpeg => run_with_encoder(
            &cfg,
            triggered_dvr::FfmpegEncoder::default(),
            &frames,
            args.realtime,
        )?,
        #[cfg(not(feature = "encode-ffmpeg"))]
        EncoderKind::Ffmpeg => {
            return Err(anyhow!("ffmpeg encoder requires the encode-ffmpeg feature"))
        }
    };

    for clip in &clips {
        println!("{} ({} frames)", clip.path.display(), clip.frames);
    }
    println!("{} clips written to {}", clips.len(), cfg.output_dir.display());
    Ok(())
}

fn run_with_encoder<E: FrameEncoder>(
    cfg: &DvrConfig,
    encoder: E,
    frames: &[Frame],
    realtime: bool,
) -> Result<Vec<ClipSummary>> {
    if realtime {
        let mut session = RecordingSession::new(cfg.session_config(), encoder)?;
        run_script(&mut session, frames, &mut std::thread::sleep)
    } else {
        let clock = ManualClock::new();
        let mut session =
            RecordingSession::with_clock(cfg.session_config(), encoder, clock.clone())?;
        run_script(&mut session, frames, &mut |by| clock.advance(by))
    }
}

/// The trigger script. Returns every clip finalized along the way.
fn run_script<E: FrameEncoder, C: Clock>(
    session: &mut RecordingSession<E, C>,
    frames: &[Frame],
    wait: &mut dyn FnMut(Duration),
) -> Result<Vec<ClipSummary>> {
    let mut clips: Vec<ClipSummary> = Vec::new();
    let mut next_frame = 0usize;
    let mut submit = |session: &mut RecordingSession<E, C>, count: usize| -> Result<()> {
        for _ in 0..count {
            let frame = &frames[next_frame % frames.len()];
            next_frame += 1;
            let disposition = session.submit_frame(frame)?;
            log::info!("frame {} -> {:?}", next_frame, disposition);
        }
        Ok(())
    };

    session.activate(None)?;
    submit(session, 4)?;
    wait(Duration::from_secs(10));
    submit(session, 3)?;
    collect(session, &mut clips);

    session.activate(Some(Duration::from_secs(2)))?;
    submit(session, 2)?;
    session.stop_recording();
    collect(session, &mut clips);
    submit(session, 1)?;

    session.activate(None)?;
    submit(session, 2)?;
    wait(Duration::from_secs(7));
    submit(session, 2)?;
    collect(session, &mut clips);

    let stats = session.stats();
    log::info!(
        "activations={} written={} dropped={} clips={}",
        stats.activations,
        stats.frames_written,
        stats.frames_dropped,
        stats.clips_finalized
    );
    Ok(clips)
}

fn collect<E: FrameEncoder, C: Clock>(
    session: &RecordingSession<E, C>,
    clips: &mut Vec<ClipSummary>,
) {
    if let Some(last) = session.last_clip() {
        if clips.last() != Some(last) {
            clips.push(last.clone());
        }
    }
}

fn load_frames(paths: &[PathBuf]) -> Result<Vec<Frame>> {
    if paths.is_empty() {
        return (0..2u64).map(synthetic_frame).collect();
    }
    paths
        .iter()
        .map(|path| Frame::load(path).map_err(anyhow::Error::from))
        .collect()
}

fn synthetic_frame(seed: u64) -> Result<Frame> {
    let pixel_count = (SYNTHETIC_WIDTH * SYNTHETIC_HEIGHT * 3) as usize;
    let mut pixels = vec![0u8; pixel_count];
    for (i, pixel) in pixels.iter_mut().enumerate() {
        *pixel = ((i as u64 / 3 + seed * 97) % 256) as u8;
    }
    Ok(Frame::from_rgb24(&pixels, SYNTHETIC_WIDTH, SYNTHETIC_HEIGHT)?)
}

fn parse_duration(secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(anyhow!("duration must be a positive number of seconds"));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| anyhow!("duration out of range: {}", e))
}

fn stage(msg: &str) {
    eprintln!("dvr_demo: {}", msg);
}
