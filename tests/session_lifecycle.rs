use std::path::{Path, PathBuf};
use std::time::Duration;

use image::{Rgb, RgbImage};
use tempfile::TempDir;

use triggered_dvr::{
    ClipSummary, DropReason, Frame, FrameDisposition, Letterbox, ManualClock, MjpegEncoder,
    OpenPolicy, RecorderError, RecordingSession, Resolution, SessionConfig, SessionState,
};

type Session = RecordingSession<MjpegEncoder, ManualClock>;

fn setup(policy: OpenPolicy) -> (Session, ManualClock, TempDir) {
    setup_with_default(policy, Duration::from_secs(10))
}

fn setup_with_default(
    policy: OpenPolicy,
    default_duration: Duration,
) -> (Session, ManualClock, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let clock = ManualClock::new();
    let config = SessionConfig {
        resolution: Resolution::P480,
        frame_rate: 2,
        output_dir: dir.path().to_path_buf(),
        default_duration,
        open_policy: policy,
    };
    let session = RecordingSession::with_clock(config, MjpegEncoder::new(), clock.clone())
        .expect("session");
    (session, clock, dir)
}

fn frame() -> Frame {
    Frame::from_image(RgbImage::from_pixel(320, 240, Rgb([40, 90, 160])))
}

fn clips_in(dir: &Path) -> Vec<PathBuf> {
    let mut clips: Vec<PathBuf> = std::fs::read_dir(dir)
        .expect("read output dir")
        .map(|entry| entry.expect("dir entry").path())
        .collect();
    clips.sort();
    clips
}

fn jpeg_count(path: &Path) -> usize {
    let bytes = std::fs::read(path).expect("read clip");
    bytes
        .windows(3)
        .filter(|w| w[0] == 0xFF && w[1] == 0xD8 && w[2] == 0xFF)
        .count()
}

#[test]
fn frames_before_any_activation_are_dropped() {
    let (mut session, _clock, dir) = setup(OpenPolicy::Eager);

    let disposition = session.submit_frame(&frame()).unwrap();

    assert_eq!(disposition, FrameDisposition::Dropped(DropReason::Idle));
    assert_eq!(session.state(), SessionState::Idle);
    assert!(clips_in(dir.path()).is_empty());
}

#[test]
fn expired_window_finalizes_and_next_activation_starts_new_clip() {
    let (mut session, clock, dir) = setup(OpenPolicy::Eager);

    session.activate(Some(Duration::from_secs(5))).unwrap();
    clock.set_elapsed(Duration::from_secs(1));
    assert!(session.submit_frame(&frame()).unwrap().is_written());
    let first = session.current_clip().map(Path::to_path_buf).unwrap();

    clock.set_elapsed(Duration::from_secs(6));
    assert_eq!(
        session.submit_frame(&frame()).unwrap(),
        FrameDisposition::Dropped(DropReason::Expired)
    );
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.last_clip().map(|c| c.frames), Some(1));

    clock.set_elapsed(Duration::from_secs(7));
    session.activate(Some(Duration::from_secs(5))).unwrap();
    assert!(session.submit_frame(&frame()).unwrap().is_written());
    let second = session.current_clip().map(Path::to_path_buf).unwrap();
    session.stop_recording();

    assert_ne!(first, second);
    assert_eq!(clips_in(dir.path()), {
        let mut both = vec![first.clone(), second.clone()];
        both.sort();
        both
    });
    assert_eq!(jpeg_count(&first), 1);
    assert_eq!(jpeg_count(&second), 1);
}

#[test]
fn expired_frame_is_dropped_and_short_reactivation_writes_new_clip() {
    let (mut session, clock, dir) =
        setup_with_default(OpenPolicy::Eager, Duration::from_secs(5));

    // t=0: activate with the 5s default.
    session.activate(None).unwrap();
    let first = session.current_clip().map(Path::to_path_buf).unwrap();

    // t=1: frame A is recorded.
    clock.set_elapsed(Duration::from_secs(1));
    assert!(session.submit_frame(&frame()).unwrap().is_written());

    // t=6: frame B arrives after the deadline and closes the clip.
    clock.set_elapsed(Duration::from_secs(6));
    assert_eq!(
        session.submit_frame(&frame()).unwrap(),
        FrameDisposition::Dropped(DropReason::Expired)
    );
    assert!(session.current_clip().is_none());

    // t=6: activate(2); t=7: frame C goes to a new clip.
    session.activate(Some(Duration::from_secs(2))).unwrap();
    clock.set_elapsed(Duration::from_secs(7));
    assert!(session.submit_frame(&frame()).unwrap().is_written());
    let second = session.current_clip().map(Path::to_path_buf).unwrap();
    session.stop_recording();

    assert_ne!(first, second);
    assert_eq!(clips_in(dir.path()).len(), 2);
    assert_eq!(jpeg_count(&first), 1);
    assert_eq!(jpeg_count(&second), 1);
}

#[test]
fn second_activation_decides_whether_late_frame_is_kept() {
    // d2 > d1 + 1: the frame at d1 + 1 is inside the replaced window.
    let (mut session, clock, dir) = setup(OpenPolicy::Eager);
    session.activate(Some(Duration::from_secs(2))).unwrap();
    session.activate(Some(Duration::from_secs(5))).unwrap();
    clock.set_elapsed(Duration::from_secs(3));
    assert!(session.submit_frame(&frame()).unwrap().is_written());
    session.stop_recording();
    assert_eq!(clips_in(dir.path()).len(), 1);

    // d2 < d1 + 1: the shorter second window has already closed.
    let (mut session, clock, dir) = setup(OpenPolicy::Eager);
    session.activate(Some(Duration::from_secs(5))).unwrap();
    session.activate(Some(Duration::from_secs(2))).unwrap();
    clock.set_elapsed(Duration::from_secs(6));
    assert_eq!(
        session.submit_frame(&frame()).unwrap(),
        FrameDisposition::Dropped(DropReason::Expired)
    );
    let clips = clips_in(dir.path());
    assert_eq!(clips.len(), 1);
    assert_eq!(jpeg_count(&clips[0]), 0);
}

#[test]
fn reactivation_replaces_deadline_and_keeps_clip() {
    let (mut session, clock, dir) = setup(OpenPolicy::Eager);

    session.activate(Some(Duration::from_secs(10))).unwrap();
    let clip = session.current_clip().map(Path::to_path_buf).unwrap();

    clock.set_elapsed(Duration::from_secs(2));
    session.activate(Some(Duration::from_secs(2))).unwrap();
    assert_eq!(session.current_clip(), Some(clip.as_path()));

    // New deadline is 2 + 2 = 4s, not the first 10s.
    clock.set_elapsed(Duration::from_millis(3_900));
    assert!(session.submit_frame(&frame()).unwrap().is_written());
    clock.set_elapsed(Duration::from_secs(4));
    assert_eq!(
        session.submit_frame(&frame()).unwrap(),
        FrameDisposition::Dropped(DropReason::Expired)
    );

    assert_eq!(clips_in(dir.path()), vec![clip.clone()]);
    assert_eq!(jpeg_count(&clip), 1);
}

#[test]
fn reactivation_can_extend_window() {
    let (mut session, clock, _dir) = setup(OpenPolicy::Eager);

    session.activate(Some(Duration::from_secs(2))).unwrap();
    clock.set_elapsed(Duration::from_secs(1));
    session.activate(Some(Duration::from_secs(5))).unwrap();

    clock.set_elapsed(Duration::from_secs(5));
    assert!(session.submit_frame(&frame()).unwrap().is_written());
    assert_eq!(session.remaining(), Some(Duration::from_secs(1)));
}

#[test]
fn expiry_is_lazy_until_the_session_is_touched() {
    let (mut session, clock, _dir) = setup(OpenPolicy::Eager);

    session.activate(Some(Duration::from_secs(1))).unwrap();
    clock.set_elapsed(Duration::from_secs(30));

    // Nothing observed the deadline yet; the clip is still open.
    assert!(session.current_clip().is_some());
    assert!(!session.is_window_active());
    assert!(session.last_clip().is_none());

    let summary = session.check_expiry().expect("expired clip");
    assert_eq!(summary.frames, 0);
    assert!(session.current_clip().is_none());
}

#[test]
fn activating_after_unobserved_expiry_opens_fresh_clip() {
    let (mut session, clock, dir) = setup(OpenPolicy::Eager);

    session.activate(Some(Duration::from_secs(1))).unwrap();
    session.submit_frame(&frame()).unwrap();
    let stale = session.current_clip().map(Path::to_path_buf).unwrap();

    clock.set_elapsed(Duration::from_secs(5));
    session.activate(None).unwrap();
    let fresh = session.current_clip().map(Path::to_path_buf).unwrap();

    assert_ne!(stale, fresh);
    assert_eq!(session.last_clip().map(|c| c.path.clone()), Some(stale));
    assert_eq!(session.active_duration(), Duration::from_secs(10));
    session.stop_recording();
    assert_eq!(clips_in(dir.path()).len(), 2);
}

#[test]
fn stop_recording_is_idempotent() {
    let (mut session, _clock, _dir) = setup(OpenPolicy::Eager);

    assert!(session.stop_recording().is_none());

    session.activate(None).unwrap();
    session.submit_frame(&frame()).unwrap();
    let summary: ClipSummary = session.stop_recording().expect("clip finalized");
    assert_eq!(summary.frames, 1);

    assert!(session.stop_recording().is_none());
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.stats().clips_finalized, 1);
    assert_eq!(
        session.submit_frame(&frame()).unwrap(),
        FrameDisposition::Dropped(DropReason::Idle)
    );
}

#[test]
fn eager_policy_leaves_empty_clip_for_unused_window() {
    let (mut session, clock, dir) = setup(OpenPolicy::Eager);

    session.activate(Some(Duration::from_secs(1))).unwrap();
    clock.set_elapsed(Duration::from_secs(2));
    session.check_expiry();

    let clips = clips_in(dir.path());
    assert_eq!(clips.len(), 1);
    assert_eq!(std::fs::metadata(&clips[0]).unwrap().len(), 0);
}

#[test]
fn deferred_policy_creates_nothing_for_unused_window() {
    let (mut session, clock, dir) = setup(OpenPolicy::OnFirstFrame);

    session.activate(Some(Duration::from_secs(1))).unwrap();
    assert_eq!(session.state(), SessionState::WindowOpen);
    clock.set_elapsed(Duration::from_secs(2));
    assert_eq!(
        session.submit_frame(&frame()).unwrap(),
        FrameDisposition::Dropped(DropReason::Expired)
    );

    assert!(clips_in(dir.path()).is_empty());
    assert_eq!(session.stats().clips_opened, 0);
}

#[test]
fn windows_in_the_same_second_get_distinct_clips() {
    let (mut session, _clock, dir) = setup(OpenPolicy::Eager);

    for _ in 0..3 {
        session.activate(None).unwrap();
        session.submit_frame(&frame()).unwrap();
        session.stop_recording();
    }

    let clips = clips_in(dir.path());
    assert_eq!(clips.len(), 3);
    let names: Vec<String> = clips
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().all(|n| n.starts_with("recording-")));
    assert!(names.iter().all(|n| n.ends_with(".mjpeg")));
    assert!(names.iter().any(|n| n.ends_with("-1.mjpeg")));
    assert!(names.iter().any(|n| n.ends_with("-2.mjpeg")));
    for clip in &clips {
        assert_eq!(jpeg_count(clip), 1);
    }
}

#[test]
fn letterbox_transform_is_applied_before_write() {
    let (session, _clock, dir) = setup(OpenPolicy::Eager);
    let mut session = session.with_transform(Letterbox::default());

    session.activate(None).unwrap();
    assert!(session.submit_frame(&frame()).unwrap().is_written());
    let summary = session.stop_recording().unwrap();

    let bytes = std::fs::read(&summary.path).unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (858, 480));
    assert_eq!(clips_in(dir.path()).len(), 1);
}

#[test]
fn unusable_output_dir_is_a_configuration_error() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let config = SessionConfig {
        output_dir: file.path().join("clips"),
        ..SessionConfig::default()
    };

    let err = RecordingSession::new(config, MjpegEncoder::new())
        .err()
        .expect("construction must fail");

    assert!(matches!(err, RecorderError::Configuration(_)));
}

#[test]
fn stats_track_the_whole_lifecycle() {
    let (mut session, clock, _dir) = setup(OpenPolicy::Eager);

    session.submit_frame(&frame()).unwrap();
    session.activate(Some(Duration::from_secs(2))).unwrap();
    session.submit_frame(&frame()).unwrap();
    session.submit_frame(&frame()).unwrap();
    clock.advance(Duration::from_secs(3));
    session.submit_frame(&frame()).unwrap();

    let stats = session.stats();
    assert_eq!(stats.activations, 1);
    assert_eq!(stats.frames_written, 2);
    assert_eq!(stats.frames_dropped, 2);
    assert_eq!(stats.clips_opened, 1);
    assert_eq!(stats.clips_finalized, 1);
    assert_eq!(stats.write_errors, 0);
}
