//! Artifact naming.
//!
//! Clips are named `recording-YYYY-MM-DD--HH-MM-SS.<ext>` after the local
//! time their window opened. Two clips opened within the same second get a
//! numeric suffix (`-1`, `-2`, ...) so an earlier clip is never overwritten.

use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::path::{Path, PathBuf};

pub const CLIP_PREFIX: &str = "recording-";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d--%H-%M-%S";

pub fn clip_stem<Tz>(wall: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("{}{}", CLIP_PREFIX, wall.format(TIMESTAMP_FORMAT))
}

pub fn clip_file_name<Tz>(wall: &DateTime<Tz>, extension: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("{}.{}", clip_stem(wall), extension)
}

/// First path under `dir` for a clip opened at `wall` that does not exist yet.
pub fn next_clip_path<Tz>(dir: &Path, wall: &DateTime<Tz>, extension: &str) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let stem = clip_stem(wall);
    let mut path = dir.join(clip_file_name(wall, extension));
    let mut counter = 1u32;
    while path.exists() {
        path = dir.join(format!("{}-{}.{}", stem, counter, extension));
        counter += 1;
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 2)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn file_name_uses_double_dash_separator() {
        assert_eq!(
            clip_file_name(&fixed_time(), "mjpeg"),
            "recording-2024-03-09--07-05-02.mjpeg"
        );
    }

    #[test]
    fn existing_names_get_counter_suffix() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let wall = fixed_time();

        let first = next_clip_path(dir.path(), &wall, "mp4");
        assert_eq!(
            first.file_name().and_then(|n| n.to_str()),
            Some("recording-2024-03-09--07-05-02.mp4")
        );
        std::fs::write(&first, b"")?;

        let second = next_clip_path(dir.path(), &wall, "mp4");
        assert_eq!(
            second.file_name().and_then(|n| n.to_str()),
            Some("recording-2024-03-09--07-05-02-1.mp4")
        );
        std::fs::write(&second, b"")?;

        let third = next_clip_path(dir.path(), &wall, "mp4");
        assert!(third.ends_with("recording-2024-03-09--07-05-02-2.mp4"));
        Ok(())
    }
}
