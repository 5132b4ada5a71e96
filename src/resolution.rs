use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::RecorderError;

/// Output resolution of a recording session.
///
/// Only the three broadcast presets are accepted. 480p is 858 wide to keep
/// a 16:9 aspect with an even width.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Resolution {
    #[default]
    P480,
    P720,
    P1080,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [Resolution::P480, Resolution::P720, Resolution::P1080];

    pub fn from_key(key: &str) -> Result<Self, RecorderError> {
        match key.trim().to_ascii_lowercase().as_str() {
            "480p" => Ok(Resolution::P480),
            "720p" => Ok(Resolution::P720),
            "1080p" => Ok(Resolution::P1080),
            other => Err(RecorderError::Configuration(format!(
                "invalid resolution '{}'; expected one of 480p, 720p, 1080p",
                other
            ))),
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Resolution::P480 => "480p",
            Resolution::P720 => "720p",
            Resolution::P1080 => "1080p",
        }
    }

    /// (width, height) in pixels.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Resolution::P480 => (858, 480),
            Resolution::P720 => (1280, 720),
            Resolution::P1080 => (1920, 1080),
        }
    }

    pub fn width(self) -> u32 {
        self.dimensions().0
    }

    pub fn height(self) -> u32 {
        self.dimensions().1
    }
}

impl FromStr for Resolution {
    type Err = RecorderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s)
    }
}

impl TryFrom<String> for Resolution {
    type Error = RecorderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_key(&value)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
