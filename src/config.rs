use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::actor::ActorConfig;
use crate::encoder::mjpeg::DEFAULT_JPEG_QUALITY;
use crate::resolution::Resolution;
use crate::session::{
    OpenPolicy, SessionConfig, DEFAULT_DURATION, DEFAULT_FRAME_RATE, DEFAULT_OUTPUT_DIR,
};

#[derive(Debug, Deserialize, Default)]
struct DvrConfigFile {
    resolution: Option<String>,
    output_dir: Option<PathBuf>,
    frame_rate: Option<u32>,
    duration_secs: Option<f64>,
    open_policy: Option<OpenPolicy>,
    encoder: Option<EncoderConfigFile>,
    expiry_poll_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct EncoderConfigFile {
    kind: Option<EncoderKind>,
    quality: Option<u8>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderKind {
    #[default]
    Mjpeg,
    Ffmpeg,
}

#[derive(Debug, Clone)]
pub struct DvrConfig {
    pub resolution: Resolution,
    pub output_dir: PathBuf,
    pub frame_rate: u32,
    pub default_duration: Duration,
    pub open_policy: OpenPolicy,
    pub encoder: EncoderSettings,
    pub expiry_poll: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct EncoderSettings {
    pub kind: EncoderKind,
    pub quality: u8,
}

impl Default for DvrConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            frame_rate: DEFAULT_FRAME_RATE,
            default_duration: DEFAULT_DURATION,
            open_policy: OpenPolicy::default(),
            encoder: EncoderSettings {
                kind: EncoderKind::default(),
                quality: DEFAULT_JPEG_QUALITY,
            },
            expiry_poll: None,
        }
    }
}

impl DvrConfig {
    /// Load from `DVR_CONFIG` (if set), then apply `DVR_*` overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("DVR_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: DvrConfigFile) -> Result<Self> {
        let defaults = Self::default();
        let resolution = match file.resolution.as_deref() {
            Some(key) => Resolution::from_key(key)?,
            None => defaults.resolution,
        };
        let default_duration = match file.duration_secs {
            Some(secs) => duration_from_secs(secs)?,
            None => defaults.default_duration,
        };
        let encoder = EncoderSettings {
            kind: file
                .encoder
                .as_ref()
                .and_then(|encoder| encoder.kind)
                .unwrap_or(defaults.encoder.kind),
            quality: file
                .encoder
                .as_ref()
                .and_then(|encoder| encoder.quality)
                .unwrap_or(defaults.encoder.quality),
        };
        Ok(Self {
            resolution,
            output_dir: file.output_dir.unwrap_or(defaults.output_dir),
            frame_rate: file.frame_rate.unwrap_or(defaults.frame_rate),
            default_duration,
            open_policy: file.open_policy.unwrap_or(defaults.open_policy),
            encoder,
            expiry_poll: file.expiry_poll_ms.map(Duration::from_millis),
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(resolution) = non_empty_env("DVR_RESOLUTION") {
            self.resolution = Resolution::from_key(&resolution)?;
        }
        if let Some(dir) = non_empty_env("DVR_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(rate) = non_empty_env("DVR_FRAME_RATE") {
            self.frame_rate = rate.trim().parse().map_err(|_| {
                anyhow!("DVR_FRAME_RATE must be a whole number of frames per second")
            })?;
        }
        if let Some(duration) = non_empty_env("DVR_DURATION_SECS") {
            let secs: f64 = duration
                .trim()
                .parse()
                .map_err(|_| anyhow!("DVR_DURATION_SECS must be a number of seconds"))?;
            self.default_duration = duration_from_secs(secs)?;
        }
        if let Some(policy) = non_empty_env("DVR_OPEN_POLICY") {
            self.open_policy = policy.parse()?;
        }
        if let Some(poll) = non_empty_env("DVR_EXPIRY_POLL_MS") {
            let millis: u64 = poll.trim().parse().map_err(|_| {
                anyhow!("DVR_EXPIRY_POLL_MS must be an integer number of milliseconds")
            })?;
            self.expiry_poll = Some(Duration::from_millis(millis));
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.session_config().validate()?;
        if !(1..=100).contains(&self.encoder.quality) {
            return Err(anyhow!("encoder quality must be between 1 and 100"));
        }
        if self.expiry_poll.is_some_and(|poll| poll.is_zero()) {
            return Err(anyhow!("expiry poll interval must be greater than zero"));
        }
        if self.encoder.kind == EncoderKind::Ffmpeg && !cfg!(feature = "encode-ffmpeg") {
            return Err(anyhow!("ffmpeg encoder requires the encode-ffmpeg feature"));
        }
        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            resolution: self.resolution,
            frame_rate: self.frame_rate,
            output_dir: self.output_dir.clone(),
            default_duration: self.default_duration,
            open_policy: self.open_policy,
        }
    }

    pub fn actor_config(&self) -> ActorConfig {
        ActorConfig {
            expiry_poll: self.expiry_poll,
        }
    }
}

fn read_config_file(path: &Path) -> Result<DvrConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn duration_from_secs(secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(anyhow!("duration must be a positive number of seconds"));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| anyhow!("duration out of range: {}", e))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}
