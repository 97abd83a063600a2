pub mod capture;
pub mod control;
pub mod display;
pub mod error;
pub mod pipeline;
pub mod utils;

use std::path::{Path, PathBuf};

use capture::frame::PixelFormat;
use serde::{Deserialize, Serialize};

use crate::control::SliderPositions;
use crate::error::{ConfigError, DimensionError};

/// Environment variables override file settings, e.g. `AR_OVERLAY_CAMERA__WIDTH=1280`.
pub const ENV_PREFIX: &str = "AR_OVERLAY";

/// System configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub camera: CameraConfig,
    pub screen: ScreenConfig,
    pub display: DisplayConfig,
    pub pipeline: PipelineConfig,
    pub controls: SliderPositions,
}

/// Where primary frames come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryKind {
    Camera,
    Pattern,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub source: PrimaryKind,
    /// Empty means auto-detect
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub buffer_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Program and arguments; `{path}` is replaced with `capture_path`
    pub command: Vec<String>,
    pub capture_path: PathBuf,
    /// Size of the test pattern used when the program is missing
    pub fallback_width: u32,
    pub fallback_height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub window_title: String,
    pub toggle_key: char,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub capture_timeout_ms: u64,
    pub max_capture_failures: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: PrimaryKind::Camera,
            device: "/dev/video0".into(),
            width: 1920,
            height: 1080,
            format: PixelFormat::Mjpeg,
            buffer_count: 4,
        }
    }
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            command: vec!["scrot".into(), "-o".into(), "{path}".into()],
            capture_path: std::env::temp_dir().join("ar-overlay-screen.png"),
            fallback_width: 1920,
            fallback_height: 1080,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            window_title: "AR View".into(),
            toggle_key: 's',
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capture_timeout_ms: 1_000,
            max_capture_failures: 3,
        }
    }
}

impl Config {
    /// Defaults, then the optional TOML file, then `AR_OVERLAY_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Config::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let camera = &self.camera;
        if camera.width == 0 || camera.height == 0 {
            return Err(DimensionError {
                width: camera.width,
                height: camera.height,
            }
            .into());
        }
        if self.screen.fallback_width == 0 || self.screen.fallback_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "screen fallback size {}x{}",
                self.screen.fallback_width, self.screen.fallback_height
            )));
        }
        if camera.buffer_count == 0 {
            return Err(ConfigError::Invalid("camera buffer_count must be > 0".into()));
        }
        if self.pipeline.capture_timeout_ms == 0 {
            return Err(ConfigError::Invalid("capture_timeout_ms must be > 0".into()));
        }
        Ok(())
    }
}
