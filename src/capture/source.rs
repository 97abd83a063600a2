//! Frame source contract and the start-up choice of secondary source

use std::time::Duration;

use tracing::{info, warn};

use super::pattern::TestPattern;
use super::screen::ScreenGrab;
use super::Frame;
use crate::error::CaptureError;
use crate::{CameraConfig, PrimaryKind, ScreenConfig};

/// A producer of frames. Opening is done by each implementation's constructor.
pub trait FrameSource {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Delivers the next frame, normalised to RGB24. Waiting longer than
    /// `timeout` is reported as [`CaptureError::Timeout`].
    fn read(&mut self, timeout: Duration) -> Result<Frame, CaptureError>;

    /// Releases the underlying device. Called once by the owner.
    fn close(&mut self);
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn read(&mut self, timeout: Duration) -> Result<Frame, CaptureError> {
        (**self).read(timeout)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Opens the primary source named by `config.source`.
pub fn open_primary(config: &CameraConfig) -> Result<Box<dyn FrameSource>, CaptureError> {
    match config.source {
        PrimaryKind::Pattern => {
            let pattern = TestPattern::open("camera-pattern", config.width, config.height)
                .map_err(|e| CaptureError::unavailable("camera-pattern", e))?;
            Ok(Box::new(pattern))
        }
        PrimaryKind::Camera => open_camera(config),
    }
}

#[cfg(feature = "v4l2-capture")]
fn open_camera(config: &CameraConfig) -> Result<Box<dyn FrameSource>, CaptureError> {
    let mut config = config.clone();
    if config.device.is_empty() {
        let found = crate::utils::auto_detect_device()?;
        config.device = found.path;
        config.format = found.format;
    }
    Ok(Box::new(super::V4l2Capture::open(config)?))
}

#[cfg(not(feature = "v4l2-capture"))]
fn open_camera(_config: &CameraConfig) -> Result<Box<dyn FrameSource>, CaptureError> {
    Err(CaptureError::unavailable(
        "camera",
        "built without the v4l2-capture feature",
    ))
}

/// Secondary (overlay) producer, picked once at start-up by [`probe_secondary`].
pub enum SecondarySource {
    /// Desktop screen grab through an external capture program.
    Screen(ScreenGrab),
    /// Synthetic pattern used when no screen capture program is installed.
    Pattern(TestPattern),
}

/// Chooses the screen grab when its capture program resolves to an executable,
/// the test pattern otherwise.
pub fn probe_secondary(config: &ScreenConfig) -> Result<SecondarySource, CaptureError> {
    let program = config.command.first().map(String::as_str).unwrap_or("");

    if !program.is_empty() && which::which(program).is_ok() {
        info!("Screen capture via {}", program);
        return Ok(SecondarySource::Screen(ScreenGrab::open(config.clone())?));
    }

    warn!(
        "Screen capture program {:?} not found, overlaying a test pattern",
        program
    );
    let pattern = TestPattern::open(
        "screen-pattern",
        config.fallback_width,
        config.fallback_height,
    )
    .map_err(|e| CaptureError::unavailable("screen-pattern", e))?;
    Ok(SecondarySource::Pattern(pattern))
}

impl FrameSource for SecondarySource {
    fn name(&self) -> &str {
        match self {
            SecondarySource::Screen(s) => s.name(),
            SecondarySource::Pattern(p) => p.name(),
        }
    }

    fn read(&mut self, timeout: Duration) -> Result<Frame, CaptureError> {
        match self {
            SecondarySource::Screen(s) => s.read(timeout),
            SecondarySource::Pattern(p) => p.read(timeout),
        }
    }

    fn close(&mut self) {
        match self {
            SecondarySource::Screen(s) => s.close(),
            SecondarySource::Pattern(p) => p.close(),
        }
    }
}
