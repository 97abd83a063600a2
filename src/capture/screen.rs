//! Desktop screen grab through an external capture program

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, instrument};

use super::frame::Frame;
use super::FrameSource;
use crate::error::CaptureError;
use crate::ScreenConfig;

const NAME: &str = "screen";
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Runs the configured command once per frame and loads the image it writes.
pub struct ScreenGrab {
    program: String,
    args: Vec<String>,
    path: PathBuf,
    sequence: u64,
}

impl ScreenGrab {
    /// `{path}` in the command arguments is replaced with the capture file path.
    #[instrument(skip(config), fields(command = ?config.command))]
    pub fn open(config: ScreenConfig) -> Result<Self, CaptureError> {
        let mut command = config.command.into_iter();
        let program = command
            .next()
            .ok_or_else(|| CaptureError::unavailable(NAME, "empty capture command"))?;
        let path_str = config.capture_path.to_string_lossy().into_owned();
        let args = command.map(|a| a.replace("{path}", &path_str)).collect();

        Ok(Self {
            program,
            args,
            path: config.capture_path,
            sequence: 0,
        })
    }

    fn wait(&self, mut child: Child, timeout: Duration) -> Result<(), CaptureError> {
        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) if status.success() => return Ok(()),
                Ok(Some(status)) => {
                    return Err(CaptureError::device(
                        NAME,
                        format!("{} exited with {}", self.program, status),
                    ))
                }
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CaptureError::Timeout {
                        name: NAME.to_owned(),
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(CaptureError::device(NAME, e)),
            }
        }
    }
}

impl FrameSource for ScreenGrab {
    fn name(&self) -> &str {
        NAME
    }

    fn read(&mut self, timeout: Duration) -> Result<Frame, CaptureError> {
        let timestamp = Instant::now();
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CaptureError::device(NAME, e))?;
        self.wait(child, timeout)?;

        let image = image::open(&self.path)
            .map_err(|e| CaptureError::Decode {
                name: NAME.to_owned(),
                format: "PNG".to_owned(),
                reason: e.to_string(),
            })?
            .to_rgb8();
        let (width, height) = image.dimensions();

        self.sequence += 1;
        let mut frame =
            Frame::rgb(width, height, image.into_raw()).map_err(|e| CaptureError::device(NAME, e))?;
        let meta = std::sync::Arc::make_mut(&mut frame.meta);
        meta.sequence = self.sequence;
        frame.timestamp = timestamp;
        Ok(frame)
    }

    fn close(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!("Capture file {:?} not removed: {}", self.path, e);
        }
    }
}
