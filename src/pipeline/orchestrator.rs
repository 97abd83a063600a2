//! Frame loop: capture → adjust → align → blend → tick → compose → display

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use super::adjust::adjust;
use super::align::align;
use super::blend::blend;
use super::fps::FpsEstimator;
use super::params::ParameterStore;
use super::stop::StopSignal;
use crate::capture::FrameSource;
use crate::display::{compose, DisplaySink, KeyCode};
use crate::error::{CaptureError, DisplayError, PipelineError};
use crate::Config;

/// Lifecycle of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Initializing,
    Running,
    Stopping,
    Stopped,
}

/// Why a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The stop signal was raised
    Requested,
    /// Quit key or window close
    UserQuit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub exit: ExitReason,
    pub fps: f64,
}

/// Loop settings taken from [`Config`].
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub window: String,
    pub toggle_key: char,
    pub capture_timeout: Duration,
    /// Consecutive capture failures tolerated before the run is aborted. At least 1.
    pub max_capture_failures: u32,
}

impl LoopSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            window: config.display.window_title.clone(),
            toggle_key: config.display.toggle_key.to_ascii_lowercase(),
            capture_timeout: Duration::from_millis(config.pipeline.capture_timeout_ms),
            max_capture_failures: config.pipeline.max_capture_failures.max(1),
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

enum Flow {
    Continue,
    Quit,
}

/// Sources, sink and FPS window owned by one run. Released exactly once,
/// on the normal path or when dropped during unwinding.
struct PipelineState<P: FrameSource, S: FrameSource, D: DisplaySink> {
    primary: P,
    secondary: S,
    display: D,
    fps: FpsEstimator,
    frames: u64,
    placed_at: Option<(u32, u32)>,
    released: bool,
}

impl<P: FrameSource, S: FrameSource, D: DisplaySink> PipelineState<P, S, D> {
    fn release(&mut self) {
        if std::mem::replace(&mut self.released, true) {
            return;
        }
        self.primary.close();
        self.secondary.close();
        self.display.destroy_all();
        debug!("Pipeline resources released");
    }
}

impl<P: FrameSource, S: FrameSource, D: DisplaySink> Drop for PipelineState<P, S, D> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Drives the compositing loop. Parameters are read from the shared store
/// once per iteration; nothing else is shared with other threads.
pub struct Orchestrator {
    store: Arc<ParameterStore>,
    stop: StopSignal,
    settings: LoopSettings,
    stage: PipelineStage,
}

impl Orchestrator {
    pub fn new(store: Arc<ParameterStore>, stop: StopSignal, settings: LoopSettings) -> Self {
        Self {
            store,
            stop,
            settings,
            stage: PipelineStage::Initializing,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    fn transition(&mut self, next: PipelineStage) {
        info!(from = ?self.stage, to = ?next, "Pipeline stage");
        self.stage = next;
    }

    /// Acquires the sources and the display, runs until stopped and
    /// releases everything on every exit path.
    ///
    /// A failure while acquiring releases whatever was already acquired and
    /// ends in `Stopped` without ever entering `Running`.
    #[instrument(skip_all, fields(window = %self.settings.window))]
    pub fn run<P, S, D>(
        &mut self,
        open_primary: impl FnOnce() -> Result<P, CaptureError>,
        open_secondary: impl FnOnce() -> Result<S, CaptureError>,
        open_display: impl FnOnce() -> Result<D, DisplayError>,
    ) -> Result<RunSummary, PipelineError>
    where
        P: FrameSource,
        S: FrameSource,
        D: DisplaySink,
    {
        if self.stage != PipelineStage::Initializing {
            warn!("Pipeline already ran, refusing to restart");
            return Err(PipelineError::Stopped);
        }

        let mut state = match Self::acquire(open_primary, open_secondary, open_display) {
            Ok(state) => state,
            Err(e) => {
                warn!("Start-up failed: {}", e);
                self.transition(PipelineStage::Stopped);
                return Err(e);
            }
        };
        info!(
            "Sources ready: primary={}, secondary={}",
            state.primary.name(),
            state.secondary.name()
        );
        self.transition(PipelineStage::Running);

        let exit = self.run_loop(&mut state);

        self.transition(PipelineStage::Stopping);
        state.release();
        self.transition(PipelineStage::Stopped);

        let summary = RunSummary {
            frames: state.frames,
            exit: exit?,
            fps: state.fps.mean(),
        };
        info!(
            frames = summary.frames,
            fps = summary.fps,
            "Pipeline finished: {:?}",
            summary.exit
        );
        Ok(summary)
    }

    fn acquire<P, S, D>(
        open_primary: impl FnOnce() -> Result<P, CaptureError>,
        open_secondary: impl FnOnce() -> Result<S, CaptureError>,
        open_display: impl FnOnce() -> Result<D, DisplayError>,
    ) -> Result<PipelineState<P, S, D>, PipelineError>
    where
        P: FrameSource,
        S: FrameSource,
        D: DisplaySink,
    {
        let mut primary = open_primary()?;

        let mut secondary = match open_secondary() {
            Ok(s) => s,
            Err(e) => {
                primary.close();
                return Err(e.into());
            }
        };

        let display = match open_display() {
            Ok(d) => d,
            Err(e) => {
                primary.close();
                secondary.close();
                return Err(e.into());
            }
        };

        Ok(PipelineState {
            primary,
            secondary,
            display,
            fps: FpsEstimator::new(),
            frames: 0,
            placed_at: None,
            released: false,
        })
    }

    fn run_loop<P, S, D>(
        &self,
        state: &mut PipelineState<P, S, D>,
    ) -> Result<ExitReason, PipelineError>
    where
        P: FrameSource,
        S: FrameSource,
        D: DisplaySink,
    {
        let mut failures = 0u32;

        loop {
            if self.stop.is_raised() {
                info!("Stop requested");
                return Ok(ExitReason::Requested);
            }

            match self.iterate(state) {
                Ok(Flow::Continue) => failures = 0,
                Ok(Flow::Quit) => return Ok(ExitReason::UserQuit),
                Err(PipelineError::Capture(e)) => {
                    failures += 1;
                    metrics::counter!("capture_failures").increment(1);
                    warn!(
                        "Capture failed ({}/{}): {}",
                        failures, self.settings.max_capture_failures, e
                    );
                    if failures >= self.settings.max_capture_failures {
                        return Err(e.into());
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One full iteration against a single parameter snapshot.
    fn iterate<P, S, D>(&self, state: &mut PipelineState<P, S, D>) -> Result<Flow, PipelineError>
    where
        P: FrameSource,
        S: FrameSource,
        D: DisplaySink,
    {
        let started = Instant::now();
        let params = self.store.get();
        let timeout = self.settings.capture_timeout;

        let primary = state.primary.read(timeout)?;
        let secondary = state.secondary.read(timeout)?;

        let adjusted = adjust(&primary, &params);
        let aligned = align(&secondary, adjusted.width(), adjusted.height())?;
        let blended = blend(&adjusted, &aligned, params.blend_opacity)?;
        let fps = state.fps.tick();
        let output = compose(&adjusted, &blended, fps, params.side_by_side)?;

        state.display.present(&self.settings.window, &output)?;
        state.frames += 1;

        let origin = (params.display_origin_x, params.display_origin_y);
        if state.placed_at != Some(origin) {
            state
                .display
                .move_window(&self.settings.window, origin.0, origin.1)?;
            state.placed_at = Some(origin);
        }

        metrics::histogram!("iteration_time_us").record(started.elapsed().as_micros() as f64);
        metrics::gauge!("display_fps").set(fps);

        while let Some(key) = state.display.poll_input() {
            match key {
                KeyCode::Close | KeyCode::Escape | KeyCode::Char('q') => {
                    info!("Quit key pressed");
                    return Ok(Flow::Quit);
                }
                KeyCode::Char(c) if c == self.settings.toggle_key => {
                    let side_by_side = self.store.toggle_side_by_side();
                    info!("Side-by-side view {}", if side_by_side { "on" } else { "off" });
                }
                KeyCode::Char(_) => {}
            }
        }

        Ok(Flow::Continue)
    }
}
