use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use ar_overlay::capture::{Frame, FrameSource};
use ar_overlay::display::overlay::{fps_label, TEXT_ANCHOR, TEXT_COLOR, TEXT_SCALE};
use ar_overlay::display::{DisplaySink, KeyCode};
use ar_overlay::error::{CaptureError, DisplayError, PipelineError};
use ar_overlay::pipeline::{
    stop_channel, ExitReason, LoopSettings, Orchestrator, ParamField, ParameterStore, Parameters,
    PipelineStage, StopHandle,
};

/// Serves the same frame until `fail_from` reads have happened.
struct ScriptedSource {
    name: &'static str,
    frame: Frame,
    fail_from: Option<u64>,
    fail_once_at: Option<u64>,
    reads: Rc<Cell<u64>>,
    closes: Rc<Cell<u32>>,
}

impl ScriptedSource {
    fn new(name: &'static str, frame: Frame) -> Self {
        Self {
            name,
            frame,
            fail_from: None,
            fail_once_at: None,
            reads: Rc::new(Cell::new(0)),
            closes: Rc::new(Cell::new(0)),
        }
    }
}

impl FrameSource for ScriptedSource {
    fn name(&self) -> &str {
        self.name
    }

    fn read(&mut self, timeout: Duration) -> Result<Frame, CaptureError> {
        let n = self.reads.get() + 1;
        self.reads.set(n);
        let failing = self.fail_from.is_some_and(|from| n >= from) || self.fail_once_at == Some(n);
        if failing {
            return Err(CaptureError::Timeout {
                name: self.name.to_owned(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        Ok(self.frame.clone())
    }

    fn close(&mut self) {
        self.closes.set(self.closes.get() + 1);
    }
}

/// Records presented frames and replays keys after given present counts.
#[derive(Default)]
struct RecordingSink {
    presented: Rc<RefCell<Vec<Frame>>>,
    moves: Rc<RefCell<Vec<(u32, u32)>>>,
    destroys: Rc<Cell<u32>>,
    keys: VecDeque<(usize, KeyCode)>,
    fail_present: bool,
}

impl RecordingSink {
    fn with_keys(keys: &[(usize, KeyCode)]) -> Self {
        Self {
            keys: keys.iter().copied().collect(),
            ..Self::default()
        }
    }
}

impl DisplaySink for RecordingSink {
    fn present(&mut self, _window: &str, frame: &Frame) -> Result<(), DisplayError> {
        if self.fail_present {
            return Err(DisplayError::Backend("lost surface".into()));
        }
        self.presented.borrow_mut().push(frame.clone());
        Ok(())
    }

    fn move_window(&mut self, _window: &str, x: u32, y: u32) -> Result<(), DisplayError> {
        self.moves.borrow_mut().push((x, y));
        Ok(())
    }

    fn poll_input(&mut self) -> Option<KeyCode> {
        let shown = self.presented.borrow().len();
        match self.keys.front() {
            Some(&(after, key)) if after <= shown => {
                self.keys.pop_front();
                Some(key)
            }
            _ => None,
        }
    }

    fn destroy_all(&mut self) {
        self.destroys.set(self.destroys.get() + 1);
    }
}

fn settings(max_capture_failures: u32) -> LoopSettings {
    LoopSettings {
        window: "AR View".into(),
        toggle_key: 's',
        capture_timeout: Duration::from_millis(50),
        max_capture_failures,
    }
}

fn orchestrator(params: Parameters, max_failures: u32) -> (Orchestrator, Arc<ParameterStore>, StopHandle) {
    let store = Arc::new(ParameterStore::new(params));
    let (handle, signal) = stop_channel();
    (
        Orchestrator::new(Arc::clone(&store), signal, settings(max_failures)),
        store,
        handle,
    )
}

fn small_sources() -> (ScriptedSource, ScriptedSource) {
    (
        ScriptedSource::new("camera", Frame::filled(64, 48, [0, 0, 0]).unwrap()),
        ScriptedSource::new("screen", Frame::filled(128, 72, [255, 255, 255]).unwrap()),
    )
}

#[test]
fn black_camera_and_white_screen_blend_to_mid_grey() {
    let (mut orch, store, _stop) = orchestrator(
        Parameters {
            side_by_side: false,
            ..Parameters::default()
        },
        1,
    );
    // Smallest gain adds 0.5, which rounds to even (0)
    store.set_field(ParamField::BrightnessGain, 0.0);
    store.set_field(ParamField::BlendOpacity, 0.5);

    let primary = ScriptedSource::new("camera", Frame::filled(640, 480, [0, 0, 0]).unwrap());
    let secondary =
        ScriptedSource::new("screen", Frame::filled(1920, 1080, [255, 255, 255]).unwrap());
    let sink = RecordingSink::with_keys(&[(1, KeyCode::Char('q'))]);
    let presented = Rc::clone(&sink.presented);

    let summary = orch
        .run(|| Ok(primary), || Ok(secondary), || Ok(sink))
        .unwrap();
    assert_eq!(summary.exit, ExitReason::UserQuit);
    assert_eq!(summary.frames, 1);

    let frames = presented.borrow();
    let frame = &frames[0];
    assert_eq!(frame.dimensions(), (640, 480));

    let text_w = fps_label(summary.fps).len() as u32 * 8 * TEXT_SCALE;
    let text_h = 8 * TEXT_SCALE;
    let in_text = |x: u32, y: u32| {
        (TEXT_ANCHOR.0..TEXT_ANCHOR.0 + text_w).contains(&x)
            && (TEXT_ANCHOR.1..TEXT_ANCHOR.1 + text_h).contains(&y)
    };

    let mut lit = 0;
    for y in 0..480 {
        for x in 0..640 {
            let px = frame.pixel(x, y);
            if in_text(x, y) && px == TEXT_COLOR {
                lit += 1;
            } else {
                assert_eq!(px, [127, 127, 127], "pixel ({}, {})", x, y);
            }
        }
    }
    assert!(lit > 0, "FPS text missing at anchor");
}

#[test]
fn primary_capture_failure_releases_everything_once() {
    let (mut orch, _store, _stop) = orchestrator(Parameters::default(), 1);
    let (mut primary, secondary) = small_sources();
    primary.fail_from = Some(3);
    let (p_closes, s_closes) = (Rc::clone(&primary.closes), Rc::clone(&secondary.closes));
    let sink = RecordingSink::default();
    let (destroys, presented) = (Rc::clone(&sink.destroys), Rc::clone(&sink.presented));

    let err = orch
        .run(|| Ok(primary), || Ok(secondary), || Ok(sink))
        .unwrap_err();

    assert!(matches!(err, PipelineError::Capture(CaptureError::Timeout { .. })));
    assert_eq!(orch.stage(), PipelineStage::Stopped);
    assert_eq!(presented.borrow().len(), 2);
    assert_eq!(p_closes.get(), 1);
    assert_eq!(s_closes.get(), 1);
    assert_eq!(destroys.get(), 1);
}

#[test]
fn consecutive_failures_are_bounded() {
    let (mut orch, _store, _stop) = orchestrator(Parameters::default(), 3);
    let (primary, mut secondary) = small_sources();
    secondary.fail_from = Some(1);
    let (reads, closes) = (Rc::clone(&secondary.reads), Rc::clone(&secondary.closes));

    let err = orch
        .run(|| Ok(primary), || Ok(secondary), || Ok(RecordingSink::default()))
        .unwrap_err();

    assert!(matches!(err, PipelineError::Capture(_)));
    assert_eq!(reads.get(), 3);
    assert_eq!(closes.get(), 1);
}

#[test]
fn a_single_failure_is_tolerated_when_allowed() {
    let (mut orch, _store, _stop) = orchestrator(Parameters::default(), 2);
    let (mut primary, secondary) = small_sources();
    primary.fail_once_at = Some(2);
    let sink = RecordingSink::with_keys(&[(3, KeyCode::Escape)]);
    let presented = Rc::clone(&sink.presented);

    let summary = orch
        .run(|| Ok(primary), || Ok(secondary), || Ok(sink))
        .unwrap();

    assert_eq!(summary.exit, ExitReason::UserQuit);
    assert_eq!(summary.frames, 3);
    assert_eq!(presented.borrow().len(), 3);
}

#[test]
fn toggle_doubles_width_from_the_next_frame_on() {
    let (mut orch, _store, _stop) = orchestrator(
        Parameters {
            side_by_side: false,
            ..Parameters::default()
        },
        1,
    );
    let (primary, secondary) = small_sources();
    let sink = RecordingSink::with_keys(&[(2, KeyCode::Char('s')), (4, KeyCode::Char('q'))]);
    let presented = Rc::clone(&sink.presented);

    orch.run(|| Ok(primary), || Ok(secondary), || Ok(sink))
        .unwrap();

    let widths: Vec<u32> = presented.borrow().iter().map(Frame::width).collect();
    assert_eq!(widths, vec![64, 64, 128, 128]);
}

#[test]
fn failed_start_up_releases_what_was_acquired() {
    let (mut orch, _store, _stop) = orchestrator(Parameters::default(), 1);
    let (primary, _) = small_sources();
    let closes = Rc::clone(&primary.closes);
    let display_opened = Cell::new(false);

    let err = orch
        .run(
            || Ok(primary),
            || -> Result<ScriptedSource, CaptureError> {
                Err(CaptureError::unavailable("screen", "no X display"))
            },
            || {
                display_opened.set(true);
                Ok(RecordingSink::default())
            },
        )
        .unwrap_err();

    assert!(matches!(err, PipelineError::Capture(CaptureError::Unavailable { .. })));
    assert_eq!(orch.stage(), PipelineStage::Stopped);
    assert_eq!(closes.get(), 1);
    assert!(!display_opened.get());
}

#[test]
fn display_failure_closes_both_sources() {
    let (mut orch, _store, _stop) = orchestrator(Parameters::default(), 1);
    let (primary, secondary) = small_sources();
    let (p_closes, s_closes) = (Rc::clone(&primary.closes), Rc::clone(&secondary.closes));

    let err = orch
        .run(
            || Ok(primary),
            || Ok(secondary),
            || -> Result<RecordingSink, DisplayError> { Err(DisplayError::Backend("no video".into())) },
        )
        .unwrap_err();

    assert!(matches!(err, PipelineError::Display(_)));
    assert_eq!((p_closes.get(), s_closes.get()), (1, 1));
}

#[test]
fn presentation_errors_abort_the_run() {
    let (mut orch, _store, _stop) = orchestrator(Parameters::default(), 5);
    let (primary, secondary) = small_sources();
    let sink = RecordingSink {
        fail_present: true,
        ..RecordingSink::default()
    };
    let destroys = Rc::clone(&sink.destroys);

    let err = orch
        .run(|| Ok(primary), || Ok(secondary), || Ok(sink))
        .unwrap_err();

    assert!(matches!(err, PipelineError::Display(_)));
    assert_eq!(destroys.get(), 1);
}

#[test]
fn stop_signal_ends_the_run_before_the_next_iteration() {
    let (mut orch, _store, stop) = orchestrator(Parameters::default(), 1);
    let (primary, secondary) = small_sources();
    let closes = Rc::clone(&primary.closes);
    stop.stop();

    let summary = orch
        .run(|| Ok(primary), || Ok(secondary), || Ok(RecordingSink::default()))
        .unwrap();

    assert_eq!(summary.exit, ExitReason::Requested);
    assert_eq!(summary.frames, 0);
    assert_eq!(closes.get(), 1);
}

#[test]
fn window_follows_origin_parameters() {
    let (mut orch, store, _stop) = orchestrator(Parameters::default(), 1);
    store.set_field(ParamField::DisplayOriginX, 40.0);
    let (primary, secondary) = small_sources();
    let sink = RecordingSink::with_keys(&[(2, KeyCode::Close)]);
    let moves = Rc::clone(&sink.moves);

    orch.run(|| Ok(primary), || Ok(secondary), || Ok(sink))
        .unwrap();

    // Placed once on the first frame, not again while unchanged
    assert_eq!(*moves.borrow(), vec![(40, 0)]);
}

#[test]
fn stopped_pipeline_cannot_run_again() {
    let (mut orch, _store, stop) = orchestrator(Parameters::default(), 1);
    stop.stop();
    let (primary, secondary) = small_sources();
    orch.run(|| Ok(primary), || Ok(secondary), || Ok(RecordingSink::default()))
        .unwrap();

    let (primary, secondary) = small_sources();
    let err = orch
        .run(|| Ok(primary), || Ok(secondary), || Ok(RecordingSink::default()))
        .unwrap_err();
    assert!(matches!(err, PipelineError::Stopped));
}
