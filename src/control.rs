//! Control surface: named sliders mapped onto compositing parameters, and a
//! terminal driver that moves them while the frame loop runs.

use std::io::BufRead;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;

use flume::Receiver;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::pipeline::{ParamField, ParameterStore, Parameters, StopHandle};

/// A slider with an integer raw range `0..=max_raw`.
#[derive(Debug, Clone, Copy)]
pub struct Slider {
    pub label: &'static str,
    /// Short name used on the command line
    pub key: &'static str,
    pub field: ParamField,
    pub max_raw: i32,
    convert: fn(i32) -> f64,
}

impl Slider {
    /// Semantic value for a raw position; the position is clamped to the slider range first.
    pub fn value(&self, raw: i32) -> f64 {
        (self.convert)(raw.clamp(0, self.max_raw))
    }
}

fn exposure(raw: i32) -> f64 {
    f64::from(raw - 50)
}

fn gain(raw: i32) -> f64 {
    f64::from(raw) / 50.0
}

fn percent(raw: i32) -> f64 {
    f64::from(raw) / 100.0
}

fn pixels(raw: i32) -> f64 {
    f64::from(raw)
}

pub const SLIDERS: [Slider; 6] = [
    Slider {
        label: "Exposure",
        key: "exposure",
        field: ParamField::ExposureBias,
        max_raw: 100,
        convert: exposure,
    },
    Slider {
        label: "Brightness",
        key: "brightness",
        field: ParamField::BrightnessGain,
        max_raw: 100,
        convert: gain,
    },
    Slider {
        label: "Contrast",
        key: "contrast",
        field: ParamField::ContrastGain,
        max_raw: 100,
        convert: gain,
    },
    Slider {
        label: "Overlay Opacity",
        key: "opacity",
        field: ParamField::BlendOpacity,
        max_raw: 100,
        convert: percent,
    },
    Slider {
        label: "Window X",
        key: "x",
        field: ParamField::DisplayOriginX,
        max_raw: 1920,
        convert: pixels,
    },
    Slider {
        label: "Window Y",
        key: "y",
        field: ParamField::DisplayOriginY,
        max_raw: 1080,
        convert: pixels,
    },
];

pub fn slider(key: &str) -> Option<&'static Slider> {
    SLIDERS
        .iter()
        .find(|s| s.key.eq_ignore_ascii_case(key) || s.label.eq_ignore_ascii_case(key))
}

/// Raw slider positions applied at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliderPositions {
    pub exposure: i32,
    pub brightness: i32,
    pub contrast: i32,
    pub opacity: i32,
    pub window_x: i32,
    pub window_y: i32,
    pub side_by_side: bool,
}

impl Default for SliderPositions {
    fn default() -> Self {
        Self {
            exposure: 50,
            brightness: 50,
            contrast: 50,
            opacity: 50,
            window_x: 0,
            window_y: 0,
            side_by_side: true,
        }
    }
}

impl SliderPositions {
    pub fn parameters(&self) -> Parameters {
        let raw = [
            self.exposure,
            self.brightness,
            self.contrast,
            self.opacity,
            self.window_x,
            self.window_y,
        ];
        let store = ParameterStore::new(Parameters {
            side_by_side: self.side_by_side,
            ..Parameters::default()
        });
        let writes: Vec<(ParamField, f64)> = SLIDERS
            .iter()
            .zip(raw)
            .map(|(slider, raw)| (slider.field, slider.value(raw)))
            .collect();
        store.set_fields(&writes);
        *store.get()
    }
}

/// Writes slider movements into the shared [`ParameterStore`].
#[derive(Clone)]
pub struct ControlSurface {
    store: Arc<ParameterStore>,
}

impl ControlSurface {
    pub fn new(store: Arc<ParameterStore>) -> Self {
        Self { store }
    }

    /// Moves the slider named `key` and returns the value written.
    pub fn move_slider(&self, key: &str, raw: i32) -> Option<f64> {
        let slider = slider(key)?;
        let value = slider.value(raw);
        self.store.set_field(slider.field, value);
        Some(value)
    }

    pub fn toggle_side_by_side(&self) -> bool {
        self.store.toggle_side_by_side()
    }

    pub fn parameters(&self) -> Arc<Parameters> {
        self.store.get()
    }
}

/// One line typed into the terminal driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Move { slider: String, raw: i32 },
    Toggle,
    Show,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = match (words.next(), words.next(), words.next()) {
            (Some("toggle" | "s"), None, None) => Command::Toggle,
            (Some("show"), None, None) => Command::Show,
            (Some("help" | "?"), None, None) => Command::Help,
            (Some("quit" | "q"), None, None) => Command::Quit,
            (Some(name), Some(raw), None) => {
                let raw = raw
                    .parse()
                    .map_err(|_| format!("{:?} is not a slider position", raw))?;
                if slider(name).is_none() {
                    return Err(format!("unknown slider {:?}", name));
                }
                Command::Move {
                    slider: name.to_owned(),
                    raw,
                }
            }
            _ => return Err(format!("cannot parse {:?}, try `help`", line.trim())),
        };
        Ok(command)
    }
}

fn help() {
    let sliders: Vec<String> = SLIDERS
        .iter()
        .map(|s| format!("{} 0..{}", s.key, s.max_raw))
        .collect();
    info!(
        "Commands: <slider> <raw> ({}), toggle, show, quit",
        sliders.join(", ")
    );
}

/// Forwards stdin lines from a detached thread. The channel closes at end of input.
pub fn stdin_lines() -> Receiver<String> {
    let (tx, rx) = flume::unbounded();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
        debug!("stdin closed");
    });
    rx
}

/// Applies typed commands until `quit` or until `lines` closes.
///
/// `quit` raises the stop signal. Writes go straight to the parameter store,
/// so the driver never waits on the frame loop.
pub async fn run_terminal(surface: ControlSurface, stop: StopHandle, lines: Receiver<String>) {
    help();

    while let Ok(line) = lines.recv_async().await {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(Command::Move { slider, raw }) => {
                if let Some(value) = surface.move_slider(&slider, raw) {
                    info!("{} -> {}", slider, value);
                }
            }
            Ok(Command::Toggle) => {
                let on = surface.toggle_side_by_side();
                info!("Side-by-side view {}", if on { "on" } else { "off" });
            }
            Ok(Command::Show) => info!("{:?}", surface.parameters()),
            Ok(Command::Help) => help(),
            Ok(Command::Quit) => {
                stop.stop();
                break;
            }
            Err(e) => warn!("{}", e),
        }
    }
}
