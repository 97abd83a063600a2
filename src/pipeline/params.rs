//! Live compositing parameters, published as immutable snapshots

use std::str::FromStr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;

use crate::error::ControlRangeError;

pub const EXPOSURE_RANGE: (i32, i32) = (-50, 50);
pub const GAIN_RANGE: (f64, f64) = (0.01, 4.0);
pub const OPACITY_RANGE: (f64, f64) = (0.0, 1.0);
pub const ORIGIN_MAX: u32 = 16_384;

/// One consistent set of compositing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameters {
    pub exposure_bias: i32,
    pub brightness_gain: f64,
    pub contrast_gain: f64,
    pub blend_opacity: f64,
    pub display_origin_x: u32,
    pub display_origin_y: u32,
    pub side_by_side: bool,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            exposure_bias: 0,
            brightness_gain: 1.0,
            contrast_gain: 1.0,
            blend_opacity: 0.5,
            display_origin_x: 0,
            display_origin_y: 0,
            side_by_side: true,
        }
    }
}

/// Addressable fields of [`Parameters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamField {
    ExposureBias,
    BrightnessGain,
    ContrastGain,
    BlendOpacity,
    DisplayOriginX,
    DisplayOriginY,
    SideBySide,
}

impl ParamField {
    pub const ALL: [ParamField; 7] = [
        ParamField::ExposureBias,
        ParamField::BrightnessGain,
        ParamField::ContrastGain,
        ParamField::BlendOpacity,
        ParamField::DisplayOriginX,
        ParamField::DisplayOriginY,
        ParamField::SideBySide,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ParamField::ExposureBias => "exposure_bias",
            ParamField::BrightnessGain => "brightness_gain",
            ParamField::ContrastGain => "contrast_gain",
            ParamField::BlendOpacity => "blend_opacity",
            ParamField::DisplayOriginX => "display_origin_x",
            ParamField::DisplayOriginY => "display_origin_y",
            ParamField::SideBySide => "side_by_side",
        }
    }

    /// Declared `(min, max)` of the field's semantic value.
    pub fn range(self) -> (f64, f64) {
        match self {
            ParamField::ExposureBias => (f64::from(EXPOSURE_RANGE.0), f64::from(EXPOSURE_RANGE.1)),
            ParamField::BrightnessGain | ParamField::ContrastGain => GAIN_RANGE,
            ParamField::BlendOpacity => OPACITY_RANGE,
            ParamField::DisplayOriginX | ParamField::DisplayOriginY => (0.0, f64::from(ORIGIN_MAX)),
            ParamField::SideBySide => (0.0, 1.0),
        }
    }

    fn check(self, value: f64) -> Result<f64, ControlRangeError> {
        let (min, max) = self.range();
        if (min..=max).contains(&value) {
            Ok(value)
        } else {
            Err(ControlRangeError {
                field: self.name(),
                value,
                min,
                max,
            })
        }
    }

    /// Clamps `value` into range. Out-of-range input is logged, never rejected.
    fn clamp(self, value: f64) -> f64 {
        self.check(value).unwrap_or_else(|e| {
            debug!("Clamping control write: {}", e);
            value.clamp(e.min, e.max)
        })
    }

    fn apply(self, params: &mut Parameters, value: f64) {
        match self {
            ParamField::ExposureBias => params.exposure_bias = value.round() as i32,
            ParamField::BrightnessGain => params.brightness_gain = value,
            ParamField::ContrastGain => params.contrast_gain = value,
            ParamField::BlendOpacity => params.blend_opacity = value,
            ParamField::DisplayOriginX => params.display_origin_x = value.round() as u32,
            ParamField::DisplayOriginY => params.display_origin_y = value.round() as u32,
            ParamField::SideBySide => params.side_by_side = value != 0.0,
        }
    }
}

impl FromStr for ParamField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s.chars().filter(|c| *c != '_').collect::<String>().to_lowercase();
        ParamField::ALL
            .into_iter()
            .find(|f| f.name().replace('_', "") == wanted)
            .ok_or_else(|| format!("unknown parameter {:?}", s))
    }
}

impl Parameters {
    /// Copy with every numeric field pulled into its declared range.
    pub fn clamped(mut self) -> Self {
        let fields = [
            (ParamField::ExposureBias, f64::from(self.exposure_bias)),
            (ParamField::BrightnessGain, self.brightness_gain),
            (ParamField::ContrastGain, self.contrast_gain),
            (ParamField::BlendOpacity, self.blend_opacity),
            (ParamField::DisplayOriginX, f64::from(self.display_origin_x)),
            (ParamField::DisplayOriginY, f64::from(self.display_origin_y)),
        ];
        for (field, value) in fields {
            let value = if value.is_nan() { field.range().0 } else { value };
            field.apply(&mut self, field.clamp(value));
        }
        self
    }
}

/// Holds the current [`Parameters`].
///
/// Every write builds a fresh record and publishes it with a single atomic
/// swap, so readers always see one whole generation. Writers never wait on
/// the frame loop and the frame loop never waits on writers.
pub struct ParameterStore {
    current: ArcSwap<Parameters>,
}

impl ParameterStore {
    pub fn new(initial: Parameters) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial.clamped()),
        }
    }

    /// Snapshot of the latest published record.
    pub fn get(&self) -> Arc<Parameters> {
        self.current.load_full()
    }

    /// Clamps and stores one field. NaN writes are dropped.
    ///
    /// Booleans take any non-zero value as `true`.
    pub fn set_field(&self, field: ParamField, value: f64) {
        self.set_fields(&[(field, value)]);
    }

    /// Clamps and stores several fields, published together as one snapshot.
    pub fn set_fields(&self, writes: &[(ParamField, f64)]) {
        let writes: Vec<(ParamField, f64)> = writes
            .iter()
            .filter(|(field, value)| {
                if value.is_nan() {
                    debug!("Ignoring NaN write to {}", field.name());
                }
                !value.is_nan()
            })
            .map(|&(field, value)| (field, field.clamp(value)))
            .collect();
        if writes.is_empty() {
            return;
        }

        self.current.rcu(|current| {
            let mut next = **current;
            for &(field, value) in &writes {
                field.apply(&mut next, value);
            }
            next
        });
    }

    /// Flips side-by-side mode and returns the new setting.
    pub fn toggle_side_by_side(&self) -> bool {
        let previous = self.current.rcu(|current| Parameters {
            side_by_side: !current.side_by_side,
            ..**current
        });
        !previous.side_by_side
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new(Parameters::default())
    }
}
