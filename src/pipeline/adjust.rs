//! Brightness/contrast transform of the primary frame

use super::params::Parameters;
use crate::capture::Frame;

/// Offset contributed by a brightness gain of 1.0.
pub const BRIGHTNESS_SCALE: f64 = 50.0;

/// `out = in * contrast + brightness * 50`, rounded half-to-even and saturated to `0..=255`.
///
/// Returns a new frame; `frame` is left untouched.
pub fn adjust(frame: &Frame, params: &Parameters) -> Frame {
    let lut = lookup_table(params.contrast_gain, params.brightness_gain);
    let pixels: Vec<u8> = frame.data.iter().map(|&p| lut[p as usize]).collect();
    Frame::derived(frame, frame.width(), frame.height(), pixels)
}

fn lookup_table(contrast: f64, brightness: f64) -> [u8; 256] {
    let offset = brightness * BRIGHTNESS_SCALE;
    let mut lut = [0u8; 256];
    for (value, out) in lut.iter_mut().enumerate() {
        *out = (value as f64 * contrast + offset)
            .round_ties_even()
            .clamp(0.0, 255.0) as u8;
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(contrast: f64, brightness: f64) -> Parameters {
        Parameters {
            contrast_gain: contrast,
            brightness_gain: brightness,
            ..Parameters::default()
        }
    }

    #[test]
    fn applies_gain_and_offset() {
        let frame = Frame::filled(2, 2, [10, 100, 200]).unwrap();
        let out = adjust(&frame, &params(0.5, 0.2));
        // 10*0.5+10, 100*0.5+10, 200*0.5+10
        assert_eq!(out.pixel(1, 1), [15, 60, 110]);
    }

    #[test]
    fn saturates_instead_of_wrapping() {
        let frame = Frame::filled(1, 1, [0, 128, 250]).unwrap();
        let out = adjust(&frame, &params(2.0, 1.0));
        assert_eq!(out.pixel(0, 0), [50, 255, 255]);
    }

    #[test]
    fn halves_round_to_even() {
        let frame = Frame::filled(1, 1, [0, 1, 2]).unwrap();
        // offset 0.5: 0.5 -> 0, 1.5 -> 2, 2.5 -> 2
        let out = adjust(&frame, &params(1.0, 0.01));
        assert_eq!(out.pixel(0, 0), [0, 2, 2]);
    }

    #[test]
    fn leaves_input_untouched() {
        let frame = Frame::filled(2, 1, [7, 7, 7]).unwrap();
        let before = frame.data.clone();
        let out = adjust(&frame, &params(3.0, 2.0));
        assert_eq!(frame.data, before);
        assert_ne!(out.data, before);
        assert_eq!(out.dimensions(), frame.dimensions());
    }
}
