//! Alpha blend of two equally sized frames

use crate::capture::Frame;
use crate::error::DimensionMismatchError;

const ONE: u32 = 1 << 16;

/// `out = base * (1 - opacity) + overlay * opacity`, rounded down.
///
/// `opacity` is clamped to `0..=1`. Weights are 16-bit fixed point, so
/// opacity 0 reproduces `base` and opacity 1 reproduces `overlay` exactly.
pub fn blend(base: &Frame, overlay: &Frame, opacity: f64) -> Result<Frame, DimensionMismatchError> {
    if base.dimensions() != overlay.dimensions() {
        return Err(DimensionMismatchError {
            left: base.dimensions(),
            right: overlay.dimensions(),
        });
    }

    let weight = (opacity.clamp(0.0, 1.0) * f64::from(ONE)).round() as u32;
    let keep = ONE - weight;
    let pixels: Vec<u8> = base
        .data
        .iter()
        .zip(overlay.data.iter())
        .map(|(&b, &o)| ((u32::from(b) * keep + u32::from(o) * weight) >> 16) as u8)
        .collect();

    Ok(Frame::derived(base, base.width(), base.height(), pixels))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32, seed: u8) -> Frame {
        let pixels = (0..width * height * 3)
            .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
            .collect();
        Frame::rgb(width, height, pixels).unwrap()
    }

    #[test]
    fn endpoints_reproduce_inputs() {
        let base = gradient(5, 4, 3);
        let overlay = gradient(5, 4, 101);
        assert_eq!(blend(&base, &overlay, 0.0).unwrap().data, base.data);
        assert_eq!(blend(&base, &overlay, 1.0).unwrap().data, overlay.data);
    }

    #[test]
    fn half_of_black_and_white_is_127() {
        let black = Frame::filled(4, 4, [0, 0, 0]).unwrap();
        let white = Frame::filled(4, 4, [255, 255, 255]).unwrap();
        let out = blend(&black, &white, 0.5).unwrap();
        assert!(out.data.iter().all(|&p| p == 127));
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let a = Frame::filled(4, 4, [0, 0, 0]).unwrap();
        let b = Frame::filled(4, 5, [0, 0, 0]).unwrap();
        let err = blend(&a, &b, 0.5).unwrap_err();
        assert_eq!(err.left, (4, 4));
        assert_eq!(err.right, (4, 5));
    }
}
