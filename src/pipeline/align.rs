//! Stretches the secondary frame onto the primary frame's grid

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::capture::Frame;
use crate::error::DimensionError;

/// Resamples `frame` to exactly `width` x `height` (bilinear, aspect ratio not kept).
pub fn align(frame: &Frame, width: u32, height: u32) -> Result<Frame, DimensionError> {
    if width == 0 || height == 0 {
        return Err(DimensionError { width, height });
    }
    if frame.dimensions() == (width, height) {
        return Ok(frame.clone());
    }

    let source = RgbImage::from_raw(frame.width(), frame.height(), frame.data.to_vec()).ok_or(
        DimensionError {
            width: frame.width(),
            height: frame.height(),
        },
    )?;
    let resized = imageops::resize(&source, width, height, FilterType::Triangle);

    Ok(Frame::derived(frame, width, height, resized.into_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_has_exact_target_size() {
        let frame = Frame::filled(7, 3, [1, 2, 3]).unwrap();
        for (w, h) in [(1, 1), (7, 3), (20, 5), (3, 40), (640, 480)] {
            let out = align(&frame, w, h).unwrap();
            assert_eq!(out.dimensions(), (w, h));
            assert_eq!(out.data.len(), (w * h * 3) as usize);
        }
    }

    #[test]
    fn zero_target_is_a_dimension_error() {
        let frame = Frame::filled(4, 4, [0, 0, 0]).unwrap();
        assert_eq!(
            align(&frame, 0, 10).unwrap_err(),
            DimensionError {
                width: 0,
                height: 10
            }
        );
        assert!(align(&frame, 10, 0).is_err());
    }

    #[test]
    fn uniform_frames_stay_uniform() {
        let frame = Frame::filled(192, 108, [255, 255, 255]).unwrap();
        let out = align(&frame, 64, 48).unwrap();
        assert!(out.data.iter().all(|&p| p == 255));
    }
}
