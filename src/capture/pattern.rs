//! Synthetic frame producer

use std::time::{Duration, Instant};

use bytes::Bytes;

use super::frame::{Frame, PixelFormat};
use super::FrameSource;
use crate::error::{CaptureError, DimensionError};

const BARS: [[u8; 3]; 8] = [
    [255, 255, 255],
    [255, 255, 0],
    [0, 255, 255],
    [0, 255, 0],
    [255, 0, 255],
    [255, 0, 0],
    [0, 0, 255],
    [0, 0, 0],
];

/// Colour bars with a bright marker column that advances one bar width
/// per frame, so motion is visible on screen.
pub struct TestPattern {
    name: String,
    width: u32,
    height: u32,
    base: Vec<u8>,
    sequence: u64,
    closed: bool,
}

impl TestPattern {
    pub fn open(name: &str, width: u32, height: u32) -> Result<Self, DimensionError> {
        if width == 0 || height == 0 {
            return Err(DimensionError { width, height });
        }

        let row: Vec<u8> = (0..width)
            .flat_map(|x| BARS[(x as usize * BARS.len()) / width as usize])
            .collect();
        let base = row.repeat(height as usize);

        Ok(Self {
            name: name.to_owned(),
            width,
            height,
            base,
            sequence: 0,
            closed: false,
        })
    }
}

impl FrameSource for TestPattern {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, _timeout: Duration) -> Result<Frame, CaptureError> {
        if self.closed {
            return Err(CaptureError::unavailable(&self.name, "closed"));
        }
        self.sequence += 1;

        let mut pixels = self.base.clone();
        let stride = self.width as usize * 3;
        let marker = (self.sequence % u64::from(self.width)) as usize * 3;
        for row in pixels.chunks_exact_mut(stride) {
            row[marker..marker + 3].copy_from_slice(&[255, 255, 255]);
        }

        Ok(Frame::raw(
            Bytes::from(pixels),
            self.width,
            self.height,
            PixelFormat::Rgb24,
            self.sequence,
            Instant::now(),
        ))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_have_requested_size_and_advance() {
        let mut pattern = TestPattern::open("bars", 16, 4).unwrap();
        let a = pattern.read(Duration::ZERO).unwrap();
        let b = pattern.read(Duration::ZERO).unwrap();
        assert_eq!(a.dimensions(), (16, 4));
        assert_eq!(b.meta.sequence, 2);
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn closed_pattern_stops_delivering() {
        let mut pattern = TestPattern::open("bars", 4, 4).unwrap();
        pattern.close();
        assert!(pattern.read(Duration::ZERO).is_err());
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(TestPattern::open("bars", 0, 4).is_err());
    }
}
