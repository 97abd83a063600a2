use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::error::DimensionError;

/// One image handed between pipeline stages.
///
/// Pixel data is immutable once built: stages that transform a frame build a
/// new one and leave their input untouched.
#[derive(Clone)]
pub struct Frame {
    /// Packed pixel rows, `stride` bytes each
    pub data: Bytes,

    /// Frame metadata
    pub meta: Arc<FrameMetadata>,

    /// Capture timestamp for latency tracking
    pub timestamp: Instant,
}

/// Frame metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameMetadata {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub format: PixelFormat,
}

/// Pixel layouts a source may deliver. Only `Rgb24` enters the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgb24,
    Bgr24,
    Yuyv4,
    Mjpeg,
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PixelFormat::Rgb24 => "RGB24",
            PixelFormat::Bgr24 => "BGR24",
            PixelFormat::Yuyv4 => "YUYV",
            PixelFormat::Mjpeg => "MJPEG",
        };
        f.write_str(name)
    }
}

impl Frame {
    /// Wraps raw source bytes as delivered by a device, before normalisation.
    pub fn raw(
        data: Bytes,
        width: u32,
        height: u32,
        format: PixelFormat,
        sequence: u64,
        timestamp: Instant,
    ) -> Self {
        let stride = match format {
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => width * 3,
            PixelFormat::Yuyv4 => width * 2,
            PixelFormat::Mjpeg => 0,
        };
        Self {
            data,
            meta: Arc::new(FrameMetadata {
                sequence,
                width,
                height,
                stride,
                format,
            }),
            timestamp,
        }
    }

    /// Builds a packed RGB24 frame. `pixels` must hold exactly `width * height * 3` bytes.
    pub fn rgb(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, DimensionError> {
        if width == 0 || height == 0 || pixels.len() != rgb_len(width, height) {
            return Err(DimensionError { width, height });
        }
        Ok(Self::raw(
            Bytes::from(pixels),
            width,
            height,
            PixelFormat::Rgb24,
            0,
            Instant::now(),
        ))
    }

    /// Uniform RGB24 frame.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self, DimensionError> {
        let pixels = rgb
            .iter()
            .copied()
            .cycle()
            .take(rgb_len(width, height))
            .collect();
        Self::rgb(width, height, pixels)
    }

    /// Overrides the row pitch of a raw frame, for devices that pad rows.
    pub fn with_stride(mut self, stride: u32) -> Self {
        Arc::make_mut(&mut self.meta).stride = stride;
        self
    }

    /// Packed RGB24 pixels carrying over the sequence number and timestamp of `origin`.
    pub(crate) fn derived(
        origin: &Frame,
        width: u32,
        height: u32,
        pixels: impl Into<Bytes>,
    ) -> Self {
        let pixels = pixels.into();
        debug_assert_eq!(pixels.len(), rgb_len(width, height));
        Self::raw(
            pixels,
            width,
            height,
            PixelFormat::Rgb24,
            origin.meta.sequence,
            origin.timestamp,
        )
    }

    pub fn width(&self) -> u32 {
        self.meta.width
    }

    pub fn height(&self) -> u32 {
        self.meta.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.meta.width, self.meta.height)
    }

    pub fn format(&self) -> PixelFormat {
        self.meta.format
    }

    /// RGB triple at `(x, y)`. Only meaningful for RGB24 frames.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let offset = (y * self.meta.stride + x * 3) as usize;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ]
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("meta", &self.meta)
            .field("len", &self.data.len())
            .finish()
    }
}

pub(crate) fn rgb_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_rejects_short_buffers() {
        assert!(Frame::rgb(2, 2, vec![0; 11]).is_err());
        assert!(Frame::rgb(0, 2, vec![]).is_err());
    }

    #[test]
    fn filled_repeats_the_triple() {
        let frame = Frame::filled(3, 2, [1, 2, 3]).unwrap();
        assert_eq!(frame.dimensions(), (3, 2));
        assert_eq!(frame.pixel(2, 1), [1, 2, 3]);
        assert_eq!(frame.meta.stride, 9);
    }
}
