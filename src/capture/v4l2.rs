//! V4L2 camera capture with memory-mapped buffers

use std::io;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{info, instrument};
use v4l::buffer::Type;
use v4l::capability::Flags as CapFlags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use super::{decoder, Frame, FrameSource, PixelFormat};
use crate::error::CaptureError;
use crate::CameraConfig;

const NAME: &str = "camera";

/// Camera source. Frames are normalised to RGB24 before they are returned.
pub struct V4l2Capture {
    // Drop order: stream before device
    stream: Option<MmapStream<'static>>,
    _device: Box<Device>,
    config: CameraConfig,
    // Bytes per row as negotiated; drivers may pad rows
    stride: u32,
    sequence: u64,
    timeout: Option<Duration>,
}

impl V4l2Capture {
    /// Opens the device, negotiates the format and starts streaming.
    #[instrument(skip(config), fields(device = %config.device))]
    pub fn open(config: CameraConfig) -> Result<Self, CaptureError> {
        let device_err = |e: io::Error| CaptureError::device(NAME, e);

        let device = Device::with_path(&config.device).map_err(device_err)?;

        let caps = device.query_caps().map_err(device_err)?;
        info!("Device: {} ({})", caps.card, caps.driver);

        if !caps.capabilities.contains(CapFlags::VIDEO_CAPTURE) {
            return Err(CaptureError::unavailable(
                NAME,
                "device doesn't support video capture",
            ));
        }

        let mut fmt = device.format().map_err(device_err)?;
        fmt.width = config.width;
        fmt.height = config.height;
        fmt.fourcc = match config.format {
            PixelFormat::Mjpeg => FourCC::new(b"MJPG"),
            PixelFormat::Yuyv4 => FourCC::new(b"YUYV"),
            PixelFormat::Rgb24 => FourCC::new(b"RGB3"),
            PixelFormat::Bgr24 => FourCC::new(b"BGR3"),
        };
        let fmt = device.set_format(&fmt).map_err(device_err)?;
        if (fmt.width, fmt.height) != (config.width, config.height) {
            info!(
                "Driver chose {}x{} instead of {}x{}",
                fmt.width, fmt.height, config.width, config.height
            );
        }

        let device = Box::new(device);
        let stream = MmapStream::with_buffers(&device, Type::VideoCapture, config.buffer_count)
            .map_err(device_err)?;
        info!(
            "Capture stream started with {} buffers",
            config.buffer_count
        );

        let config = CameraConfig {
            width: fmt.width,
            height: fmt.height,
            ..config
        };

        Ok(Self {
            stream: Some(stream),
            _device: device,
            config,
            stride: fmt.stride,
            sequence: 0,
            timeout: None,
        })
    }
}

impl FrameSource for V4l2Capture {
    fn name(&self) -> &str {
        NAME
    }

    fn read(&mut self, timeout: Duration) -> Result<Frame, CaptureError> {
        let timestamp = Instant::now();

        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| CaptureError::unavailable(NAME, "stream closed"))?;

        if self.timeout != Some(timeout) {
            stream.set_timeout(timeout);
            self.timeout = Some(timeout);
        }

        let (buf, meta) = stream.next().map_err(|e| match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => CaptureError::Timeout {
                name: NAME.to_owned(),
                timeout_ms: timeout.as_millis() as u64,
            },
            _ => CaptureError::device(NAME, e),
        })?;

        // Some drivers leave bytesused at 0
        let used = match meta.bytesused as usize {
            0 => buf.len(),
            n => n.min(buf.len()),
        };
        let data = Bytes::copy_from_slice(&buf[..used]);
        self.sequence += 1;

        let raw = Frame::raw(
            data,
            self.config.width,
            self.config.height,
            self.config.format,
            self.sequence,
            timestamp,
        );
        let raw = match self.config.format {
            PixelFormat::Mjpeg => raw,
            _ => raw.with_stride(self.stride),
        };
        decoder::normalize(raw, NAME)
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            info!("Capture stream stopped after {} frames", self.sequence);
        }
    }
}
