#[cfg(feature = "v4l2-capture")]
pub use device::{auto_detect_device, FoundDevice};

#[cfg(feature = "v4l2-capture")]
mod device {
    use tracing::info;
    use v4l::{capability::Flags, video::Capture, Device, FourCC};

    use crate::capture::frame::PixelFormat;
    use crate::error::CaptureError;

    // Detected capture device info
    #[derive(Debug, Clone)]
    pub struct FoundDevice {
        pub path: String,
        pub format: PixelFormat,
    }

    /// Finds the first capture device offering MJPEG or YUYV
    pub fn auto_detect_device() -> Result<FoundDevice, CaptureError> {
        use std::path::Path;

        info!("Auto-detecting capture devices...");

        for i in 0..10 {
            let path = format!("/dev/video{}", i);
            if !Path::new(&path).exists() {
                continue;
            }

            let Ok(dev) = Device::with_path(&path) else {
                continue;
            };
            let Ok(caps) = dev.query_caps() else {
                continue;
            };
            if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
                continue;
            }

            for fmt in dev.enum_formats().unwrap_or_default() {
                let format = if fmt.fourcc == FourCC::new(b"MJPG") {
                    PixelFormat::Mjpeg
                } else if fmt.fourcc == FourCC::new(b"YUYV") {
                    PixelFormat::Yuyv4
                } else {
                    continue;
                };
                info!("Found {} device: {} - {}", format, path, caps.card);
                return Ok(FoundDevice { path, format });
            }
        }

        Err(CaptureError::unavailable(
            "camera",
            "no suitable capture device found",
        ))
    }
}
