//! Normalises whatever layout a source delivered into packed RGB24

use bytes::Bytes;
use jpeg_decoder::{Decoder, PixelFormat as JpegFormat};

use super::frame::{Frame, PixelFormat};
use crate::error::CaptureError;

/// Converts `frame` to tightly packed RGB24.
///
/// Uncompressed layouts are read row by row using `meta.stride`, so padded
/// rows and trailing bytes are dropped. Packed RGB24 input is passed through
/// without copying.
pub fn normalize(frame: Frame, name: &str) -> Result<Frame, CaptureError> {
    let (width, height) = frame.dimensions();
    let format = frame.format();
    let decode_err = |reason: String| CaptureError::Decode {
        name: name.to_owned(),
        format: format.to_string(),
        reason,
    };

    let pixels = match format {
        PixelFormat::Rgb24 => packed_rows(&frame, 3).map_err(decode_err)?,
        PixelFormat::Bgr24 => {
            let src = packed_rows(&frame, 3).map_err(decode_err)?;
            Bytes::from(bgr_to_rgb(&src))
        }
        PixelFormat::Yuyv4 => {
            if width % 2 != 0 {
                return Err(decode_err(format!("odd width {} for 4:2:2", width)));
            }
            let src = packed_rows(&frame, 2).map_err(decode_err)?;
            Bytes::from(yuyv_to_rgb(&src))
        }
        PixelFormat::Mjpeg => {
            let (w, h, pixels) = decode_mjpeg(&frame.data).map_err(decode_err)?;
            if (w, h) != (width, height) {
                tracing::debug!(name, w, h, "MJPEG frame size differs from requested size");
            }
            return Ok(Frame::derived(&frame, w, h, pixels));
        }
    };

    Ok(Frame::derived(&frame, width, height, pixels))
}

/// Rows of `width * bytes_per_pixel` bytes, with any row padding removed.
fn packed_rows(frame: &Frame, bytes_per_pixel: usize) -> Result<Bytes, String> {
    let (width, height) = (frame.width() as usize, frame.height() as usize);
    if width == 0 || height == 0 {
        return Err(format!("empty frame {}x{}", width, height));
    }

    let row = width * bytes_per_pixel;
    let stride = match frame.meta.stride as usize {
        0 => row,
        s if s < row => return Err(format!("stride {} shorter than a {} byte row", s, row)),
        s => s,
    };
    let needed = stride * (height - 1) + row;
    if frame.data.len() < needed {
        return Err(format!(
            "short buffer: {} of {} bytes",
            frame.data.len(),
            needed
        ));
    }

    if stride == row {
        return Ok(frame.data.slice(..row * height));
    }
    let mut out = Vec::with_capacity(row * height);
    for line in frame.data.chunks(stride).take(height) {
        out.extend_from_slice(&line[..row]);
    }
    Ok(Bytes::from(out))
}

fn decode_mjpeg(data: &[u8]) -> Result<(u32, u32, Vec<u8>), String> {
    let mut decoder = Decoder::new(data);
    let pixels = decoder.decode().map_err(|e| e.to_string())?;
    let info = decoder
        .info()
        .ok_or_else(|| "missing JPEG header".to_string())?;
    let (width, height) = (u32::from(info.width), u32::from(info.height));

    let rgb = match info.pixel_format {
        JpegFormat::RGB24 => pixels,
        JpegFormat::L8 => pixels.iter().flat_map(|&l| [l, l, l]).collect(),
        other => return Err(format!("unsupported JPEG layout {:?}", other)),
    };
    Ok((width, height, rgb))
}

fn bgr_to_rgb(src: &[u8]) -> Vec<u8> {
    src.chunks_exact(3)
        .flat_map(|px| [px[2], px[1], px[0]])
        .collect()
}

/// BT.601 limited-range conversion, two pixels per macropixel.
fn yuyv_to_rgb(src: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len() / 2 * 3);
    for chunk in src.chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        out.extend_from_slice(&yuv_to_rgb(y0, u, v));
        out.extend_from_slice(&yuv_to_rgb(y1, u, v));
    }
    out
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = i32::from(y) - 16;
    let d = i32::from(u) - 128;
    let e = i32::from(v) - 128;
    let clip = |x: i32| ((x + 128) >> 8).clamp(0, 255) as u8;
    [
        clip(298 * c + 409 * e),
        clip(298 * c - 100 * d - 208 * e),
        clip(298 * c + 516 * d),
    ]
}
