//! Final display assembly: optional side-by-side layout plus the FPS readout

use font8x8::{UnicodeFonts, BASIC_FONTS};

use crate::capture::Frame;
use crate::error::DimensionMismatchError;

/// Top-left corner of the FPS text.
pub const TEXT_ANCHOR: (u32, u32) = (10, 10);
/// Each glyph pixel becomes a `TEXT_SCALE` x `TEXT_SCALE` block.
pub const TEXT_SCALE: u32 = 2;
pub const TEXT_COLOR: [u8; 3] = [0, 255, 0];

const GLYPH_SIZE: u32 = 8;

/// Builds the image handed to the display.
///
/// With `side_by_side` the adjusted primary frame is placed left of the
/// blended frame; otherwise the blended frame is shown alone. Inputs are not
/// modified.
pub fn compose(
    primary: &Frame,
    blended: &Frame,
    fps: f64,
    side_by_side: bool,
) -> Result<Frame, DimensionMismatchError> {
    let (width, height, mut pixels) = if side_by_side {
        if primary.height() != blended.height() {
            return Err(DimensionMismatchError {
                left: primary.dimensions(),
                right: blended.dimensions(),
            });
        }
        (
            primary.width() + blended.width(),
            blended.height(),
            hstack(primary, blended),
        )
    } else {
        (blended.width(), blended.height(), blended.data.to_vec())
    };

    draw_text(
        &mut pixels,
        width,
        height,
        TEXT_ANCHOR,
        &fps_label(fps),
    );
    Ok(Frame::derived(blended, width, height, pixels))
}

pub fn fps_label(fps: f64) -> String {
    format!("FPS: {:.1}", fps)
}

fn hstack(left: &Frame, right: &Frame) -> Vec<u8> {
    let left_stride = left.width() as usize * 3;
    let right_stride = right.width() as usize * 3;
    let mut out = Vec::with_capacity(left.data.len() + right.data.len());
    for (l, r) in left
        .data
        .chunks_exact(left_stride)
        .zip(right.data.chunks_exact(right_stride))
    {
        out.extend_from_slice(l);
        out.extend_from_slice(r);
    }
    out
}

/// Rasterises `text` into a packed RGB24 buffer, clipping at the edges.
/// Characters without a glyph are left blank.
pub fn draw_text(pixels: &mut [u8], width: u32, height: u32, anchor: (u32, u32), text: &str) {
    let advance = GLYPH_SIZE * TEXT_SCALE;
    for (i, c) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(c) else {
            continue;
        };
        let origin_x = anchor.0 + i as u32 * advance;

        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if bits & (1 << col) == 0 {
                    continue;
                }
                let x0 = origin_x + col * TEXT_SCALE;
                let y0 = anchor.1 + row as u32 * TEXT_SCALE;
                for y in y0..(y0 + TEXT_SCALE).min(height) {
                    for x in x0..(x0 + TEXT_SCALE).min(width) {
                        let offset = (y as usize * width as usize + x as usize) * 3;
                        pixels[offset..offset + 3].copy_from_slice(&TEXT_COLOR);
                    }
                }
            }
        }
    }
}
