use super::frame::{Frame, RGBA_CHANNELS};

// BT.601 luma weights in 14-bit fixed point (sum = 1 << 14).
const LUMA_SHIFT: u32 = 14;
const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;

fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = r as u32 * R_WEIGHT + g as u32 * G_WEIGHT + b as u32 * B_WEIGHT;
    ((y + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT) as u8
}

/// Single-channel luma plane of a frame, row-major, `width * height` bytes.
///
/// The alpha channel of RGBA input is ignored.
pub fn to_gray(frame: &Frame) -> Vec<u8> {
    let channels = frame.channels() as usize;
    let data = frame.data();
    match channels {
        1 => data.to_vec(),
        _ => data
            .chunks_exact(channels)
            .map(|px| luma(px[0], px[1], px[2]))
            .collect(),
    }
}

/// Converts a gray, RGB or RGBA frame into the 4-channel 8-bit layout.
///
/// Gray is replicated into the color channels; missing alpha is opaque.
/// RGBA frames are returned untouched without copying.
pub fn to_rgba(frame: Frame) -> Frame {
    let channels = frame.channels() as usize;
    if channels == RGBA_CHANNELS as usize {
        return frame;
    }

    let (width, height, index) = (frame.width(), frame.height(), frame.index());
    let pixel_count = width as usize * height as usize;
    let mut out = Vec::with_capacity(pixel_count * RGBA_CHANNELS as usize);
    for px in frame.data().chunks_exact(channels) {
        match channels {
            1 => out.extend_from_slice(&[px[0], px[0], px[0], u8::MAX]),
            _ => out.extend_from_slice(&[px[0], px[1], px[2], u8::MAX]),
        }
    }
    Frame::new(out, width, height, RGBA_CHANNELS, index)
}
