//! Image smoothing ahead of edge detection.

use ar_cube_core::GrayImageView;

/// Normalised 5-tap Gaussian `[1, 4, 6, 4, 1] / 16`: the 5x5 kernel whose
/// sigma is derived from its size.
pub const GAUSSIAN_5TAP: [f32; 5] = [0.0625, 0.25, 0.375, 0.25, 0.0625];

/// Separable 5x5 Gaussian blur with replicated borders.
pub fn gaussian_blur_5x5(src: &GrayImageView<'_>) -> Vec<u8> {
    let (w, h) = (src.width, src.height);
    let mut tmp = vec![0.0f32; w * h];
    let mut out = vec![0u8; w * h];
    if src.is_empty() {
        return out;
    }

    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, tap) in GAUSSIAN_5TAP.iter().enumerate() {
                let sx = x as i64 + k as i64 - 2;
                acc += tap * src.get_clamped(sx, y as i64) as f32;
            }
            tmp[y * w + x] = acc;
        }
    }

    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, tap) in GAUSSIAN_5TAP.iter().enumerate() {
                let sy = (y as i64 + k as i64 - 2).clamp(0, h as i64 - 1) as usize;
                acc += tap * tmp[sy * w + x];
            }
            out[y * w + x] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}
