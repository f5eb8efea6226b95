//! Concealed watermark: a text-shaped luminance perturbation.
//!
//! The watermark text is rasterised into a coverage mask. Every pixel under
//! solid ink is nudged away from mid-grey by a random amount: light pixels
//! get darker, dark pixels get lighter. The shift is bounded so channels
//! never wrap, and the noise keeps the mark hard to see at normal contrast.

use image::{GrayImage, Luma, Rgba, RgbaImage};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{TextPlacement, Typeface, draw_lines};
use crate::config::Layout;
use crate::error::Result;
use crate::layout::WatermarkLines;
use crate::session::CancelToken;

/// Mask value at or above which a pixel counts as ink (50 % coverage).
pub const INK_THRESHOLD: u8 = 128;
/// Largest shift applied to any channel.
pub const MAX_DELTA: u8 = 100;

/// RNG for one concealed pass. A fixed seed makes output reproducible.
pub fn perturbation_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::seed_from_u64(rand::random()),
    }
}

/// Rasterise `lines` into a coverage mask the size of the image.
pub fn render_mask(
    width: u32,
    height: u32,
    lines: &WatermarkLines,
    placement: &TextPlacement,
    typeface: &Typeface,
    cancel: &CancelToken,
) -> Result<GrayImage> {
    let mut mask = GrayImage::new(width, height);
    draw_lines(typeface, lines, placement, width, height, cancel, |x, y, coverage| {
        let value = (coverage * 255.0).round() as u8;
        let px = mask.get_pixel_mut(x, y);
        // Overlapping glyph boxes keep the stronger coverage.
        if value > px[0] {
            *px = Luma([value]);
        }
    })?;
    Ok(mask)
}

/// Relative luminance in `0.0..=1.0`.
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    fn linear(c: u8) -> f32 {
        let c = c as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }
    0.2126 * linear(r) + 0.7152 * linear(g) + 0.0722 * linear(b)
}

/// Shift one pixel's colour channels by the same random amount, toward
/// black when it is light and toward white when it is dark.
pub fn perturb<R: Rng>(px: &mut Rgba<u8>, rng: &mut R) {
    let [r, g, b, _] = px.0;
    if luminance(r, g, b) > 0.5 {
        let bound = r.min(g).min(b).min(MAX_DELTA);
        let delta = rng.random_range(0..=bound);
        *px = Rgba([r - delta, g - delta, b - delta, 255]);
    } else {
        let bound = (255 - r).min(255 - g).min(255 - b).min(MAX_DELTA);
        let delta = rng.random_range(0..=bound);
        *px = Rgba([r + delta, g + delta, b + delta, 255]);
    }
}

/// Embed `lines` into a copy of `image`.
pub fn render<R: Rng>(
    image: &RgbaImage,
    lines: &WatermarkLines,
    layout: Layout,
    typeface: &Typeface,
    rng: &mut R,
    cancel: &CancelToken,
) -> Result<RgbaImage> {
    let (width, height) = image.dimensions();
    let placement = TextPlacement::compute(typeface, width, height, lines, layout);
    let mask = render_mask(width, height, lines, &placement, typeface, cancel)?;

    let mut out = image.clone();
    let mut touched = 0usize;
    for y in placement.band_top()..height {
        cancel.check()?;
        for x in 0..width {
            if mask.get_pixel(x, y)[0] >= INK_THRESHOLD {
                perturb(out.get_pixel_mut(x, y), rng);
                touched += 1;
            }
        }
    }

    log::debug!(
        "Concealed watermark: {} line(s), {touched} pixel(s) perturbed",
        lines.len()
    );
    Ok(out)
}
