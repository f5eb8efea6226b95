//! Make a concealed watermark readable.
//!
//! Each channel's deviation from the mean of its horizontal neighbourhood is
//! amplified around mid-grey. Smooth regions flatten to grey while the
//! per-pixel noise of the perturbation stands out as bright text.

use image::{Rgba, RgbaImage};

/// Pixels on each side included in the neighbourhood mean.
pub const RADIUS: u32 = 4;
/// Default amplification applied by the CLI.
pub const DEFAULT_GAIN: f32 = 8.0;

pub fn reveal(image: &RgbaImage, gain: f32) -> RgbaImage {
    let (width, height) = image.dimensions();
    let mut out = RgbaImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let lo = x.saturating_sub(RADIUS);
            let hi = (x + RADIUS).min(width.saturating_sub(1));
            let count = (hi - lo + 1) as f32;

            let mut sums = [0.0f32; 3];
            for nx in lo..=hi {
                let px = image.get_pixel(nx, y);
                for c in 0..3 {
                    sums[c] += px[c] as f32;
                }
            }

            let px = image.get_pixel(x, y);
            let mut revealed = [0u8, 0, 0, 255];
            for c in 0..3 {
                let deviation = (px[c] as f32 - sums[c] / count).abs();
                revealed[c] = (128.0 + deviation * gain).clamp(0.0, 255.0) as u8;
            }
            out.put_pixel(x, y, Rgba(revealed));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Layout;
    use crate::layout::{Alignment, WatermarkLines};
    use crate::render::concealed::{self, perturbation_rng};
    use crate::render::{TextPlacement, Typeface};
    use crate::session::CancelToken;

    #[test]
    fn flat_image_reveals_flat_grey() {
        let image = RgbaImage::from_pixel(40, 10, Rgba([77, 150, 220, 255]));
        let out = reveal(&image, DEFAULT_GAIN);
        assert!(out.pixels().all(|p| *p == Rgba([128, 128, 128, 255])));
    }

    #[test]
    fn concealed_text_stands_out() {
        let face = Typeface::embedded();
        let lines = WatermarkLines {
            lines: vec!["EOS R5".to_string()],
            alignment: Alignment::Centered,
        };
        let image = RgbaImage::from_pixel(600, 600, Rgba([180, 180, 180, 255]));
        let mut rng = perturbation_rng(Some(5));
        let marked =
            concealed::render(&image, &lines, Layout::Full, &face, &mut rng, &CancelToken::new())
                .unwrap();

        let out = reveal(&marked, DEFAULT_GAIN);
        let top = TextPlacement::compute(&face, 600, 600, &lines, Layout::Full).band_top();

        // Above the text band nothing was perturbed.
        for y in 0..top {
            assert_eq!(out.get_pixel(300, y), &Rgba([128, 128, 128, 255]));
        }
        // Inside it, some pixels light up.
        let bright = (top..600)
            .flat_map(|y| (0..600).map(move |x| (x, y)))
            .filter(|&(x, y)| out.get_pixel(x, y)[0] > 200)
            .count();
        assert!(bright > 0);
    }
}
