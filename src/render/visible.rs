//! Translucent text overlay.

use image::{Rgba, RgbaImage};

use super::{TextPlacement, Typeface, draw_lines};
use crate::config::{BrightnessBias, Layout};
use crate::error::Result;
use crate::layout::WatermarkLines;
use crate::session::CancelToken;

/// Ink opacity (out of 255).
pub const OVERLAY_ALPHA: u8 = 80;

pub fn ink_color(bias: BrightnessBias) -> Rgba<u8> {
    match bias {
        BrightnessBias::Darken => Rgba([0, 0, 0, OVERLAY_ALPHA]),
        BrightnessBias::Lighten => Rgba([255, 255, 255, OVERLAY_ALPHA]),
    }
}

/// Draw `lines` over a copy of `image`.
pub fn render(
    image: &RgbaImage,
    lines: &WatermarkLines,
    layout: Layout,
    bias: BrightnessBias,
    typeface: &Typeface,
    cancel: &CancelToken,
) -> Result<RgbaImage> {
    let (width, height) = image.dimensions();
    let placement = TextPlacement::compute(typeface, width, height, lines, layout);
    let ink = ink_color(bias);
    let mut out = image.clone();

    draw_lines(typeface, lines, &placement, width, height, cancel, |x, y, coverage| {
        let alpha = (ink[3] as f32 / 255.0) * coverage;
        let px = out.get_pixel_mut(x, y);
        blend(px, ink, alpha);
    })?;

    log::debug!(
        "Visible watermark: {} line(s) at {:.1}px",
        lines.len(),
        placement.text_size
    );
    Ok(out)
}

/// Source-over blend of `ink` at `alpha` onto `dst`. Destination alpha is
/// composited, not replaced.
fn blend(dst: &mut Rgba<u8>, ink: Rgba<u8>, alpha: f32) {
    if alpha <= 0.0 {
        return;
    }
    let inv = 1.0 - alpha;
    for c in 0..3 {
        dst[c] = (ink[c] as f32 * alpha + dst[c] as f32 * inv).round() as u8;
    }
    let dst_a = dst[3] as f32 / 255.0;
    dst[3] = ((alpha + dst_a * inv) * 255.0).round().min(255.0) as u8;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Alignment;

    fn one_line(text: &str) -> WatermarkLines {
        WatermarkLines {
            lines: vec![text.to_string()],
            alignment: Alignment::Centered,
        }
    }

    #[test]
    fn darken_only_darkens() {
        let image = RgbaImage::from_pixel(300, 200, Rgba([200, 200, 200, 255]));
        let out = render(
            &image,
            &one_line("ISO400"),
            Layout::Full,
            BrightnessBias::Darken,
            &Typeface::embedded(),
            &CancelToken::new(),
        )
        .unwrap();

        let mut changed = 0;
        for (a, b) in image.pixels().zip(out.pixels()) {
            assert!(b[0] <= a[0]);
            assert_eq!(b[3], 255);
            if a != b {
                changed += 1;
            }
        }
        assert!(changed > 0);
    }

    #[test]
    fn lighten_only_lightens() {
        let image = RgbaImage::from_pixel(300, 200, Rgba([50, 50, 50, 255]));
        let out = render(
            &image,
            &one_line("ISO400"),
            Layout::Full,
            BrightnessBias::Lighten,
            &Typeface::embedded(),
            &CancelToken::new(),
        )
        .unwrap();
        assert!(image.pixels().zip(out.pixels()).all(|(a, b)| b[0] >= a[0]));
        assert_ne!(image, out);
    }

    #[test]
    fn ink_is_translucent() {
        // Full coverage at alpha 80 moves 200 to about 137, never to black.
        let mut px = Rgba([200, 200, 200, 255]);
        blend(&mut px, ink_color(BrightnessBias::Darken), OVERLAY_ALPHA as f32 / 255.0);
        assert_eq!(px[0], 137);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn input_untouched() {
        let image = RgbaImage::from_pixel(120, 80, Rgba([90, 90, 90, 255]));
        let before = image.clone();
        let _ = render(
            &image,
            &one_line("Model"),
            Layout::Compact,
            BrightnessBias::Darken,
            &Typeface::embedded(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(image, before);
    }

    #[test]
    fn ink_stays_in_text_band() {
        let image = RgbaImage::from_pixel(400, 400, Rgba([200, 200, 200, 255]));
        let lines = one_line("Nikon Z 6Ⅱ");
        let face = Typeface::embedded();
        let out = render(
            &image,
            &lines,
            Layout::Full,
            BrightnessBias::Darken,
            &face,
            &CancelToken::new(),
        )
        .unwrap();
        let placement = TextPlacement::compute(&face, 400, 400, &lines, Layout::Full);
        let top = placement.band_top();
        for (_, y, px) in out.enumerate_pixels() {
            if y < top {
                assert_eq!(px, &Rgba([200, 200, 200, 255]));
            }
        }
    }
}
