//! Watermark rendering.
//!
//! - [`visible`]: Translucent text overlay
//! - [`concealed`]: Luminance perturbation under a text-shaped mask
//! - [`reveal`]: Contrast stretch that makes a concealed mark readable
//! - [`font`]: Glyph rasterisation (ab_glyph)
//!
//! Both renderers share [`TextPlacement`], so a concealed mark lands exactly
//! where the visible text would have been drawn. Neither mutates its input:
//! each works on a clone and returns it.

pub mod concealed;
pub mod font;
pub mod reveal;
pub mod visible;

use image::RgbaImage;
use rand::Rng;
use serde::Serialize;

use crate::config::{Layout, RenderOptions, WatermarkMode};
use crate::error::Result;
use crate::layout::{Alignment, WatermarkLines};
use crate::session::CancelToken;

pub use font::{LineMetrics, Typeface};

/// Text size as a fraction of the shorter image side, full layout.
pub const FULL_TEXT_RATIO: f32 = 0.03;
/// Text size as a fraction of the shorter image side, compact layout.
pub const COMPACT_TEXT_RATIO: f32 = 0.02;
/// Baseline of the first line as a fraction of height, full layout.
pub const FULL_BASELINE_RATIO: f32 = 0.9;
/// Left margin as a fraction of width, left-aligned text.
pub const COMPACT_MARGIN_RATIO: f32 = 0.01;

/// Where each watermark line goes on an image of a given size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextPlacement {
    /// Em size in pixels.
    pub text_size: f32,
    pub line_height: f32,
    /// Centre x for centred text, left edge for left-aligned text.
    pub anchor_x: f32,
    /// One baseline per line, top to bottom.
    pub baselines: Vec<f32>,
    pub alignment: Alignment,
}

impl TextPlacement {
    pub fn compute(
        typeface: &Typeface,
        width: u32,
        height: u32,
        lines: &WatermarkLines,
        layout: Layout,
    ) -> Self {
        let short_side = width.min(height) as f32;
        let text_size = match layout {
            Layout::Full => short_side * FULL_TEXT_RATIO,
            Layout::Compact => short_side * COMPACT_TEXT_RATIO,
        };
        let line_height = typeface.metrics(text_size).line_height();

        let first_baseline = match layout {
            Layout::Full => height as f32 * FULL_BASELINE_RATIO,
            Layout::Compact => height as f32 - 2.0 * line_height,
        };
        let alignment = lines.alignment;
        let anchor_x = match alignment {
            Alignment::Centered => width as f32 / 2.0,
            Alignment::Left => width as f32 * COMPACT_MARGIN_RATIO,
        };

        let mut baselines = Vec::with_capacity(lines.len());
        let mut y = first_baseline;
        for _ in 0..lines.len() {
            baselines.push(y);
            y += line_height;
        }

        Self {
            text_size,
            line_height,
            anchor_x,
            baselines,
            alignment,
        }
    }

    /// Left edge of a line of the given advance width.
    pub fn start_x(&self, line_width: f32) -> f32 {
        match self.alignment {
            Alignment::Centered => self.anchor_x - line_width / 2.0,
            Alignment::Left => self.anchor_x,
        }
    }

    /// First row that can hold ink, clamped at zero.
    pub fn band_top(&self) -> u32 {
        self.baselines
            .first()
            .map(|b| (b - self.line_height).floor().max(0.0) as u32)
            .unwrap_or(0)
    }
}

/// Rasterise every line at its placement, calling `plot` with each covered
/// pixel and its coverage. Checks `cancel` before each line.
pub(crate) fn draw_lines<F>(
    typeface: &Typeface,
    lines: &WatermarkLines,
    placement: &TextPlacement,
    width: u32,
    height: u32,
    cancel: &CancelToken,
    mut plot: F,
) -> Result<()>
where
    F: FnMut(u32, u32, f32),
{
    for (line, &baseline) in lines.iter().zip(&placement.baselines) {
        cancel.check()?;
        let x = placement.start_x(typeface.measure(line, placement.text_size));
        typeface.draw(line, placement.text_size, x, baseline, width, height, &mut plot);
    }
    Ok(())
}

/// Render `lines` onto a copy of `image` in the mode chosen by `options`.
///
/// With no lines the copy is returned unchanged.
pub fn render<R: Rng>(
    image: &RgbaImage,
    lines: &WatermarkLines,
    options: &RenderOptions,
    typeface: &Typeface,
    rng: &mut R,
    cancel: &CancelToken,
) -> Result<RgbaImage> {
    if lines.is_empty() {
        log::debug!("No watermark lines; returning an unmodified copy");
        return Ok(image.clone());
    }
    match options.mode {
        WatermarkMode::Visible => {
            visible::render(image, lines, options.layout, options.brightness, typeface, cancel)
        }
        WatermarkMode::Concealed => {
            concealed::render(image, lines, options.layout, typeface, rng, cancel)
        }
    }
}
