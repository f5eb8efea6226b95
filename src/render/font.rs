//! Glyph rasterisation on top of ab_glyph.
//!
//! Sizes are given as an em size in pixels (the way a paint's text size is
//! usually specified), converted to ab_glyph's height-based [`PxScale`].

use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont, point};
use std::fmt;
use std::path::Path;

use crate::config::FontConfig;
use crate::error::{Result, WatermarkError};

/// DejaVu Sans (Bitstream Vera derived, free license). Covers `ƒ`, `•`,
/// `©` and the Roman numerals used for Nikon model names.
const EMBEDDED_FONT_DATA: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// Vertical metrics of a font at a given em size, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    pub scale: PxScale,
    /// Distance from baseline to the top of the tallest glyphs (positive).
    pub ascent: f32,
    /// Distance from baseline to the bottom of descenders (negative).
    pub descent: f32,
}

impl LineMetrics {
    /// Baseline-to-baseline distance: `descent - ascent` in y-down terms.
    pub fn line_height(&self) -> f32 {
        self.ascent - self.descent
    }
}

/// A loaded font.
#[derive(Clone)]
pub struct Typeface {
    font: FontArc,
}

impl fmt::Debug for Typeface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Typeface")
            .field("glyphs", &self.font.glyph_count())
            .finish()
    }
}

impl Default for Typeface {
    fn default() -> Self {
        Self::embedded()
    }
}

impl Typeface {
    /// The font compiled into the crate.
    pub fn embedded() -> Self {
        let font = FontArc::try_from_slice(EMBEDDED_FONT_DATA)
            .expect("embedded font is a valid TrueType file");
        Self { font }
    }

    /// Load a TrueType/OpenType file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| WatermarkError::Font(format!("{}: {e}", path.display())))?;
        let font = FontArc::try_from_vec(data)
            .map_err(|e| WatermarkError::Font(format!("{}: {e}", path.display())))?;
        log::debug!("Loaded font {}", path.display());
        Ok(Self { font })
    }

    /// The configured font, or the embedded one when none is set.
    pub fn from_config(config: &FontConfig) -> Result<Self> {
        match &config.path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::embedded()),
        }
    }

    pub fn metrics(&self, em_size: f32) -> LineMetrics {
        let units_per_em = self.font.units_per_em().unwrap_or(1000.0);
        let scale = PxScale::from(em_size * self.font.height_unscaled() / units_per_em);
        let scaled = self.font.as_scaled(scale);
        LineMetrics {
            scale,
            ascent: scaled.ascent(),
            descent: scaled.descent(),
        }
    }

    /// Advance width of `text` in pixels, kerning included.
    pub fn measure(&self, text: &str, em_size: f32) -> f32 {
        let scaled = self.font.as_scaled(self.metrics(em_size).scale);
        let mut width = 0.0f32;
        let mut prev: Option<GlyphId> = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = prev {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        width
    }

    /// Rasterise `text` with its left edge at `x` and baseline at `baseline`.
    ///
    /// `plot` receives every covered pixel inside `width`×`height` with its
    /// coverage in `0.0..=1.0`.
    pub fn draw<F>(&self, text: &str, em_size: f32, x: f32, baseline: f32, width: u32, height: u32, mut plot: F)
    where
        F: FnMut(u32, u32, f32),
    {
        let scale = self.metrics(em_size).scale;
        let scaled = self.font.as_scaled(scale);

        let mut cursor_x = x;
        let mut prev: Option<GlyphId> = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = prev {
                cursor_x += scaled.kern(prev, id);
            }

            let glyph = id.with_scale_and_position(scale, point(cursor_x, baseline));
            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|px, py, coverage| {
                    let gx = px as i32 + bounds.min.x as i32;
                    let gy = py as i32 + bounds.min.y as i32;
                    if gx >= 0 && gy >= 0 && (gx as u32) < width && (gy as u32) < height {
                        plot(gx as u32, gy as u32, coverage.clamp(0.0, 1.0));
                    }
                });
            }

            cursor_x += scaled.h_advance(id);
            prev = Some(id);
        }
    }
}
