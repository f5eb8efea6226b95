use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;

use super::tags::{Tag, TagSource};

/// Display-ready metadata of one photo.
///
/// Each field is independently optional: a missing tag, or one whose value
/// cannot be parsed, leaves the field `None`. Built once per loaded image
/// and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhotoMetadata {
    pub manufacturer: Option<String>,
    /// Camera model, with vendor naming quirks cleaned up.
    pub model: Option<String>,
    pub lens_model: Option<String>,
    /// Aperture as stored, e.g. `"2.8"`.
    pub f_number: Option<String>,
    /// `"1/250"` for sub-second exposures, the raw value otherwise.
    pub shutter_speed: Option<String>,
    /// Focal length without unit, 35mm-equivalent when available.
    pub focal_length: Option<String>,
    pub iso: Option<String>,
    pub captured_at: Option<NaiveDateTime>,
    pub copyright_holder: Option<String>,
}

impl PhotoMetadata {
    pub fn from_tags(tags: &dyn TagSource) -> Self {
        let manufacturer = tags.attribute(Tag::Make);
        let model = tags
            .attribute(Tag::Model)
            .map(|m| clean_model(manufacturer.as_deref(), &m));

        let captured_at = tags.attribute(Tag::DateTimeOriginal).and_then(|raw| {
            let parsed = parse_timestamp(&raw);
            if parsed.is_none() {
                log::debug!("Ignoring unparsable DateTimeOriginal {raw:?}");
            }
            parsed
        });

        Self {
            manufacturer,
            model,
            lens_model: tags.attribute(Tag::LensModel),
            f_number: tags.attribute(Tag::FNumber),
            shutter_speed: tags
                .attribute(Tag::ExposureTime)
                .and_then(|t| format_shutter_speed(&t)),
            focal_length: tags
                .attribute(Tag::FocalLengthIn35mmFilm)
                .or_else(|| tags.attribute(Tag::FocalLength).and_then(|f| format_focal_length(&f))),
            iso: tags.attribute(Tag::PhotographicSensitivity),
            captured_at,
            copyright_holder: tags.attribute(Tag::Copyright),
        }
    }

    /// The name printed on the copyright line: the override when non-empty,
    /// otherwise the Copyright tag, otherwise empty.
    pub fn author(&self, copyright_override: &str) -> String {
        let copyright_override = copyright_override.trim();
        if !copyright_override.is_empty() {
            copyright_override.to_string()
        } else {
            self.copyright_holder.clone().unwrap_or_default()
        }
    }
}

/// Nikon firmware names second/third generation bodies `_2`/`_3`
/// (`"NIKON Z 6_2"`); display them with Roman numerals.
pub fn clean_model(manufacturer: Option<&str>, model: &str) -> String {
    let is_nikon = model.contains("NIKON")
        || manufacturer.is_some_and(|m| m.to_uppercase().contains("NIKON"));
    if is_nikon {
        model.replace("_2", "Ⅱ").replace("_3", "Ⅲ")
    } else {
        model.to_string()
    }
}

/// Format an exposure time given in seconds.
///
/// One second or longer is shown as stored; shorter exposures become
/// `1/N` with `N = round(1 / t)`.
pub fn format_shutter_speed(exposure: &str) -> Option<String> {
    let raw = exposure.trim();
    let seconds = match parse_number(raw) {
        Some(s) if s > 0.0 => s,
        _ => {
            log::debug!("Ignoring unparsable ExposureTime {raw:?}");
            return None;
        }
    };

    if seconds >= 1.0 {
        Some(raw.to_string())
    } else {
        Some(format!("1/{}", (1.0 / seconds).round() as u64))
    }
}

/// Format a `num/den` focal length as a decimal truncated to at most two
/// fractional digits (`"243/10"` → `"24.3"`, `"50/1"` → `"50"`).
/// Anything that is not a fraction is passed through unchanged.
pub fn format_focal_length(focal: &str) -> Option<String> {
    let raw = focal.trim();
    let Some((num, den)) = raw.split_once('/') else {
        return Some(raw.to_string());
    };

    let num: f32 = num.trim().parse().ok()?;
    let den: f32 = den.trim().parse().ok()?;
    if den == 0.0 {
        log::debug!("Ignoring FocalLength with zero denominator {raw:?}");
        return None;
    }

    let mut text = (num / den).to_string();
    if let Some(dot) = text.find('.') {
        text.truncate((dot + 3).min(text.len()));
        if text.ends_with('.') {
            text.pop();
        }
    }
    Some(text)
}

/// Parse a capture timestamp in EXIF (`2024:05:01 14:30:00`), ISO or
/// RFC 3339 form. Time zone offsets are dropped; the local wall-clock
/// time is kept.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    ["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Accepts plain decimals and `num/den` rationals.
fn parse_number(raw: &str) -> Option<f64> {
    match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 { None } else { Some(num / den) }
        }
        None => raw.parse().ok(),
    }
}
