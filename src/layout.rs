//! Watermark text planning.
//!
//! Turns [`PhotoMetadata`] and [`RenderOptions`] into the one or two lines
//! the renderers draw. Segments whose toggle is off or whose value is
//! absent contribute nothing: no empty separators remain.

use serde::Serialize;

use crate::config::{Field, FieldToggles, Layout, RenderOptions};
use crate::exif::PhotoMetadata;

/// Separator between capture-info segments.
pub const INFO_SEPARATOR: &str = " • ";
/// Separator between model and lens.
pub const DEVICE_SEPARATOR: &str = " | ";

/// Horizontal placement of the lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Alignment {
    /// Centred on the image's vertical axis.
    Centered,
    /// Stacked from the left edge.
    Left,
}

/// Planned watermark text: up to two non-empty lines, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatermarkLines {
    pub lines: Vec<String>,
    pub alignment: Alignment,
}

impl WatermarkLines {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }
}

/// Plan the watermark lines for a photo.
pub fn plan(meta: &PhotoMetadata, options: &RenderOptions) -> WatermarkLines {
    let device = device_descriptor(meta, options);
    let info = capture_info(meta, options);
    let credit = copyright_with_date(meta, options);
    let location = options.location.trim();

    let (lines, alignment) = match options.layout {
        Layout::Full => (
            vec![
                device,
                join_non_empty(&[info.as_str(), location, credit.as_str()], "  "),
            ],
            Alignment::Centered,
        ),
        Layout::Compact => (
            vec![
                join_non_empty(&[location, credit.as_str()], " "),
                join_non_empty(&[device.as_str(), info.as_str()], "  "),
            ],
            Alignment::Left,
        ),
    };

    WatermarkLines {
        lines: lines.into_iter().filter(|l| !l.is_empty()).collect(),
        alignment,
    }
}

/// `Model | Lens`, optionally prefixed by the manufacturer.
pub fn device_descriptor(meta: &PhotoMetadata, options: &RenderOptions) -> String {
    let fields = &options.fields;
    let pick = |field, value| enabled_value(fields, field, value);

    let model = pick(Field::Model, &meta.model);
    let body = match model {
        // Most makers already repeat their name in the model string.
        Some(model) => match pick(Field::Manufacturer, &meta.manufacturer) {
            Some(make) if !model.to_lowercase().starts_with(&make.to_lowercase()) => {
                format!("{make} {model}")
            }
            _ => model.to_string(),
        },
        None => pick(Field::Manufacturer, &meta.manufacturer)
            .unwrap_or_default()
            .to_string(),
    };

    let lens = pick(Field::Lens, &meta.lens_model).unwrap_or_default();
    join_non_empty(&[body.as_str(), lens], DEVICE_SEPARATOR)
}

/// `ƒ/2.8 • 1/250 • 50mm • ISO400`, each segment optional.
pub fn capture_info(meta: &PhotoMetadata, options: &RenderOptions) -> String {
    let fields = &options.fields;
    let segment = |field, value, render: fn(&str) -> String| {
        enabled_value(fields, field, value).map(render)
    };

    let segments: Vec<String> = [
        segment(Field::FNumber, &meta.f_number, |v| format!("ƒ/{v}")),
        segment(Field::ShutterSpeed, &meta.shutter_speed, |v| v.to_string()),
        segment(Field::FocalLength, &meta.focal_length, |v| format!("{v}mm")),
        segment(Field::Iso, &meta.iso, |v| format!("ISO{v}")),
    ]
    .into_iter()
    .flatten()
    .collect();

    segments.join(INFO_SEPARATOR)
}

/// `05/01  14:30:00  Image © 2024`, each segment optional.
pub fn copyright_with_date(meta: &PhotoMetadata, options: &RenderOptions) -> String {
    let fields = &options.fields;
    let mut segments = Vec::new();

    if let Some(ts) = meta.captured_at {
        if fields.date {
            segments.push(ts.format("%m/%d").to_string());
        }
        if fields.time {
            segments.push(ts.format("%H:%M:%S").to_string());
        }
    }

    if fields.copyright && !meta.author(&options.copyright_override).is_empty() {
        match meta.captured_at {
            Some(ts) => segments.push(format!("Image © {}", ts.format("%Y"))),
            None => segments.push("Image ©".to_string()),
        }
    }

    segments.join("  ")
}

/// The trimmed value when its field is enabled and it is non-empty.
fn enabled_value<'a>(
    fields: &FieldToggles,
    field: Field,
    value: &'a Option<String>,
) -> Option<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| fields.is_enabled(field) && !v.is_empty())
}

fn join_non_empty(parts: &[&str], separator: &str) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}
