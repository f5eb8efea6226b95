use std::collections::HashMap;

/// EXIF tags consumed by the watermark pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Make,
    Model,
    LensModel,
    FNumber,
    ExposureTime,
    FocalLength,
    FocalLengthIn35mmFilm,
    /// ISO speed (`ISOSpeedRatings` / `PhotographicSensitivity`).
    PhotographicSensitivity,
    DateTimeOriginal,
    Copyright,
    Orientation,
}

impl Tag {
    pub const ALL: [Tag; 11] = [
        Tag::Make,
        Tag::Model,
        Tag::LensModel,
        Tag::FNumber,
        Tag::ExposureTime,
        Tag::FocalLength,
        Tag::FocalLengthIn35mmFilm,
        Tag::PhotographicSensitivity,
        Tag::DateTimeOriginal,
        Tag::Copyright,
        Tag::Orientation,
    ];

    /// Numeric tag ID as stored in the TIFF/EXIF IFDs.
    pub fn code(self) -> u16 {
        match self {
            Tag::Make => 0x010F,
            Tag::Model => 0x0110,
            Tag::Orientation => 0x0112,
            Tag::Copyright => 0x8298,
            Tag::ExposureTime => 0x829A,
            Tag::FNumber => 0x829D,
            Tag::PhotographicSensitivity => 0x8827,
            Tag::DateTimeOriginal => 0x9003,
            Tag::FocalLength => 0x920A,
            Tag::FocalLengthIn35mmFilm => 0xA405,
            Tag::LensModel => 0xA434,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tag::Make => "Make",
            Tag::Model => "Model",
            Tag::LensModel => "LensModel",
            Tag::FNumber => "FNumber",
            Tag::ExposureTime => "ExposureTime",
            Tag::FocalLength => "FocalLength",
            Tag::FocalLengthIn35mmFilm => "FocalLengthIn35mmFilm",
            Tag::PhotographicSensitivity => "ISO",
            Tag::DateTimeOriginal => "DateTimeOriginal",
            Tag::Copyright => "Copyright",
            Tag::Orientation => "Orientation",
        }
    }
}

/// Lookup of raw tag values by tag identifier.
///
/// Values use a string convention shared by all sources:
///
/// - `FNumber`, `ExposureTime`: decimal (`"2.8"`, `"0.004"`)
/// - `FocalLength`: rational `"num/den"` (`"50/1"`)
/// - integer tags: decimal (`"400"`)
/// - `DateTimeOriginal`: `"YYYY:MM:DD HH:MM:SS"`
///
/// A tag that is absent returns `None`; lookups never fail.
pub trait TagSource {
    fn attribute(&self, tag: Tag) -> Option<String>;
}

/// In-memory tag set.
///
/// Used for tags read from a file as well as for callers that already hold
/// metadata from elsewhere.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagMap {
    values: HashMap<Tag, String>,
}

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert. Blank values are ignored.
    pub fn with(mut self, tag: Tag, value: impl Into<String>) -> Self {
        self.insert(tag, value);
        self
    }

    pub fn insert(&mut self, tag: Tag, value: impl Into<String>) {
        let value = value.into();
        let value = value.trim();
        if !value.is_empty() {
            self.values.insert(tag, value.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Present tags in [`Tag::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, &str)> {
        Tag::ALL
            .into_iter()
            .filter_map(|tag| self.values.get(&tag).map(|v| (tag, v.as_str())))
    }
}

impl TagSource for TagMap {
    fn attribute(&self, tag: Tag) -> Option<String> {
        self.values.get(&tag).cloned()
    }
}

impl<T: TagSource + ?Sized> TagSource for &T {
    fn attribute(&self, tag: Tag) -> Option<String> {
        (**self).attribute(tag)
    }
}
