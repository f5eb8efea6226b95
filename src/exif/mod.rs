//! EXIF reading and metadata normalization.
//!
//! - [`read_tags`]: Read the watermark-relevant tags from an image file (nom-exif)
//! - [`TagSource`]: Tag lookup abstraction; [`TagMap`] is the in-memory implementation
//! - [`PhotoMetadata`]: Display-ready fields derived from a tag source
//!
//! Every field is optional. Missing tags and malformed values are dropped,
//! never reported as errors.

mod metadata;
mod reader;
mod tags;

pub use metadata::{
    PhotoMetadata, clean_model, format_focal_length, format_shutter_speed, parse_timestamp,
};
pub use reader::{read_tags, read_tiff_block};
pub use tags::{Tag, TagMap, TagSource};
