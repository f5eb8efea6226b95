use img_parts::{Bytes, DynImage, ImageEXIF};
use nom_exif::*;
use std::io::Cursor;
use std::path::Path;

use super::metadata::parse_timestamp;
use super::tags::{Tag, TagMap};

/// APP1 identifier that precedes the TIFF block in a JPEG.
const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Read the watermark-relevant EXIF tags from an image file.
///
/// nom-exif handles JPEG and TIFF directly. For PNG `eXIf` and WebP `EXIF`
/// chunks the raw block is pulled out with img-parts and parsed as if it
/// came from a JPEG. Files without EXIF yield an empty tag set: every field
/// of the watermark is optional.
pub fn read_tags(path: &Path) -> TagMap {
    let tags = match MediaSource::file_path(path) {
        Ok(ms) => match MediaParser::new().parse(ms) {
            Ok(iter) => collect_tags(iter),
            Err(e) => {
                log::debug!("nom-exif found no EXIF in {}: {e}", path.display());
                TagMap::default()
            }
        },
        Err(e) => {
            log::debug!("Cannot open {} for EXIF parsing: {e}", path.display());
            return TagMap::default();
        }
    };
    if !tags.is_empty() {
        log::debug!("Read {} EXIF tag(s) from {}", tags.len(), path.display());
        return tags;
    }

    let Some(tiff) = embedded_exif(path) else {
        return tags;
    };
    let tags = read_tiff_block(&tiff);
    log::debug!(
        "Read {} EXIF tag(s) from the embedded block of {}",
        tags.len(),
        path.display()
    );
    tags
}

/// Parse a bare TIFF-structured EXIF block.
pub fn read_tiff_block(tiff: &[u8]) -> TagMap {
    let Some(jpeg) = wrap_in_app1(tiff) else {
        log::debug!("EXIF block of {} bytes is too large for APP1", tiff.len());
        return TagMap::default();
    };
    let ms = match MediaSource::seekable(Cursor::new(jpeg)) {
        Ok(ms) => ms,
        Err(e) => {
            log::debug!("Cannot wrap EXIF block for parsing: {e}");
            return TagMap::default();
        }
    };
    match MediaParser::new().parse(ms) {
        Ok(iter) => collect_tags(iter),
        Err(e) => {
            log::debug!("Malformed EXIF block: {e}");
            TagMap::default()
        }
    }
}

/// The EXIF block of a container img-parts understands (JPEG, PNG, WebP).
fn embedded_exif(path: &Path) -> Option<Vec<u8>> {
    let bytes = std::fs::read(path).ok()?;
    let image = DynImage::from_bytes(Bytes::from(bytes)).ok()??;
    let exif = image.exif()?;
    // Some writers keep the JPEG identifier inside the WebP chunk.
    let tiff = exif.strip_prefix(EXIF_HEADER).unwrap_or(&exif[..]);
    Some(tiff.to_vec())
}

/// A JPEG holding nothing but an APP1 segment with `tiff`.
fn wrap_in_app1(tiff: &[u8]) -> Option<Vec<u8>> {
    let segment_len = u16::try_from(2 + EXIF_HEADER.len() + tiff.len()).ok()?;
    let mut jpeg = Vec::with_capacity(tiff.len() + 16);
    jpeg.extend_from_slice(&[0xFF, 0xD8, 0xFF, 0xE1]);
    jpeg.extend_from_slice(&segment_len.to_be_bytes());
    jpeg.extend_from_slice(EXIF_HEADER);
    jpeg.extend_from_slice(tiff);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    Some(jpeg)
}

fn collect_tags(iter: ExifIter) -> TagMap {
    let exif: Exif = iter.into();
    let mut tags = TagMap::new();
    for tag in Tag::ALL {
        if let Some(value) = exif
            .get_by_ifd_tag_code(0, tag.code())
            .and_then(|val| entry_to_tag_value(tag, val))
        {
            tags.insert(tag, value);
        }
    }
    tags
}

/// Convert an EntryValue into the string convention of [`TagSource`](super::TagSource).
fn entry_to_tag_value(tag: Tag, val: &EntryValue) -> Option<String> {
    match val {
        EntryValue::URational(r) if tag == Tag::FocalLength => Some(format!("{}/{}", r.0, r.1)),
        EntryValue::URational(r) => decimal(r.0 as f64, r.1 as f64),
        _ if tag == Tag::DateTimeOriginal => {
            let raw = entry_to_string(val)?;
            match parse_timestamp(&raw) {
                Some(ts) => Some(ts.format("%Y:%m:%d %H:%M:%S").to_string()),
                None => Some(raw),
            }
        }
        _ => entry_to_string(val),
    }
}

/// Convert an EntryValue to an Option<String>.
fn entry_to_string(val: &EntryValue) -> Option<String> {
    let s = val.to_string();
    let s = s.trim().trim_matches('"').trim_end_matches('\0').trim().to_string();
    if s.is_empty() { None } else { Some(s) }
}

/// Render a rational as a decimal string, keeping one fractional digit for
/// whole numbers (`4/1` → `"4.0"`, `28/10` → `"2.8"`).
fn decimal(num: f64, den: f64) -> Option<String> {
    if den == 0.0 {
        return None;
    }
    let v = num / den;
    if v.fract() == 0.0 {
        Some(format!("{v:.1}"))
    } else {
        Some(format!("{v}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderOptions;
    use crate::exif::{PhotoMetadata, TagSource};
    use crate::export::{self, Codec};
    use crate::{layout, test_helpers};
    use std::fs;
    use tempfile::TempDir;

    fn canon_jpeg(dir: &Path) -> std::path::PathBuf {
        test_helpers::write_jpeg_with_tiff(dir, "canon.jpg", 8, 8, test_helpers::canon_r5_tiff())
    }

    /// Re-encode a small image in `codec` with the Canon block carried over.
    fn carried_over(dir: &Path, codec: Codec, name: &str) -> std::path::PathBuf {
        let source = canon_jpeg(dir);
        let image = image::RgbaImage::from_pixel(8, 8, image::Rgba([90, 90, 90, 255]));
        let encoded = export::encode(&image, codec).unwrap();
        let path = dir.join(name);
        fs::write(&path, export::carry_exif(encoded, &source)).unwrap();
        path
    }

    fn png_with_canon_exif(dir: &Path) -> std::path::PathBuf {
        let source = canon_jpeg(dir);
        let mut png = std::io::Cursor::new(Vec::new());
        image::RgbaImage::from_pixel(8, 8, image::Rgba([90, 90, 90, 255]))
            .write_to(&mut png, image::ImageFormat::Png)
            .unwrap();
        let path = dir.join("canon.png");
        fs::write(&path, export::carry_exif(png.into_inner(), &source)).unwrap();
        path
    }

    fn assert_canon_exposure(tags: &TagMap) {
        assert_eq!(tags.attribute(Tag::Model).as_deref(), Some("Canon EOS R5"));
        assert_eq!(tags.attribute(Tag::FNumber).as_deref(), Some("2.8"));
        assert_eq!(tags.attribute(Tag::ExposureTime).as_deref(), Some("0.004"));
        assert_eq!(tags.attribute(Tag::FocalLength).as_deref(), Some("50/1"));
        assert_eq!(tags.attribute(Tag::PhotographicSensitivity).as_deref(), Some("400"));
        assert_eq!(
            tags.attribute(Tag::DateTimeOriginal).as_deref(),
            Some("2024:05:01 14:30:09")
        );
    }

    // ── exif sub-IFD ──────────────────────────────────────────────────

    #[test]
    fn read_tags_exposure_from_exif_ifd() {
        let dir = TempDir::new().unwrap();
        let tags = read_tags(&canon_jpeg(dir.path()));
        assert_canon_exposure(&tags);
        assert_eq!(tags.attribute(Tag::Make).as_deref(), Some("Canon"));
    }

    #[test]
    fn file_tags_plan_the_expected_caption() {
        let dir = TempDir::new().unwrap();
        let meta = PhotoMetadata::from_tags(&read_tags(&canon_jpeg(dir.path())));
        let lines = layout::plan(&meta, &RenderOptions::default());
        assert_eq!(
            lines.lines,
            vec![
                "Canon EOS R5".to_string(),
                "ƒ/2.8 • 1/250 • 50mm • ISO400  05/01  14:30:09".to_string(),
            ]
        );
    }

    #[test]
    fn read_tiff_block_directly() {
        assert_canon_exposure(&read_tiff_block(&test_helpers::canon_r5_tiff()));
        assert!(read_tiff_block(b"not a tiff").is_empty());
    }

    #[test]
    fn oversized_block_is_not_wrapped() {
        assert!(wrap_in_app1(&vec![0u8; 70_000]).is_none());
        let wrapped = wrap_in_app1(b"II*\0").unwrap();
        assert_eq!(&wrapped[..4], &[0xFF, 0xD8, 0xFF, 0xE1]);
        assert_eq!(u16::from_be_bytes([wrapped[4], wrapped[5]]), 12);
    }

    // ── containers ────────────────────────────────────────────────────

    #[test]
    fn read_tags_from_webp_exif_chunk() {
        let dir = TempDir::new().unwrap();
        let path = carried_over(dir.path(), Codec::WebpLossless, "carried.webp");
        let tags = read_tags(&path);
        assert_canon_exposure(&tags);
        assert_eq!(tags.attribute(Tag::Orientation).as_deref(), Some("1"));
    }

    #[test]
    fn read_tags_from_jpeg_export() {
        let dir = TempDir::new().unwrap();
        let path = carried_over(dir.path(), Codec::Jpeg, "carried.jpg");
        assert_canon_exposure(&read_tags(&path));
    }

    #[test]
    fn read_tags_from_png_exif_chunk() {
        let dir = TempDir::new().unwrap();
        assert_canon_exposure(&read_tags(&png_with_canon_exif(dir.path())));
    }

    #[test]
    fn embedded_exif_is_a_bare_tiff_block() {
        let dir = TempDir::new().unwrap();
        let png = png_with_canon_exif(dir.path());
        let tiff = embedded_exif(&png).unwrap();
        assert!(tiff.starts_with(b"II*\0"));
    }

    // ── decimal ───────────────────────────────────────────────────────

    #[test]
    fn decimal_whole_numbers_keep_one_digit() {
        assert_eq!(decimal(4.0, 1.0).as_deref(), Some("4.0"));
        assert_eq!(decimal(2.0, 1.0).as_deref(), Some("2.0"));
    }

    #[test]
    fn decimal_fractions() {
        assert_eq!(decimal(28.0, 10.0).as_deref(), Some("2.8"));
        assert_eq!(decimal(1.0, 250.0).as_deref(), Some("0.004"));
    }

    #[test]
    fn decimal_zero_denominator() {
        assert_eq!(decimal(1.0, 0.0), None);
    }

    // ── no metadata ───────────────────────────────────────────────────

    #[test]
    fn read_tags_missing_file() {
        let tags = read_tags(Path::new("/nonexistent/photo.jpg"));
        assert!(tags.is_empty());
    }

    #[test]
    fn read_tags_png_without_exif() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.png");
        image::RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let tags = read_tags(&path);
        assert!(tags.is_empty());
    }

    #[test]
    fn read_tags_garbage_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        fs::write(&path, b"definitely not a jpeg").unwrap();

        assert!(read_tags(&path).is_empty());
    }
}
