//! Encoding and saving watermarked images.
//!
//! Output goes to `<directory>/<app_name>/<app_name>_<epoch-millis>.<ext>`.
//! When enabled, the source photo's EXIF block is copied into the new file
//! with its orientation reset, since the pixels were already rotated on load.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, RgbaImage};
use img_parts::{Bytes, DynImage, ImageEXIF};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::OutputConfig;
use crate::error::{Result, WatermarkError};

pub const JPEG_QUALITY: u8 = 100;

const TAG_ORIENTATION: u16 = 0x0112;
const TYPE_SHORT: u16 = 3;

/// Output file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Codec {
    /// Lossless WebP (keeps alpha).
    #[default]
    #[serde(rename = "webp")]
    #[cfg_attr(feature = "cli", value(name = "webp"))]
    WebpLossless,
    /// Baseline JPEG at quality 100 (alpha dropped).
    Jpeg,
}

impl Codec {
    pub fn extension(self) -> &'static str {
        match self {
            Codec::WebpLossless => "webp",
            Codec::Jpeg => "jpg",
        }
    }
}

/// Encode `image` in memory.
pub fn encode(image: &RgbaImage, codec: Codec) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    match codec {
        Codec::WebpLossless => {
            image.write_with_encoder(WebPEncoder::new_lossless(&mut buf))?;
        }
        Codec::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY))?;
        }
    }
    Ok(buf)
}

/// Base directory for exports: configured, else the pictures folder, else `.`.
pub fn output_dir(output: &OutputConfig) -> PathBuf {
    let base = output
        .directory
        .clone()
        .or_else(dirs::picture_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    base.join(&output.app_name)
}

pub fn file_name(app_name: &str, codec: Codec, millis: i64) -> String {
    format!("{app_name}_{millis}.{}", codec.extension())
}

/// Create a new timestamped file in `dir`, bumping the millis until the
/// name is free.
fn create_unique(dir: &Path, app_name: &str, codec: Codec) -> io::Result<(PathBuf, File)> {
    let mut millis = chrono::Utc::now().timestamp_millis();
    loop {
        let path = dir.join(file_name(app_name, codec, millis));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => millis += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Copy the EXIF block of `source` into `encoded`.
///
/// Any failure leaves `encoded` as it was: a watermark without metadata is
/// still a valid export.
pub fn carry_exif(encoded: Vec<u8>, source: &Path) -> Vec<u8> {
    let source_exif = match std::fs::read(source) {
        Ok(bytes) => match DynImage::from_bytes(Bytes::from(bytes)) {
            Ok(Some(img)) => img.exif(),
            _ => None,
        },
        Err(e) => {
            log::warn!("Cannot re-read {} for metadata: {e}", source.display());
            None
        }
    };
    let Some(exif) = source_exif else {
        log::debug!("No EXIF to carry over from {}", source.display());
        return encoded;
    };

    let mut exif = exif.to_vec();
    reset_orientation(&mut exif);

    let mut target = match DynImage::from_bytes(Bytes::from(encoded.clone())) {
        Ok(Some(img)) => img,
        _ => {
            log::warn!("Encoded output not recognised; skipping metadata carry-over");
            return encoded;
        }
    };
    target.set_exif(Some(Bytes::from(exif)));
    target.encoder().bytes().to_vec()
}

/// Rewrite IFD0 Orientation to 1 (top-left) in a TIFF block, in place.
///
/// Returns whether the tag was found.
pub fn reset_orientation(tiff: &mut [u8]) -> bool {
    if tiff.len() < 8 {
        return false;
    }
    let big_endian = match &tiff[0..2] {
        b"MM" => true,
        b"II" => false,
        _ => return false,
    };
    let read_u16 = |data: &[u8], offset: usize| -> u16 {
        let bytes = [data[offset], data[offset + 1]];
        if big_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        }
    };
    let read_u32 = |data: &[u8], offset: usize| -> u32 {
        let bytes = [data[offset], data[offset + 1], data[offset + 2], data[offset + 3]];
        if big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        }
    };

    let ifd0 = read_u32(tiff, 4) as usize;
    if ifd0 + 2 > tiff.len() {
        return false;
    }
    let count = read_u16(tiff, ifd0) as usize;
    let start = ifd0 + 2;
    if start + count * 12 > tiff.len() {
        return false;
    }

    for i in 0..count {
        let entry = start + i * 12;
        if read_u16(tiff, entry) == TAG_ORIENTATION && read_u16(tiff, entry + 2) == TYPE_SHORT {
            let one = if big_endian {
                1u16.to_be_bytes()
            } else {
                1u16.to_le_bytes()
            };
            tiff[entry + 8..entry + 10].copy_from_slice(&one);
            return true;
        }
    }
    false
}

/// Encode and save `image`, returning the written path.
///
/// `source` is the original file, used for metadata carry-over.
pub fn export(image: &RgbaImage, source: Option<&Path>, output: &OutputConfig) -> Result<PathBuf> {
    let dir = output_dir(output);
    std::fs::create_dir_all(&dir)
        .map_err(|e| WatermarkError::Storage(format!("{}: {e}", dir.display())))?;

    let mut bytes = encode(image, output.codec)?;
    if output.preserve_metadata {
        if let Some(source) = source {
            bytes = carry_exif(bytes, source);
        }
    }

    let (path, mut file) = create_unique(&dir, &output.app_name, output.codec)
        .map_err(|e| WatermarkError::Storage(format!("{}: {e}", dir.display())))?;
    file.write_all(&bytes)
        .map_err(|e| WatermarkError::Storage(format!("{}: {e}", path.display())))?;

    log::info!("Saved {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

/// [`export`], logging failures instead of returning them.
pub fn export_or_log(
    image: &RgbaImage,
    source: Option<&Path>,
    output: &OutputConfig,
) -> Option<PathBuf> {
    match export(image, source, output) {
        Ok(path) => Some(path),
        Err(e) => {
            log::error!("Export failed: {e}");
            None
        }
    }
}
