//! Shared fixtures for unit tests.

use image::{Rgba, RgbaImage};
use img_parts::Bytes;
use img_parts::ImageEXIF;
use img_parts::jpeg::Jpeg;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// A value in a hand-built TIFF IFD.
#[derive(Debug, Clone)]
pub enum Field {
    Ascii(String),
    Short(u16),
    Long(u32),
    Rational(u32, u32),
}

impl Field {
    pub fn ascii(s: &str) -> Self {
        Field::Ascii(s.to_string())
    }

    fn type_code(&self) -> u16 {
        match self {
            Field::Ascii(_) => 2,
            Field::Short(_) => 3,
            Field::Long(_) => 4,
            Field::Rational(..) => 5,
        }
    }

    fn count(&self) -> u32 {
        match self {
            Field::Ascii(s) => s.len() as u32 + 1,
            _ => 1,
        }
    }

    fn bytes(&self) -> Vec<u8> {
        match self {
            Field::Ascii(s) => [s.as_bytes(), b"\0"].concat(),
            Field::Short(v) => v.to_le_bytes().to_vec(),
            Field::Long(v) => v.to_le_bytes().to_vec(),
            Field::Rational(num, den) => [num.to_le_bytes(), den.to_le_bytes()].concat(),
        }
    }
}

const TAG_EXIF_IFD: u16 = 0x8769;

/// Little-endian TIFF block with the given IFD0 entries and, when
/// `exif_ifd` is non-empty, an Exif sub-IFD linked from IFD0.
pub fn tiff_block(ifd0: &[(u16, Field)], exif_ifd: &[(u16, Field)]) -> Vec<u8> {
    let ifd_len = |entries: usize| 2 + entries as u32 * 12 + 4;

    let mut ifd0 = ifd0.to_vec();
    let exif_offset = 8 + ifd_len(ifd0.len() + usize::from(!exif_ifd.is_empty()));
    if !exif_ifd.is_empty() {
        ifd0.push((TAG_EXIF_IFD, Field::Long(exif_offset)));
    }

    let mut data_offset = 8 + ifd_len(ifd0.len());
    if !exif_ifd.is_empty() {
        data_offset += ifd_len(exif_ifd.len());
    }

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II");
    tiff.extend_from_slice(&42u16.to_le_bytes());
    tiff.extend_from_slice(&8u32.to_le_bytes());

    let mut data = Vec::new();
    write_ifd(&mut tiff, &mut data, &mut data_offset, &ifd0);
    if !exif_ifd.is_empty() {
        write_ifd(&mut tiff, &mut data, &mut data_offset, exif_ifd);
    }
    tiff.extend_from_slice(&data);
    tiff
}

fn write_ifd(
    out: &mut Vec<u8>,
    data: &mut Vec<u8>,
    data_offset: &mut u32,
    entries: &[(u16, Field)],
) {
    let mut entries = entries.to_vec();
    entries.sort_by_key(|(tag, _)| *tag);

    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for (tag, field) in &entries {
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&field.type_code().to_le_bytes());
        out.extend_from_slice(&field.count().to_le_bytes());

        let bytes = field.bytes();
        if bytes.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..bytes.len()].copy_from_slice(&bytes);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&data_offset.to_le_bytes());
            data.extend_from_slice(&bytes);
            if bytes.len() % 2 == 1 {
                data.push(0);
            }
            *data_offset += bytes.len().next_multiple_of(2) as u32;
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes());
}

/// Minimal TIFF block holding IFD0 `Make`, `Model` and `Orientation`.
pub fn exif_tiff(make: &str, model: &str, orientation: u16) -> Vec<u8> {
    tiff_block(
        &[
            (0x010F, Field::ascii(make)),
            (0x0110, Field::ascii(model)),
            (0x0112, Field::Short(orientation)),
        ],
        &[],
    )
}

/// A Canon EOS R5 frame: camera in IFD0, exposure and capture time in the
/// Exif sub-IFD.
pub fn canon_r5_tiff() -> Vec<u8> {
    tiff_block(
        &[
            (0x010F, Field::ascii("Canon")),
            (0x0110, Field::ascii("Canon EOS R5")),
            (0x0112, Field::Short(1)),
        ],
        &[
            (0x829A, Field::Rational(1, 250)),
            (0x829D, Field::Rational(28, 10)),
            (0x8827, Field::Short(400)),
            (0x9003, Field::ascii("2024:05:01 14:30:09")),
            (0x920A, Field::Rational(50, 1)),
        ],
    )
}

/// A `width`×`height` mid-grey JPEG with no metadata.
pub fn plain_jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = image::DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        width,
        height,
        Rgba([128, 128, 128, 255]),
    ))
    .to_rgb8();
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, image::ImageFormat::Jpeg)
        .unwrap();
    buf.into_inner()
}

/// Write a JPEG carrying an EXIF block with the given camera and orientation.
pub fn write_jpeg_with_exif(
    dir: &Path,
    name: &str,
    width: u32,
    height: u32,
    make: &str,
    model: &str,
    orientation: u16,
) -> PathBuf {
    write_jpeg_with_tiff(dir, name, width, height, exif_tiff(make, model, orientation))
}

/// Write a JPEG carrying `tiff` as its EXIF block.
pub fn write_jpeg_with_tiff(
    dir: &Path,
    name: &str,
    width: u32,
    height: u32,
    tiff: Vec<u8>,
) -> PathBuf {
    let mut jpeg = Jpeg::from_bytes(Bytes::from(plain_jpeg(width, height))).unwrap();
    jpeg.set_exif(Some(Bytes::from(tiff)));
    let path = dir.join(name);
    std::fs::write(&path, jpeg.encoder().bytes()).unwrap();
    path
}

/// Write a PNG whose left half is black and right half white.
pub fn write_split_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let image = RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    });
    let path = dir.join(name);
    image.save(&path).unwrap();
    path
}
