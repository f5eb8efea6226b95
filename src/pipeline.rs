use image::{DynamicImage, ImageReader, RgbaImage};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::config::{Config, RenderOptions};
use crate::error::{Result, WatermarkError};
use crate::exif::{self, PhotoMetadata, Tag, TagMap, TagSource};
use crate::layout;
use crate::render::{self, Typeface};
use crate::session::{self, CancelToken, RenderSession};

/// Supported image extensions (everything the decoder is built with).
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tif", "tiff", "bmp"];

/// Source container of a photo, determined by its file extension.
///
/// # Example
///
/// ```rust
/// use emblem::pipeline::ImageKind;
/// use std::path::Path;
///
/// assert_eq!(ImageKind::from_path(Path::new("IMG_0001.JPG")), Some(ImageKind::Jpeg));
/// assert_eq!(ImageKind::from_path(Path::new("scan.bmp")), Some(ImageKind::Bmp));
/// assert_eq!(ImageKind::from_path(Path::new("clip.mp4")), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ImageKind {
    Jpeg,
    Png,
    WebP,
    Tiff,
    Bmp,
}

impl ImageKind {
    /// Determine the image kind from a file path extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "tif" | "tiff" => Some(Self::Tiff),
            "bmp" => Some(Self::Bmp),
            _ => None,
        }
    }

    /// Whether the container usually carries an EXIF block worth copying.
    pub fn carries_exif(self) -> bool {
        matches!(self, Self::Jpeg | Self::WebP | Self::Png)
    }
}

/// A decoded photo: upright pixels plus the metadata read from its file.
///
/// Loaded once and shared read-only by every render pass.
#[derive(Debug, Clone)]
pub struct Photo {
    pub image: RgbaImage,
    pub metadata: PhotoMetadata,
    pub source: PathBuf,
    /// Raw tag values, kept for display.
    pub tags: TagMap,
}

/// The result of watermarking a single image.
#[derive(Debug, Default, serde::Serialize)]
pub struct ProcessResult {
    pub path: PathBuf,
    pub image_kind: Option<ImageKind>,
    pub metadata: PhotoMetadata,
    /// The planned watermark text, top to bottom.
    pub lines: Vec<String>,
    pub output_path: Option<PathBuf>,
    pub error: Option<String>,
}

/// Collect supported image files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks).
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_supported_image(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// Check if a file has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Rotate/flip pixels so that EXIF orientation `orientation` displays upright.
pub fn apply_orientation(image: DynamicImage, orientation: u16) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

/// Decode `path`, read its EXIF and return the upright photo.
pub fn load_photo(path: &Path) -> Result<Photo> {
    let decoded = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| WatermarkError::Decode(format!("{}: {e}", path.display())))?
        .decode()
        .map_err(|e| WatermarkError::Decode(format!("{}: {e}", path.display())))?;

    let tags = exif::read_tags(path);
    let orientation = tags
        .attribute(Tag::Orientation)
        .and_then(|o| o.parse::<u16>().ok())
        .unwrap_or(1);
    if orientation != 1 {
        log::debug!("Applying EXIF orientation {orientation} to {}", path.display());
    }

    let image = apply_orientation(decoded, orientation).into_rgba8();
    let metadata = PhotoMetadata::from_tags(&tags);

    Ok(Photo {
        image,
        metadata,
        source: path.to_path_buf(),
        tags,
    })
}

/// Watermark a photo: plan its lines and render them onto a copy.
pub fn compose<R: Rng>(
    photo: &Photo,
    options: &RenderOptions,
    typeface: &Typeface,
    rng: &mut R,
    cancel: &CancelToken,
) -> Result<RgbaImage> {
    let lines = layout::plan(&photo.metadata, options);
    render::render(&photo.image, &lines, options, typeface, rng, cancel)
}

/// Load, watermark and export a single image.
///
/// Errors never propagate: they end up in [`ProcessResult::error`].
///
/// # Example
///
/// ```rust,no_run
/// use emblem::config::Config;
/// use emblem::pipeline::process_image;
/// use emblem::render::Typeface;
/// use emblem::session::RenderSession;
/// use std::path::Path;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load(Some("config.json".as_ref()))?;
/// let mut session = RenderSession::new(Typeface::from_config(&config.font)?);
///
/// let result = process_image(Path::new("DSC_0042.jpg"), &config, &mut session).await;
/// if let Some(ref out) = result.output_path {
///     println!("Saved {}", out.display());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn process_image(
    path: &Path,
    config: &Config,
    session: &mut RenderSession,
) -> ProcessResult {
    let mut result = ProcessResult {
        path: path.to_path_buf(),
        image_kind: ImageKind::from_path(path),
        ..Default::default()
    };

    let photo = match load_photo(path) {
        Ok(photo) => photo,
        Err(e) => {
            result.error = Some(e.to_string());
            return result;
        }
    };

    let lines = layout::plan(&photo.metadata, &config.watermark);
    result.lines = lines.lines;
    result.metadata = photo.metadata.clone();

    let handle = session.submit(Arc::new(photo), config.watermark.clone(), config.seed);
    let watermarked = match handle.wait().await {
        Ok(image) => image,
        Err(e) => {
            result.error = Some(e.to_string());
            return result;
        }
    };

    let source = result
        .image_kind
        .filter(|kind| kind.carries_exif())
        .map(|_| path.to_path_buf());
    let export = session::spawn_export(watermarked, source, config.output.clone());
    match export.await {
        Ok(Some(output)) => result.output_path = Some(output),
        Ok(None) => result.error = Some("Export failed".to_string()),
        Err(e) => result.error = Some(WatermarkError::Task(e.to_string()).to_string()),
    }

    result
}
