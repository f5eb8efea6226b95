//! # emblem
//!
//! EXIF-driven photo watermarking. Reads camera metadata from a photo,
//! composes a short caption (camera, lens, exposure, date, copyright) and
//! paints it onto the image, either as translucent text or concealed as a
//! text-shaped luminance perturbation that only shows up under contrast
//! stretching.
//!
//! ## Quick Start
//!
//! The pipeline module handles the full load → plan → render → export flow:
//!
//! ```rust,no_run
//! use emblem::config::Config;
//! use emblem::pipeline::{collect_images, process_image};
//! use emblem::render::Typeface;
//! use emblem::session::RenderSession;
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!     let mut session = RenderSession::new(Typeface::from_config(&config.font)?);
//!
//!     for path in collect_images(&[PathBuf::from("./photos")]) {
//!         let result = process_image(&path, &config, &mut session).await;
//!         match (&result.output_path, &result.error) {
//!             (Some(out), _) => println!("{} -> {}", path.display(), out.display()),
//!             (None, Some(err)) => eprintln!("{}: {err}", path.display()),
//!             (None, None) => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! Each stage can be called on its own. Rendering is synchronous and takes an
//! injected RNG, so a fixed seed gives reproducible output:
//!
//! ```rust,no_run
//! use emblem::config::{Layout, RenderOptions, WatermarkMode};
//! use emblem::exif::{PhotoMetadata, read_tags};
//! use emblem::render::{self, Typeface, concealed::perturbation_rng};
//! use emblem::session::CancelToken;
//! use emblem::{export, layout};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let path = Path::new("DSC_0042.jpg");
//! let image = image::open(path)?.into_rgba8();
//! let metadata = PhotoMetadata::from_tags(&read_tags(path));
//!
//! let options = RenderOptions {
//!     mode: WatermarkMode::Visible,
//!     layout: Layout::Compact,
//!     location: "Lisbon".into(),
//!     ..Default::default()
//! };
//! let lines = layout::plan(&metadata, &options);
//! let marked = render::render(
//!     &image,
//!     &lines,
//!     &options,
//!     &Typeface::embedded(),
//!     &mut perturbation_rng(Some(42)),
//!     &CancelToken::new(),
//! )?;
//!
//! let saved = export::export(&marked, Some(path), &Default::default())?;
//! println!("Saved {}", saved.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`exif`]: Tag reading (nom-exif) and metadata normalization
//! - [`layout`]: Caption planning from metadata and options
//! - [`render`]: Visible and concealed renderers, plus reveal
//! - [`export`]: Encoding, naming and metadata carry-over
//! - [`session`]: Supersedable background render passes
//! - [`pipeline`]: File discovery and the end-to-end flow
//! - [`config`]: JSON configuration

pub mod config;
pub mod error;
pub mod exif;
pub mod export;
pub mod layout;
pub mod pipeline;
pub mod render;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use error::{Result, WatermarkError};
