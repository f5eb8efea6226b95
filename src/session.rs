//! Render scheduling.
//!
//! A [`RenderSession`] runs at most one watermark pass at a time. Submitting
//! a new pass flips the previous pass's [`CancelToken`]; the renderer polls it
//! between lines and rows, abandons its private copy of the image and
//! reports [`WatermarkError::Cancelled`]. Exports run on their own blocking
//! task and are never cancelled.

use image::RgbaImage;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;

use crate::config::{OutputConfig, RenderOptions};
use crate::error::{Result, WatermarkError};
use crate::pipeline::{self, Photo};
use crate::render::Typeface;
use crate::render::concealed::perturbation_rng;

/// Shared cancellation flag for one render pass.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once [`cancel`](Self::cancel) has been called.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(WatermarkError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Owns the font and the in-flight pass.
#[derive(Debug)]
pub struct RenderSession {
    typeface: Arc<Typeface>,
    current: Option<CancelToken>,
    generation: u64,
}

impl RenderSession {
    pub fn new(typeface: Typeface) -> Self {
        Self {
            typeface: Arc::new(typeface),
            current: None,
            generation: 0,
        }
    }

    pub fn typeface(&self) -> &Typeface {
        &self.typeface
    }

    /// Number of passes submitted so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a pass over `photo`, superseding any pass still running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(
        &mut self,
        photo: Arc<Photo>,
        options: RenderOptions,
        seed: Option<u64>,
    ) -> RenderHandle {
        self.cancel();
        self.generation += 1;

        let cancel = CancelToken::new();
        self.current = Some(cancel.clone());

        let typeface = Arc::clone(&self.typeface);
        let token = cancel.clone();
        let generation = self.generation;
        let task = tokio::task::spawn_blocking(move || {
            log::debug!("Render pass {generation} started for {}", photo.source.display());
            let mut rng = perturbation_rng(seed);
            pipeline::compose(&photo, &options, &typeface, &mut rng, &token)
        });

        RenderHandle {
            generation,
            cancel,
            task,
        }
    }

    /// Cancel the in-flight pass, if any.
    pub fn cancel(&mut self) {
        if let Some(previous) = self.current.take() {
            if !previous.is_cancelled() {
                log::debug!("Superseding render pass {}", self.generation);
            }
            previous.cancel();
        }
    }
}

/// A submitted render pass.
#[derive(Debug)]
pub struct RenderHandle {
    generation: u64,
    cancel: CancelToken,
    task: JoinHandle<Result<RgbaImage>>,
}

impl RenderHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the pass to finish.
    ///
    /// A pass that was superseded yields `Cancelled` even if it completed,
    /// so stale results are never delivered.
    pub async fn wait(self) -> Result<RgbaImage> {
        let image = match self.task.await {
            Ok(result) => result?,
            Err(e) if e.is_cancelled() => return Err(WatermarkError::Cancelled),
            Err(e) => return Err(WatermarkError::Task(e.to_string())),
        };
        self.cancel.check()?;
        Ok(image)
    }
}

/// Save `image` on a blocking task. Failures are logged, not returned.
pub fn spawn_export(
    image: RgbaImage,
    source: Option<PathBuf>,
    output: OutputConfig,
) -> JoinHandle<Option<PathBuf>> {
    tokio::task::spawn_blocking(move || {
        crate::export::export_or_log(&image, source.as_deref(), &output)
    })
}
