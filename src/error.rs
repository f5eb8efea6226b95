use thiserror::Error;

/// Errors surfaced by the watermarking core.
///
/// Absent or malformed metadata never shows up here: a missing tag or an
/// unparsable value simply leaves the corresponding field empty.
#[derive(Error, Debug)]
pub enum WatermarkError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Font error: {0}")]
    Font(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The render pass was superseded before it finished.
    #[error("Render cancelled")]
    Cancelled,

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatermarkError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WatermarkError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, WatermarkError>;
