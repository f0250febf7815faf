//! OCR domain: text recognition and reading-order assembly.
//!
//! External code should only use the items exported here.
//!   - `TextRecognizer` turns a captured image into located fragments
//!     (Apple Vision on macOS, via swift-bridge FFI in apple_vision.rs).
//!   - reading_order.rs sorts fragments top-to-bottom into one string.

pub mod reading_order;

#[cfg(target_os = "macos")]
pub mod apple_vision;

pub use reading_order::{assemble, assemble_with, AssembleOptions, WithinLineOrder};

use crate::capture::CapturedImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Recognition level for text recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecognitionLevel {
    /// Slower, with language correction. Used for on-demand snips.
    #[default]
    Accurate = 0,
    Fast = 1,
}

/// Rectangle in normalized image coordinates (0..1), bottom-left origin.
///
/// A larger `y` is higher up in the image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub fn mid_y(&self) -> f64 {
        self.y + self.height / 2.0
    }
}

/// One recognized span: the top candidate's text and where it sits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    pub bounds: NormalizedRect,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, bounds: NormalizedRect) -> Self {
        Self {
            text: text.into(),
            bounds,
        }
    }
}

/// A processing fault. "No text" is not an error: it is an empty batch.
#[derive(Debug, thiserror::Error)]
pub enum RecognizeError {
    #[error("text recognition failed: {0}")]
    Processing(String),
    #[error("recognition worker stopped: {0}")]
    Worker(String),
}

/// Runs OCR over one captured image.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &CapturedImage) -> Result<Vec<TextFragment>, RecognizeError>;
}

/// Recognize on the blocking pool; never blocks the calling task.
pub async fn recognize_in_background(
    recognizer: Arc<dyn TextRecognizer>,
    image: Arc<CapturedImage>,
) -> Result<Vec<TextFragment>, RecognizeError> {
    let start = std::time::Instant::now();
    let fragments = tokio::task::spawn_blocking(move || recognizer.recognize(&image))
        .await
        .map_err(|e| RecognizeError::Worker(e.to_string()))??;
    log::info!(
        "[OCR] {} fragments recognized in {}ms",
        fragments.len(),
        start.elapsed().as_millis()
    );
    Ok(fragments)
}
