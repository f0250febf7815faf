//! macOS OCR via Apple Vision Framework (swift-bridge FFI).
//!
//! This module is only compiled on macOS. It uses swift-bridge to call
//! into Swift code that wraps VNRecognizeTextRequest
//! (swift-src/vision_bridge.swift). Fragments cross the bridge as JSON.

use super::{RecognitionLevel, RecognizeError, TextFragment, TextRecognizer};
use crate::capture::CapturedImage;

#[swift_bridge::bridge]
mod ffi {
    #[swift_bridge(swift_repr = "struct")]
    struct VisionBatch {
        fragments_json: String,
        error: String,
        latency_ms: f64,
    }

    extern "Swift" {
        fn recognize_fragments_png(
            data: Vec<u8>,
            level: i32,
            language_correction: bool,
        ) -> VisionBatch;
        fn warm_up_vision();
    }
}

/// Vision-backed recognizer. Top candidate per observation only.
#[derive(Debug, Clone)]
pub struct VisionRecognizer {
    level: RecognitionLevel,
    language_correction: bool,
}

impl Default for VisionRecognizer {
    fn default() -> Self {
        Self {
            level: RecognitionLevel::Accurate,
            language_correction: true,
        }
    }
}

impl VisionRecognizer {
    pub fn new(level: RecognitionLevel, language_correction: bool) -> Self {
        Self {
            level,
            language_correction,
        }
    }
}

impl TextRecognizer for VisionRecognizer {
    fn recognize(&self, image: &CapturedImage) -> Result<Vec<TextFragment>, RecognizeError> {
        let png_bytes = image
            .to_png_bytes()
            .map_err(|e| RecognizeError::Processing(e.to_string()))?;

        let batch =
            ffi::recognize_fragments_png(png_bytes, self.level as i32, self.language_correction);
        if !batch.error.is_empty() {
            return Err(RecognizeError::Processing(batch.error));
        }

        let fragments: Vec<TextFragment> = serde_json::from_str(&batch.fragments_json)
            .map_err(|e| RecognizeError::Processing(format!("bad fragment payload: {}", e)))?;
        log::info!(
            "[OCR] Vision ({:?}) returned {} fragments in {:.1}ms",
            self.level,
            fragments.len(),
            batch.latency_ms
        );
        Ok(fragments)
    }
}

/// Warm up Vision Framework with a throwaway recognition request.
/// Call once at startup to avoid a cold-start penalty on the first snip.
pub fn warm_up() {
    ffi::warm_up_vision();
}
