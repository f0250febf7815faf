//! Snip-to-text pipeline.
//!
//! select → capture → recognize → assemble. Capture and recognition run
//! on the blocking pool; only the final outcome comes back to the caller.
//! Cancellation and "no text" are outcomes, not errors.

use crate::capture::{self, CaptureBackend, CapturedImage};
use crate::ocr::{self, AssembleOptions, TextRecognizer};
use crate::permissions::Authorization;
use crate::selector::RegionSelector;
use std::sync::Arc;
use std::time::Duration;

/// Time for the dismissed overlay to leave the screen before capture.
pub const OVERLAY_SETTLE: Duration = Duration::from_millis(80);

#[derive(Debug, Clone)]
pub enum OcrOutcome {
    Text {
        text: String,
        image: Arc<CapturedImage>,
    },
    /// Recognition ran but found nothing; route to manual entry.
    NoText { image: Arc<CapturedImage> },
    Cancelled,
    Unauthorized,
    CaptureFailed,
    RecognitionFailed(String),
}

pub struct OcrPipeline {
    auth: Arc<dyn Authorization>,
    selector: RegionSelector,
    backend: Arc<dyn CaptureBackend>,
    recognizer: Arc<dyn TextRecognizer>,
    options: AssembleOptions,
    settle: Duration,
}

impl OcrPipeline {
    pub fn new(
        auth: Arc<dyn Authorization>,
        selector: RegionSelector,
        backend: Arc<dyn CaptureBackend>,
        recognizer: Arc<dyn TextRecognizer>,
    ) -> Self {
        Self {
            auth,
            selector,
            backend,
            recognizer,
            options: AssembleOptions::default(),
            settle: OVERLAY_SETTLE,
        }
    }

    pub fn with_options(mut self, options: AssembleOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn selector(&self) -> &RegionSelector {
        &self.selector
    }

    pub async fn run(&self) -> OcrOutcome {
        if !self.auth.capture_authorized() {
            log::warn!("[PIPELINE] Screen recording permission missing");
            return OcrOutcome::Unauthorized;
        }

        let Some(region) = self.selector.select().await else {
            return OcrOutcome::Cancelled;
        };
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        let start = std::time::Instant::now();
        let backend = Arc::clone(&self.backend);
        let captured =
            tokio::task::spawn_blocking(move || capture::capture(backend.as_ref(), &region))
                .await
                .unwrap_or_else(|e| {
                    log::error!("[PIPELINE] Capture worker failed: {}", e);
                    None
                });
        let Some(image) = captured.map(Arc::new) else {
            return OcrOutcome::CaptureFailed;
        };
        let capture_ms = start.elapsed().as_millis();

        let recognizer = Arc::clone(&self.recognizer);
        let fragments = match ocr::recognize_in_background(recognizer, Arc::clone(&image)).await {
            Ok(fragments) => fragments,
            Err(e) => {
                log::error!("[PIPELINE] {}", e);
                return OcrOutcome::RecognitionFailed(e.to_string());
            }
        };

        let text = ocr::assemble_with(&fragments, &self.options);
        log::info!(
            "[PIPELINE] {} fragments, {} chars (capture={}ms, total={}ms)",
            fragments.len(),
            text.chars().count(),
            capture_ms,
            start.elapsed().as_millis()
        );
        if text.trim().is_empty() {
            OcrOutcome::NoText { image }
        } else {
            OcrOutcome::Text { text, image }
        }
    }
}
