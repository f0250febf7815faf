//! Text injection domain: types text as synthetic key events.
//!
//! External code should only use the items exported here. A request is
//! planned into keystrokes (plan.rs) and posted by a dedicated worker
//! thread that sleeps between characters. Posting itself goes through a
//! `KeyPoster`, which on macOS builds CGEvents (macos.rs).

pub mod plan;

#[cfg(target_os = "macos")]
pub mod macos;

pub use plan::Keystroke;

use crate::cancel::CancelToken;
use crate::permissions::Authorization;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Default delay after each character.
pub const DEFAULT_PACING_MS: f64 = 20.0;
pub const MIN_PACING_MS: f64 = 2.0;
pub const MAX_PACING_MS: f64 = 200.0;

/// Enter settles slower than Unicode payloads in receiving apps.
const ENTER_DELAY_FACTOR: f64 = 2.5;

/// Failure posting a single key-down/key-up pair.
#[derive(Debug, thiserror::Error)]
pub enum PostError {
    #[error("failed to create event source")]
    EventSource,
    #[error("failed to create key event")]
    EventCreate,
    #[error("dispatch to main thread failed: {0}")]
    Dispatch(String),
}

/// Posts one complete key-down/key-up pair.
///
/// Implementations must not return before both events are posted, so
/// that characters never interleave.
pub trait KeyPoster: Send + Sync {
    fn post(&self, stroke: &Keystroke) -> Result<(), PostError>;
}

/// Per-character pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    per_char_us: u64,
}

impl Pacing {
    /// Pacing in milliseconds, clamped to 2 to 200ms. Non-finite input
    /// falls back to the default.
    pub fn from_millis(ms: f64) -> Self {
        let ms = if ms.is_finite() { ms } else { DEFAULT_PACING_MS };
        let ms = ms.clamp(MIN_PACING_MS, MAX_PACING_MS);
        Self {
            per_char_us: (ms * 1000.0).round() as u64,
        }
    }

    pub fn per_char(&self) -> Duration {
        Duration::from_micros(self.per_char_us)
    }

    pub fn enter(&self) -> Duration {
        Duration::from_micros((self.per_char_us as f64 * ENTER_DELAY_FACTOR).round() as u64)
    }

    fn after(&self, stroke: &Keystroke) -> Duration {
        match stroke {
            Keystroke::Enter => self.enter(),
            Keystroke::Unicode(_) => self.per_char(),
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::from_millis(DEFAULT_PACING_MS)
    }
}

/// Immutable text-to-type plus its pacing. Consumed by the injector.
#[derive(Debug, Clone)]
pub struct InjectionRequest {
    graphemes: Vec<String>,
    pacing: Pacing,
}

impl InjectionRequest {
    pub fn new(text: &str, pacing_ms: f64) -> Self {
        Self {
            graphemes: plan::graphemes(text),
            pacing: Pacing::from_millis(pacing_ms),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.graphemes.is_empty()
    }

    /// Number of grapheme clusters (user-perceived characters).
    pub fn len(&self) -> usize {
        self.graphemes.len()
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }
}

/// What the worker did before it stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InjectionReport {
    pub posted: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

impl InjectionReport {
    /// Ran to the end without being cancelled.
    pub fn completed(&self) -> bool {
        !self.cancelled
    }
}

/// Handle to a running injection.
pub struct InjectionHandle {
    cancel: CancelToken,
    worker: JoinHandle<InjectionReport>,
}

impl InjectionHandle {
    /// Best-effort: the character being posted still completes, nothing after it starts.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Block until the worker stops.
    pub fn join(self) -> InjectionReport {
        match self.worker.join() {
            Ok(report) => report,
            Err(_) => {
                log::error!("[INJECT] Injection worker panicked");
                InjectionReport {
                    cancelled: true,
                    ..Default::default()
                }
            }
        }
    }
}

/// Types text by posting synthetic key events from a worker thread.
pub struct TextInjector {
    poster: Arc<dyn KeyPoster>,
    auth: Arc<dyn Authorization>,
}

impl TextInjector {
    pub fn new(poster: Arc<dyn KeyPoster>, auth: Arc<dyn Authorization>) -> Self {
        Self { poster, auth }
    }

    /// Type `text` with the given pacing.
    ///
    /// Returns `None` without posting anything when the text is empty or
    /// the process lacks injection authorization; the caller surfaces the
    /// latter.
    pub fn inject(&self, text: &str, pacing_ms: f64) -> Option<InjectionHandle> {
        self.inject_request(InjectionRequest::new(text, pacing_ms))
    }

    pub fn inject_request(&self, request: InjectionRequest) -> Option<InjectionHandle> {
        self.inject_with(request, CancelToken::new())
    }

    /// Like `inject_request`, but stops when an existing `cancel` fires.
    pub fn inject_with(
        &self,
        request: InjectionRequest,
        cancel: CancelToken,
    ) -> Option<InjectionHandle> {
        if request.is_empty() {
            log::debug!("[INJECT] Empty request, nothing to type");
            return None;
        }
        if !self.auth.injection_authorized() {
            log::warn!("[INJECT] Input injection not authorized, skipping");
            return None;
        }

        let poster = Arc::clone(&self.poster);
        let worker_cancel = cancel.clone();
        let spawned = std::thread::Builder::new()
            .name("typeclip-injector".into())
            .spawn(move || run_injection(request, poster.as_ref(), &worker_cancel));

        match spawned {
            Ok(worker) => Some(InjectionHandle { cancel, worker }),
            Err(e) => {
                log::error!("[INJECT] Failed to spawn injection worker: {}", e);
                None
            }
        }
    }
}

/// Worker body: post each grapheme in order, sleeping between them.
///
/// Each keystroke is fully posted (down + up) before the next one starts.
pub fn run_injection(
    request: InjectionRequest,
    poster: &dyn KeyPoster,
    cancel: &CancelToken,
) -> InjectionReport {
    let start = std::time::Instant::now();
    let total = request.len();
    let pacing = request.pacing;
    let mut report = InjectionReport::default();

    for grapheme in &request.graphemes {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        let Some(stroke) = plan::keystroke_for(grapheme) else {
            report.skipped += 1;
            continue;
        };
        match poster.post(&stroke) {
            Ok(()) => report.posted += 1,
            Err(e) => {
                report.failed += 1;
                log::warn!("[INJECT] Key event failed, continuing: {}", e);
            }
        }
        std::thread::sleep(pacing.after(&stroke));
    }

    log::info!(
        "[INJECT] {} of {} characters typed in {}ms (failed={}, skipped={}, cancelled={})",
        report.posted,
        total,
        start.elapsed().as_millis(),
        report.failed,
        report.skipped,
        report.cancelled
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder(Mutex<Vec<Keystroke>>);

    impl KeyPoster for Recorder {
        fn post(&self, stroke: &Keystroke) -> Result<(), PostError> {
            self.0.lock().unwrap().push(stroke.clone());
            Ok(())
        }
    }

    struct FailOn(&'static str, Mutex<Vec<Keystroke>>);

    impl KeyPoster for FailOn {
        fn post(&self, stroke: &Keystroke) -> Result<(), PostError> {
            if stroke.text().as_deref() == Some(self.0) {
                return Err(PostError::EventCreate);
            }
            self.1.lock().unwrap().push(stroke.clone());
            Ok(())
        }
    }

    #[test]
    fn pacing_is_clamped() {
        assert_eq!(Pacing::from_millis(0.0).per_char(), Duration::from_millis(2));
        assert_eq!(Pacing::from_millis(900.0).per_char(), Duration::from_millis(200));
        assert_eq!(Pacing::from_millis(f64::NAN), Pacing::default());
    }

    #[test]
    fn enter_waits_longer() {
        let pacing = Pacing::from_millis(20.0);
        assert_eq!(pacing.enter(), Duration::from_millis(50));
    }

    #[test]
    fn request_counts_graphemes() {
        let req = InjectionRequest::new("e\u{0301}\u{1F44D}\u{1F3FD}!", 20.0);
        assert_eq!(req.len(), 3);
        assert!(InjectionRequest::new("", 20.0).is_empty());
    }

    #[test]
    fn worker_posts_in_order() {
        let recorder = Recorder(Mutex::new(Vec::new()));
        let report = run_injection(
            InjectionRequest::new("hi\nyo", 2.0),
            &recorder,
            &CancelToken::new(),
        );
        assert_eq!(report.posted, 5);
        assert!(report.completed());
        let strokes = recorder.0.into_inner().unwrap();
        assert_eq!(strokes[2], Keystroke::Enter);
        assert_eq!(strokes[3].text().as_deref(), Some("y"));
    }

    #[test]
    fn failed_character_does_not_abort() {
        let poster = FailOn("b", Mutex::new(Vec::new()));
        let report = run_injection(InjectionRequest::new("abc", 2.0), &poster, &CancelToken::new());
        assert_eq!(report.posted, 2);
        assert_eq!(report.failed, 1);
        let typed: String = poster
            .1
            .into_inner()
            .unwrap()
            .iter()
            .filter_map(Keystroke::text)
            .collect();
        assert_eq!(typed, "ac");
    }

    #[test]
    fn pre_cancelled_worker_posts_nothing() {
        let recorder = Recorder(Mutex::new(Vec::new()));
        let cancel = CancelToken::new();
        cancel.cancel();
        let report = run_injection(InjectionRequest::new("abc", 2.0), &recorder, &cancel);
        assert!(report.cancelled);
        assert_eq!(report.posted, 0);
        assert!(recorder.0.into_inner().unwrap().is_empty());
    }
}
