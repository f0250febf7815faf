//! Typing flow: review → countdown → inject → optional clipboard clear.
//!
//! Only one typing run is active at a time. Starting a new one, or
//! calling `stop`, cancels whatever is counting down or typing.

use crate::cancel::CancelToken;
use crate::clipboard::ClipboardSource;
use crate::inject::{plan, InjectionReport, InjectionRequest, TextInjector};
use crate::permissions::Authorization;
use crate::settings::Settings;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

const COUNTDOWN_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingReview {
    Empty,
    /// Longer than the warning threshold; ask before typing.
    OverThreshold { graphemes: usize, threshold: usize },
    Ready { graphemes: usize },
}

pub fn review(text: &str, settings: &Settings) -> TypingReview {
    let graphemes = plan::graphemes(text).len();
    if graphemes == 0 {
        TypingReview::Empty
    } else if graphemes > settings.char_warning_threshold {
        TypingReview::OverThreshold {
            graphemes,
            threshold: settings.char_warning_threshold,
        }
    } else {
        TypingReview::Ready { graphemes }
    }
}

/// Wait `delay`, calling `on_tick` with the whole seconds remaining each
/// time that number changes. Returns false if cancelled first.
pub async fn countdown<F>(delay: Duration, cancel: &CancelToken, mut on_tick: F) -> bool
where
    F: FnMut(u64),
{
    let start = Instant::now();
    let mut last_reported = None;
    let mut ticker = tokio::time::interval(COUNTDOWN_POLL);
    loop {
        ticker.tick().await;
        if cancel.is_cancelled() {
            log::info!("[TYPING] Countdown cancelled");
            return false;
        }
        let remaining = delay.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            return true;
        }
        let secs = remaining.as_secs_f64().ceil() as u64;
        if last_reported != Some(secs) {
            last_reported = Some(secs);
            on_tick(secs);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypingOutcome {
    Typed(InjectionReport),
    Cancelled,
    Unauthorized,
    Empty,
}

struct Active {
    id: u64,
    cancel: CancelToken,
}

pub struct TypingController {
    injector: TextInjector,
    auth: Arc<dyn Authorization>,
    clipboard: Arc<dyn ClipboardSource>,
    active: Mutex<Option<Active>>,
    next_id: Mutex<u64>,
}

impl TypingController {
    pub fn new(
        injector: TextInjector,
        auth: Arc<dyn Authorization>,
        clipboard: Arc<dyn ClipboardSource>,
    ) -> Self {
        Self {
            injector,
            auth,
            clipboard,
            active: Mutex::new(None),
            next_id: Mutex::new(0),
        }
    }

    fn active(&self) -> MutexGuard<'_, Option<Active>> {
        match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active().is_some()
    }

    /// Cancel the countdown or injection in progress, if any.
    pub fn stop(&self) -> bool {
        match self.active().take() {
            Some(active) => {
                active.cancel.cancel();
                log::info!("[TYPING] Stopped");
                true
            }
            None => false,
        }
    }

    /// Count down, then type `text` with the current settings.
    pub async fn run<F>(&self, text: &str, settings: &Settings, on_tick: F) -> TypingOutcome
    where
        F: FnMut(u64),
    {
        let request = InjectionRequest::new(text, settings.typing_speed_ms);
        if request.is_empty() {
            return TypingOutcome::Empty;
        }
        if !self.auth.injection_authorized() {
            log::warn!("[TYPING] Accessibility permission missing");
            return TypingOutcome::Unauthorized;
        }

        let (id, cancel) = self.begin();
        let delay = settings.typing_delay();
        log::info!(
            "[TYPING] {} characters queued, starting in {:.1}s",
            request.len(),
            delay.as_secs_f64()
        );

        let outcome = if !countdown(delay, &cancel, on_tick).await {
            TypingOutcome::Cancelled
        } else {
            match self.injector.inject_with(request, cancel.clone()) {
                None => TypingOutcome::Unauthorized,
                Some(handle) => {
                    match tokio::task::spawn_blocking(move || handle.join()).await {
                        Ok(report) if report.cancelled => TypingOutcome::Cancelled,
                        Ok(report) => TypingOutcome::Typed(report),
                        Err(e) => {
                            log::error!("[TYPING] Injection join failed: {}", e);
                            TypingOutcome::Cancelled
                        }
                    }
                }
            }
        };

        if matches!(outcome, TypingOutcome::Typed(_)) && settings.auto_clear {
            if let Err(e) = self.clipboard.clear() {
                log::warn!("[TYPING] Auto-clear failed: {}", e);
            }
        }
        self.end(id);
        outcome
    }

    fn begin(&self) -> (u64, CancelToken) {
        self.stop();
        let id = {
            let mut next = match self.next_id.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *next += 1;
            *next
        };
        let cancel = CancelToken::new();
        *self.active() = Some(Active {
            id,
            cancel: cancel.clone(),
        });
        (id, cancel)
    }

    fn end(&self, id: u64) {
        let mut active = self.active();
        if active.as_ref().is_some_and(|a| a.id == id) {
            *active = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_counts_graphemes_against_threshold() {
        let settings = Settings {
            char_warning_threshold: 3,
            ..Settings::default()
        };
        assert_eq!(review("", &settings), TypingReview::Empty);
        assert_eq!(review("a\u{0301}bc", &settings), TypingReview::Ready { graphemes: 3 });
        assert_eq!(
            review("abcd", &settings),
            TypingReview::OverThreshold { graphemes: 4, threshold: 3 }
        );
    }

    #[tokio::test]
    async fn countdown_ticks_whole_seconds() {
        let mut ticks = Vec::new();
        let cancel = CancelToken::new();
        let done = countdown(Duration::from_millis(1200), &cancel, |s| ticks.push(s)).await;
        assert!(done);
        assert_eq!(ticks, vec![2, 1]);
    }

    #[tokio::test]
    async fn cancelled_countdown_returns_false() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut ticks = 0;
        assert!(!countdown(Duration::from_secs(5), &cancel, |_| ticks += 1).await);
        assert_eq!(ticks, 0);
    }
}
