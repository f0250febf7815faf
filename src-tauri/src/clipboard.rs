//! Clipboard source: read, clear, and a polled change counter.
//!
//! The system clipboard crate has no change counter of its own, so
//! `ChangeTracker` derives one by hashing each observed text.

use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("clipboard write failed: {0}")]
    Write(String),
}

pub trait ClipboardSource: Send + Sync {
    /// Current text, or an empty string if the clipboard holds none.
    fn read_text(&self) -> String;
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
    fn clear(&self) -> Result<(), ClipboardError>;
    /// Opaque counter that grows whenever the contents change.
    fn change_count(&self) -> u64;
}

/// Monotonic change counter over a stream of observed texts.
#[derive(Default)]
pub struct ChangeTracker {
    state: Mutex<(Option<[u8; 32]>, u64)>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `text` and return the counter, bumped if the text differs
    /// from the previous observation.
    pub fn observe(&self, text: &str) -> u64 {
        let digest: [u8; 32] = Sha256::digest(text.as_bytes()).into();
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match state.0 {
            Some(last) if last == digest => {}
            Some(_) => {
                state.0 = Some(digest);
                state.1 += 1;
            }
            // First observation sets the baseline.
            None => state.0 = Some(digest),
        }
        state.1
    }
}

/// Polls a clipboard source and reports counter changes.
pub struct ClipboardMonitor {
    task: JoinHandle<()>,
}

impl ClipboardMonitor {
    pub fn spawn<F>(source: Arc<dyn ClipboardSource>, interval: Duration, on_change: F) -> Self
    where
        F: Fn(u64) + Send + 'static,
    {
        let mut last = source.change_count();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let count = source.change_count();
                if count != last {
                    last = count;
                    log::debug!("[CLIPBOARD] Change {}", count);
                    on_change(count);
                }
            }
        });
        Self { task }
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for ClipboardMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(target_os = "macos")]
pub use system::SystemClipboard;

#[cfg(target_os = "macos")]
mod system {
    use super::{ChangeTracker, ClipboardError, ClipboardSource};
    use std::sync::Mutex;

    /// NSPasteboard via arboard.
    pub struct SystemClipboard {
        board: Mutex<Option<arboard::Clipboard>>,
        tracker: ChangeTracker,
    }

    impl SystemClipboard {
        pub fn new() -> Self {
            let board = match arboard::Clipboard::new() {
                Ok(board) => Some(board),
                Err(e) => {
                    log::error!("[CLIPBOARD] {}", e);
                    None
                }
            };
            Self {
                board: Mutex::new(board),
                tracker: ChangeTracker::new(),
            }
        }

        fn with_board<T>(
            &self,
            f: impl FnOnce(&mut arboard::Clipboard) -> Result<T, arboard::Error>,
        ) -> Result<T, ClipboardError> {
            let mut guard = self
                .board
                .lock()
                .map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
            if guard.is_none() {
                *guard = Some(
                    arboard::Clipboard::new()
                        .map_err(|e| ClipboardError::Unavailable(e.to_string()))?,
                );
            }
            match guard.as_mut() {
                Some(board) => f(board).map_err(|e| ClipboardError::Write(e.to_string())),
                None => Err(ClipboardError::Unavailable("no pasteboard".into())),
            }
        }
    }

    impl Default for SystemClipboard {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ClipboardSource for SystemClipboard {
        fn read_text(&self) -> String {
            self.with_board(|b| b.get_text()).unwrap_or_default()
        }

        fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
            self.with_board(|b| b.set_text(text))?;
            log::info!("[CLIPBOARD] Wrote {} chars", text.chars().count());
            Ok(())
        }

        fn clear(&self) -> Result<(), ClipboardError> {
            self.with_board(|b| b.clear())?;
            log::info!("[CLIPBOARD] Cleared");
            Ok(())
        }

        fn change_count(&self) -> u64 {
            self.tracker.observe(&self.read_text())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Board {
        text: Mutex<String>,
        tracker: ChangeTracker,
    }

    impl ClipboardSource for Board {
        fn read_text(&self) -> String {
            self.text.lock().unwrap().clone()
        }
        fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
            *self.text.lock().unwrap() = text.to_string();
            Ok(())
        }
        fn clear(&self) -> Result<(), ClipboardError> {
            self.text.lock().unwrap().clear();
            Ok(())
        }
        fn change_count(&self) -> u64 {
            self.tracker.observe(&self.read_text())
        }
    }

    #[test]
    fn tracker_bumps_only_on_change() {
        let t = ChangeTracker::new();
        assert_eq!(t.observe("a"), 0);
        assert_eq!(t.observe("a"), 0);
        assert_eq!(t.observe("b"), 1);
        assert_eq!(t.observe("a"), 2);
        assert_eq!(t.observe(""), 3);
    }

    #[tokio::test]
    async fn monitor_reports_changes() {
        let board = Arc::new(Board {
            text: Mutex::new("first".into()),
            tracker: ChangeTracker::new(),
        });
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let monitor = ClipboardMonitor::spawn(board.clone(), Duration::from_millis(10), move |n| {
            let _ = tx.send(n);
        });

        board.write_text("second").unwrap();
        let seen = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
        assert_eq!(seen, Some(1));
        monitor.stop();
    }
}
