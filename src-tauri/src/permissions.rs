//! Authorization surface. Can we inject input? Can we read the screen?
//!
//! Both gates may flip at any time (the user toggles them in System
//! Settings). Nothing here errors: callers check, decline to act, and
//! ask the user.

use crate::cancel::CancelToken;
use std::time::Duration;

/// Interval for re-checking after an initial denial.
pub const RECHECK_INTERVAL: Duration = Duration::from_secs(2);

/// The two independent permission gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Synthesizing system-level key events (Accessibility).
    Injection,
    /// Reading on-screen pixels (Screen Recording).
    Capture,
}

impl Permission {
    /// System Settings pane the user must visit to grant this.
    pub fn settings_url(self) -> &'static str {
        match self {
            Permission::Injection => {
                "x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility"
            }
            Permission::Capture => {
                "x-apple.systempreferences:com.apple.preference.security?Privacy_ScreenCapture"
            }
        }
    }
}

pub trait Authorization: Send + Sync {
    fn injection_authorized(&self) -> bool;
    fn capture_authorized(&self) -> bool;

    fn is_granted(&self, permission: Permission) -> bool {
        match permission {
            Permission::Injection => self.injection_authorized(),
            Permission::Capture => self.capture_authorized(),
        }
    }
}

/// Poll `check` until it returns true or `cancel` fires.
///
/// macOS sends no notification when these permissions change, so after a
/// denial we poll. Returns whether the permission was granted.
pub async fn wait_until_granted<F>(check: F, interval: Duration, cancel: &CancelToken) -> bool
where
    F: Fn() -> bool,
{
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if cancel.is_cancelled() {
            log::info!("[PERMISSION] Stopped waiting for permission");
            return false;
        }
        if check() {
            log::info!("[PERMISSION] Permission granted");
            return true;
        }
    }
}

#[cfg(target_os = "macos")]
pub use system::SystemAuthorization;

#[cfg(target_os = "macos")]
mod system {
    use super::Authorization;

    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        fn AXIsProcessTrusted() -> bool;
    }

    #[link(name = "CoreGraphics", kind = "framework")]
    extern "C" {
        fn CGPreflightScreenCaptureAccess() -> bool;
        fn CGRequestScreenCaptureAccess() -> bool;
    }

    /// Live TCC checks for the current process.
    #[derive(Default)]
    pub struct SystemAuthorization;

    impl SystemAuthorization {
        /// Triggers the one-time system prompt for screen recording.
        pub fn request_capture(&self) -> bool {
            unsafe { CGRequestScreenCaptureAccess() }
        }
    }

    impl Authorization for SystemAuthorization {
        fn injection_authorized(&self) -> bool {
            unsafe { AXIsProcessTrusted() }
        }

        fn capture_authorized(&self) -> bool {
            unsafe { CGPreflightScreenCaptureAccess() }
        }
    }
}
