//! macOS key posting via Core Graphics.
//!
//! Unicode clusters are posted as a virtual key event carrying the whole
//! UTF-16 payload (CGEventKeyboardSetUnicodeString), which sidesteps the
//! active keyboard layout. Enter is a real Return keypress.

use super::{KeyPoster, Keystroke, PostError};
use core_graphics::event::{CGEvent, CGEventFlags, CGEventTapLocation, CGKeyCode};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use std::sync::Arc;

const KEY_RETURN: CGKeyCode = 36;
/// Keycode is irrelevant once a Unicode string is attached.
const KEY_UNICODE_CARRIER: CGKeyCode = 0;

/// Posts key-down/key-up pairs to the HID event tap.
#[derive(Default)]
pub struct CgKeyPoster;

impl CgKeyPoster {
    pub fn new() -> Self {
        Self
    }

    fn key_pair(
        source: &CGEventSource,
        keycode: CGKeyCode,
        payload: Option<&[u16]>,
    ) -> Result<(), PostError> {
        let down = CGEvent::new_keyboard_event(source.clone(), keycode, true)
            .map_err(|_| PostError::EventCreate)?;
        let up = CGEvent::new_keyboard_event(source.clone(), keycode, false)
            .map_err(|_| PostError::EventCreate)?;

        // Residual modifier state would turn "a" into Cmd+A.
        down.set_flags(CGEventFlags::empty());
        up.set_flags(CGEventFlags::empty());

        if let Some(units) = payload {
            down.set_string_from_utf16_unchecked(units);
            up.set_string_from_utf16_unchecked(units);
        }

        down.post(CGEventTapLocation::HID);
        up.post(CGEventTapLocation::HID);
        Ok(())
    }
}

impl KeyPoster for CgKeyPoster {
    fn post(&self, stroke: &Keystroke) -> Result<(), PostError> {
        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|_| PostError::EventSource)?;
        match stroke {
            Keystroke::Enter => Self::key_pair(&source, KEY_RETURN, None),
            Keystroke::Unicode(units) => {
                Self::key_pair(&source, KEY_UNICODE_CARRIER, Some(units.as_slice()))
            }
        }
    }
}

/// Runs every post on the Tauri main thread and waits for it.
///
/// The injection worker sleeps off-thread; only the event pair itself
/// hops to the main thread, one character at a time.
pub struct MainThreadPoster {
    app: tauri::AppHandle,
    inner: Arc<dyn KeyPoster>,
}

impl MainThreadPoster {
    pub fn new(app: tauri::AppHandle, inner: Arc<dyn KeyPoster>) -> Self {
        Self { app, inner }
    }
}

impl KeyPoster for MainThreadPoster {
    fn post(&self, stroke: &Keystroke) -> Result<(), PostError> {
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        let inner = Arc::clone(&self.inner);
        let stroke = stroke.clone();
        self.app
            .run_on_main_thread(move || {
                let _ = tx.send(inner.post(&stroke));
            })
            .map_err(|e| PostError::Dispatch(e.to_string()))?;
        rx.recv()
            .map_err(|e| PostError::Dispatch(e.to_string()))?
    }
}
