//! Selection overlay window (macOS shell side of the region selector).
//!
//! A transparent, borderless, always-on-top webview covers the primary
//! display. The page (ui/overlay.html) only forwards pointer and Escape
//! input through `overlay_event` and draws the rectangle it is told to;
//! all selection state lives in `RegionSelector`.
//!
//! Escape is observed twice: the page's keydown handler (local) and a
//! claim on the shared global Escape (system-wide), held for the lifetime
//! of one session.

use crate::hotkeys::{EscapeClaim, EscapeKey};
use crate::selector::{
    CursorShape, EventSink, KeyMonitor, KeySource, LocalRect, OverlayError, OverlayEvent,
    OverlayFrame, OverlayHost, OverlayParts, OverlaySurface, Point,
};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tauri::{AppHandle, CursorIcon, Emitter, Manager, WebviewWindow};

pub const OVERLAY_LABEL: &str = "overlay";

/// Sinks for the session in flight, one per Escape source.
#[derive(Default)]
pub struct OverlayInput {
    local: Mutex<Option<EventSink>>,
    global: Mutex<Option<EventSink>>,
}

impl OverlayInput {
    fn slot(&self, source: KeySource) -> &Mutex<Option<EventSink>> {
        match source {
            KeySource::Local => &self.local,
            KeySource::Global => &self.global,
        }
    }

    fn install(&self, source: KeySource, sink: EventSink) {
        if let Ok(mut slot) = self.slot(source).lock() {
            *slot = Some(sink);
        }
    }

    fn clear(&self, source: KeySource) {
        if let Ok(mut slot) = self.slot(source).lock() {
            *slot = None;
        }
    }

    /// Deliver `event` through the sink for `source`. False when no
    /// session is listening on that source.
    ///
    /// The sink is cloned out first so the selector never runs under this lock.
    pub fn dispatch(&self, source: KeySource, event: OverlayEvent) -> bool {
        let sink = self.slot(source).lock().ok().and_then(|s| s.clone());
        match sink {
            Some(sink) => {
                sink.send(event);
                true
            }
            None => false,
        }
    }
}

/// Payload sent by ui/overlay.html.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OverlayInputPayload {
    Down { x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Up { x: f64, y: f64 },
    Escape,
}

impl From<OverlayInputPayload> for OverlayEvent {
    fn from(payload: OverlayInputPayload) -> Self {
        match payload {
            OverlayInputPayload::Down { x, y } => OverlayEvent::PointerDown(Point::new(x, y)),
            OverlayInputPayload::Move { x, y } => OverlayEvent::PointerMoved(Point::new(x, y)),
            OverlayInputPayload::Up { x, y } => OverlayEvent::PointerUp(Point::new(x, y)),
            OverlayInputPayload::Escape => OverlayEvent::Escape(KeySource::Local),
        }
    }
}

/// Apply a cursor shape to the overlay window, if it is up.
pub fn apply_cursor(app: &AppHandle, shape: CursorShape) {
    let Some(window) = app.get_webview_window(OVERLAY_LABEL) else {
        return;
    };
    let icon = match shape {
        CursorShape::Arrow => CursorIcon::Default,
        CursorShape::Crosshair => CursorIcon::Crosshair,
    };
    if let Err(e) = window.set_cursor_icon(icon) {
        log::warn!("[SELECT] Failed to set cursor: {}", e);
    }
}

struct Surface {
    window: WebviewWindow,
    frame: OverlayFrame,
}

impl OverlaySurface for Surface {
    fn frame(&self) -> OverlayFrame {
        self.frame
    }

    fn draw_selection(&self, rect: Option<LocalRect>) {
        let payload = rect.map(|r| {
            serde_json::json!({ "x": r.x, "y": r.y, "width": r.width, "height": r.height })
        });
        if let Err(e) = self.window.emit_to(OVERLAY_LABEL, "selection", payload) {
            log::debug!("[SELECT] Redraw dropped: {}", e);
        }
    }

    fn dismiss(&self) {
        if let Err(e) = self.window.destroy() {
            log::warn!("[SELECT] Failed to close overlay: {}", e);
        }
    }
}

struct LocalEscape {
    app: AppHandle,
}

impl KeyMonitor for LocalEscape {
    fn remove(&mut self) {
        self.app.state::<OverlayInput>().clear(KeySource::Local);
    }
}

struct GlobalEscape {
    app: AppHandle,
    claim: Option<EscapeClaim>,
}

impl KeyMonitor for GlobalEscape {
    fn remove(&mut self) {
        self.app.state::<OverlayInput>().clear(KeySource::Global);
        self.claim = None;
    }
}

pub struct TauriOverlayHost {
    app: AppHandle,
    escape: Arc<EscapeKey>,
}

impl TauriOverlayHost {
    pub fn new(app: AppHandle, escape: Arc<EscapeKey>) -> Self {
        Self { app, escape }
    }

    fn primary_frame(&self) -> Result<OverlayFrame, OverlayError> {
        let monitor = self
            .app
            .primary_monitor()
            .map_err(|e| OverlayError::Create(e.to_string()))?
            .ok_or_else(|| OverlayError::Create("no primary monitor".into()))?;
        let scale = monitor.scale_factor();
        let pos = monitor.position().to_logical::<f64>(scale);
        let size = monitor.size().to_logical::<f64>(scale);
        Ok(OverlayFrame {
            x: pos.x,
            y: pos.y,
            width: size.width,
            height: size.height,
        })
    }
}

impl OverlayHost for TauriOverlayHost {
    fn present(&self, sink: EventSink) -> Result<OverlayParts, OverlayError> {
        if let Some(existing) = self.app.get_webview_window(OVERLAY_LABEL) {
            log::info!("[SELECT] Closing stale overlay window");
            let _ = existing.destroy();
        }

        let frame = self.primary_frame()?;
        let window = tauri::WebviewWindowBuilder::new(
            &self.app,
            OVERLAY_LABEL,
            tauri::WebviewUrl::App("overlay.html".into()),
        )
        .title("TypeClip Selection")
        .position(frame.x, frame.y)
        .inner_size(frame.width, frame.height)
        .transparent(true)
        .decorations(false)
        .shadow(false)
        .resizable(false)
        .always_on_top(true)
        .skip_taskbar(true)
        .visible_on_all_workspaces(true)
        .focused(true)
        .build()
        .map_err(|e| OverlayError::Create(e.to_string()))?;

        let input = self.app.state::<OverlayInput>();
        input.install(KeySource::Local, sink.clone());
        let mut monitors: Vec<Box<dyn KeyMonitor>> =
            vec![Box::new(LocalEscape { app: self.app.clone() })];

        match self.escape.claim() {
            Ok(claim) => {
                input.install(KeySource::Global, sink);
                monitors.push(Box::new(GlobalEscape {
                    app: self.app.clone(),
                    claim: Some(claim),
                }));
            }
            // The local monitor still works while the overlay has focus.
            Err(e) => log::warn!("[SELECT] Global Escape unavailable: {}", e),
        }

        log::info!(
            "[SELECT] Overlay up at ({:.0}, {:.0}) {:.0}x{:.0}",
            frame.x,
            frame.y,
            frame.width,
            frame.height
        );
        Ok(OverlayParts {
            surface: Box::new(Surface { window, frame }),
            monitors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_maps_to_events() {
        let down: OverlayInputPayload =
            serde_json::from_str(r#"{"kind":"down","x":3,"y":4}"#).unwrap();
        assert_eq!(
            OverlayEvent::from(down),
            OverlayEvent::PointerDown(Point::new(3.0, 4.0))
        );
        let esc: OverlayInputPayload = serde_json::from_str(r#"{"kind":"escape"}"#).unwrap();
        assert_eq!(OverlayEvent::from(esc), OverlayEvent::Escape(KeySource::Local));
    }

    #[test]
    fn dispatch_without_session_is_undelivered() {
        let input = OverlayInput::default();
        let escape = OverlayEvent::Escape(KeySource::Global);
        assert!(!input.dispatch(KeySource::Global, escape));
        assert!(!input.dispatch(KeySource::Local, escape));
    }

    #[test]
    fn overlay_page_keeps_crosshair_under_pointer() {
        // WebKit re-resolves the cursor from CSS on every mouse move.
        let page = include_str!("../../ui/overlay.html");
        assert!(page.contains("cursor: crosshair"));
    }
}
