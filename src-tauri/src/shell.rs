//! Application shell state and flows (macOS).
//!
//! Owns the core components for the lifetime of the app and connects them
//! to user intents: hotkeys, tray items and webview commands all land in
//! `trigger_typing`, `trigger_ocr` or the preview handlers here.

use crate::cancel::CancelToken;
use crate::capture::XcapBackend;
use crate::clipboard::{ClipboardMonitor, ClipboardSource, SystemClipboard, POLL_INTERVAL};
use crate::hotkeys::{
    EscapeKey, GlobalShortcutBackend, HotkeyError, HotkeyRegistry, HotkeySlot, ESCAPE_KEY,
};
use crate::inject::macos::{CgKeyPoster, MainThreadPoster};
use crate::inject::TextInjector;
use crate::ocr::apple_vision::VisionRecognizer;
use crate::overlay::{self, OverlayInput, TauriOverlayHost};
use crate::permissions::{self, Authorization, Permission, SystemAuthorization};
use crate::pipeline::{OcrOutcome, OcrPipeline};
use crate::selector::{KeySource, OverlayEvent, RegionSelector, ShapeStack, VerticalAxis};
use crate::settings::{CountdownDisplay, Settings, SettingsStore};
use crate::tray;
use crate::typing::{self, TypingController, TypingOutcome, TypingReview};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tauri::{AppHandle, Manager};
use tauri_plugin_dialog::{DialogExt, MessageDialogButtons, MessageDialogKind};
use tauri_plugin_global_shortcut::Shortcut;

pub const PREVIEW_LABEL: &str = "preview";

/// Text awaiting review in the preview window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    pub text: String,
    /// Base64 PNG of the captured region.
    pub image_png: Option<String>,
}

pub struct Shell {
    pub settings: SettingsStore,
    pub hotkeys: HotkeyRegistry,
    pub typing: TypingController,
    pub pipeline: OcrPipeline,
    pub clipboard: Arc<dyn ClipboardSource>,
    pub auth: Arc<SystemAuthorization>,
    /// Global Escape, shared by the overlay and typing runs.
    pub escape: Arc<EscapeKey>,
    preview: Mutex<Option<Preview>>,
    monitor: Mutex<Option<ClipboardMonitor>>,
    permission_wait: Mutex<Option<CancelToken>>,
}

impl Shell {
    pub fn new(app: &AppHandle) -> Self {
        let auth = Arc::new(SystemAuthorization);
        let clipboard: Arc<dyn ClipboardSource> = Arc::new(SystemClipboard::new());

        let poster = Arc::new(MainThreadPoster::new(app.clone(), Arc::new(CgKeyPoster::new())));
        let injector = TextInjector::new(poster, auth.clone());
        let hotkey_backend = Arc::new(GlobalShortcutBackend::new(app.clone()));
        let escape = Arc::new(EscapeKey::new(hotkey_backend.clone()));

        let cursor_app = app.clone();
        let cursor = Arc::new(ShapeStack::new(move |shape| {
            overlay::apply_cursor(&cursor_app, shape)
        }));
        let selector = RegionSelector::new(
            Arc::new(TauriOverlayHost::new(app.clone(), escape.clone())),
            cursor,
            VerticalAxis::TopDown,
        );
        let pipeline = OcrPipeline::new(
            auth.clone(),
            selector,
            Arc::new(XcapBackend::new()),
            Arc::new(VisionRecognizer::default()),
        );

        Self {
            settings: SettingsStore::open_default(),
            hotkeys: HotkeyRegistry::new(hotkey_backend),
            typing: TypingController::new(injector, auth.clone(), clipboard.clone()),
            pipeline,
            clipboard,
            auth,
            escape,
            preview: Mutex::new(None),
            monitor: Mutex::new(None),
            permission_wait: Mutex::new(None),
        }
    }

    /// Register both trigger hotkeys from `settings`. Returns the slots
    /// that could not take their new combination.
    pub fn bind_hotkeys(&self, settings: &Settings) -> Vec<(HotkeySlot, HotkeyError)> {
        let failures = self.hotkeys.bind_all([
            (HotkeySlot::Typing, settings.typing_shortcut.clone()),
            (HotkeySlot::Ocr, settings.ocr_shortcut.clone()),
        ]);
        for (slot, e) in &failures {
            log::error!("[HOTKEY] {:?} trigger unavailable: {}", slot, e);
        }
        failures
    }

    pub fn preview(&self) -> Option<Preview> {
        self.preview.lock().ok().and_then(|p| p.clone())
    }

    fn set_preview(&self, preview: Option<Preview>) {
        if let Ok(mut slot) = self.preview.lock() {
            *slot = preview;
        }
    }
}

/// Startup work after the tray exists.
pub fn start(app: &AppHandle) {
    let shell = app.state::<Shell>();
    let settings = shell.settings.get();
    shell.bind_hotkeys(&settings);

    if !shell.auth.injection_authorized() {
        request_permission(app, Permission::Injection);
    }

    let app = app.clone();
    tauri::async_runtime::spawn(async move {
        let shell = app.state::<Shell>();
        let tooltip_app = app.clone();
        let source = shell.clipboard.clone();
        let monitor = ClipboardMonitor::spawn(shell.clipboard.clone(), POLL_INTERVAL, move |_| {
            tray::show_clipboard_status(&tooltip_app, source.read_text().chars().count());
        });
        if let Ok(mut slot) = shell.monitor.lock() {
            *slot = Some(monitor);
        }
    });
}

/// Release hotkeys and stop any typing before exit.
pub fn shutdown(app: &AppHandle) {
    let Some(shell) = app.try_state::<Shell>() else {
        return;
    };
    shell.typing.stop();
    shell.pipeline.selector().cancel();
    shell.hotkeys.unbind_all();
    if let Ok(mut slot) = shell.monitor.lock() {
        if let Some(monitor) = slot.take() {
            monitor.stop();
        }
    }
    if let Ok(mut slot) = shell.permission_wait.lock() {
        if let Some(cancel) = slot.take() {
            cancel.cancel();
        }
    }
    log::info!("TypeClip shut down");
}

/// Route a global shortcut press.
///
/// Escape goes to the selection overlay when one is up, else it stops typing.
pub fn on_shortcut(app: &AppHandle, shortcut: &Shortcut) {
    if ESCAPE_KEY.parse::<Shortcut>().is_ok_and(|esc| &esc == shortcut) {
        let delivered = app
            .state::<OverlayInput>()
            .dispatch(KeySource::Global, OverlayEvent::Escape(KeySource::Global));
        if !delivered {
            stop_typing(app);
        }
        return;
    }

    let shell = app.state::<Shell>();
    let slot = shell.hotkeys.find(|binding| {
        binding
            .accelerator()
            .parse::<Shortcut>()
            .is_ok_and(|s| &s == shortcut)
    });
    match slot {
        Some(HotkeySlot::Typing) => trigger_typing(app),
        Some(HotkeySlot::Ocr) => trigger_ocr(app),
        None => log::debug!("[HOTKEY] Unrouted shortcut {:?}", shortcut),
    }
}

/// Type the current clipboard contents after review and countdown.
pub fn trigger_typing(app: &AppHandle) {
    let shell = app.state::<Shell>();
    let settings = shell.settings.get();
    let text = shell.clipboard.read_text();

    match typing::review(&text, &settings) {
        TypingReview::Empty => log::info!("[TYPING] Clipboard has no text"),
        TypingReview::Ready { .. } => spawn_typing(app.clone(), text, settings),
        TypingReview::OverThreshold { graphemes, threshold } => {
            let app = app.clone();
            app.dialog()
                .message(format!(
                    "The clipboard holds {} characters (warning threshold: {}). Type it anyway?",
                    graphemes, threshold
                ))
                .title("Type Clipboard")
                .kind(MessageDialogKind::Warning)
                .buttons(MessageDialogButtons::OkCancelCustom(
                    "Type".into(),
                    "Cancel".into(),
                ))
                .show({
                    let app = app.clone();
                    move |confirmed| {
                        if confirmed {
                            spawn_typing(app, text, settings);
                        } else {
                            log::info!("[TYPING] Long text declined");
                        }
                    }
                });
        }
    }
}

fn spawn_typing(app: AppHandle, text: String, settings: Settings) {
    tauri::async_runtime::spawn(async move {
        let shell = app.state::<Shell>();
        // Escape stops the countdown or the typing while this run is live.
        let escape = match shell.escape.claim() {
            Ok(claim) => Some(claim),
            Err(e) => {
                log::warn!("[TYPING] Escape-to-stop unavailable: {}", e);
                None
            }
        };
        let show_countdown = settings.countdown_display == CountdownDisplay::MenuBar;
        let tick_app = app.clone();
        let outcome = shell
            .typing
            .run(&text, &settings, move |secs| {
                if show_countdown {
                    tray::show_countdown(&tick_app, Some(secs));
                }
            })
            .await;
        drop(escape);
        tray::show_countdown(&app, None);

        match outcome {
            TypingOutcome::Typed(report) => {
                log::info!("[TYPING] Done ({} typed, {} failed)", report.posted, report.failed)
            }
            TypingOutcome::Cancelled => log::info!("[TYPING] Cancelled"),
            TypingOutcome::Unauthorized => request_permission(&app, Permission::Injection),
            TypingOutcome::Empty => {}
        }
    });
}

pub fn stop_typing(app: &AppHandle) {
    app.state::<Shell>().typing.stop();
    tray::show_countdown(app, None);
}

/// Snip a region and route the recognized text.
pub fn trigger_ocr(app: &AppHandle) {
    let shell = app.state::<Shell>();
    if !shell.settings.get().ocr_enabled {
        log::info!("[PIPELINE] OCR disabled in settings");
        return;
    }
    let app = app.clone();
    tauri::async_runtime::spawn(async move {
        let outcome = app.state::<Shell>().pipeline.run().await;
        handle_ocr_outcome(&app, outcome);
    });
}

fn handle_ocr_outcome(app: &AppHandle, outcome: OcrOutcome) {
    let shell = app.state::<Shell>();
    match outcome {
        OcrOutcome::Text { text, image } => {
            if shell.settings.get().ocr_preview {
                open_preview(app, text, image.to_png_bytes().ok());
            } else {
                deliver_text(app, &text);
            }
        }
        OcrOutcome::NoText { image } => {
            log::info!("[PIPELINE] No text found, opening manual entry");
            open_preview(app, String::new(), image.to_png_bytes().ok());
        }
        OcrOutcome::Cancelled => log::info!("[PIPELINE] Selection cancelled"),
        OcrOutcome::Unauthorized => request_permission(app, Permission::Capture),
        OcrOutcome::CaptureFailed => {
            show_error(
                app,
                "Screen capture failed. Check that TypeClip has Screen Recording permission, then try again.",
            );
        }
        OcrOutcome::RecognitionFailed(msg) => {
            show_error(app, &format!("Text recognition failed: {}", msg));
        }
    }
}

/// Put `text` on the clipboard and run the typing flow on it.
pub fn deliver_text(app: &AppHandle, text: &str) {
    let shell = app.state::<Shell>();
    if let Err(e) = shell.clipboard.write_text(text) {
        show_error(app, &e.to_string());
        return;
    }
    trigger_typing(app);
}

fn open_preview(app: &AppHandle, text: String, png: Option<Vec<u8>>) {
    let image_png =
        png.map(|bytes| base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes));
    app.state::<Shell>()
        .set_preview(Some(Preview { text, image_png }));

    if let Some(existing) = app.get_webview_window(PREVIEW_LABEL) {
        let _ = existing.destroy();
    }
    let built = tauri::WebviewWindowBuilder::new(
        app,
        PREVIEW_LABEL,
        tauri::WebviewUrl::App("preview.html".into()),
    )
    .title("TypeClip: Recognized Text")
    .inner_size(520.0, 440.0)
    .resizable(true)
    .always_on_top(true)
    .focused(true)
    .center()
    .build();
    if let Err(e) = built {
        log::error!("[PIPELINE] Failed to open preview: {}", e);
    }
}

pub fn close_preview(app: &AppHandle) {
    app.state::<Shell>().set_preview(None);
    if let Some(window) = app.get_webview_window(PREVIEW_LABEL) {
        let _ = window.close();
    }
}

fn show_error(app: &AppHandle, message: &str) {
    log::error!("[PIPELINE] {}", message);
    app.dialog()
        .message(message)
        .title("TypeClip")
        .kind(MessageDialogKind::Error)
        .show(|_| {});
}

/// Ask for `permission` and poll until it is granted.
pub fn request_permission(app: &AppHandle, permission: Permission) {
    let shell = app.state::<Shell>();
    log::warn!("[PERMISSION] {:?} not granted, opening System Settings", permission);

    if permission == Permission::Capture {
        shell.auth.request_capture();
    }
    #[allow(deprecated)]
    {
        use tauri_plugin_shell::ShellExt;
        if let Err(e) = app.shell().open(permission.settings_url(), None) {
            log::warn!("[PERMISSION] Could not open System Settings: {}", e);
        }
    }

    let cancel = CancelToken::new();
    if let Ok(mut slot) = shell.permission_wait.lock() {
        if let Some(previous) = slot.replace(cancel.clone()) {
            previous.cancel();
        }
    }
    let auth = shell.auth.clone();
    tauri::async_runtime::spawn(async move {
        let check = move || auth.is_granted(permission);
        if permissions::wait_until_granted(check, permissions::RECHECK_INTERVAL, &cancel).await {
            log::info!("[PERMISSION] {:?} granted", permission);
        }
    });
}
