//! Tauri command handlers invoked by the webviews.
//!
//! Thin wrappers that bridge frontend invoke() calls to the shell flows.
//! Settings commands live in settings_commands.rs.

use crate::overlay::{OverlayInput, OverlayInputPayload};
use crate::selector::KeySource;
use crate::shell::{self, Preview, Shell};

/// Tauri command: forward one overlay input event to the selector.
///
/// Called by ui/overlay.html on pointer down/move/up and Escape.
#[tauri::command]
pub fn overlay_event(
    input: tauri::State<'_, OverlayInput>,
    event: OverlayInputPayload,
) -> Result<(), String> {
    input.dispatch(KeySource::Local, event.into());
    Ok(())
}

/// Tauri command: get the text and image awaiting review.
#[tauri::command]
pub fn get_preview(shell: tauri::State<'_, Shell>) -> Result<Preview, String> {
    shell
        .preview()
        .ok_or("No recognized text waiting for review".to_string())
}

/// Tauri command: accept the (possibly edited) preview text and type it.
#[tauri::command]
pub fn confirm_preview(app: tauri::AppHandle, text: String) -> Result<(), String> {
    shell::close_preview(&app);
    if text.is_empty() {
        log::info!("[PIPELINE] Preview confirmed with no text");
        return Ok(());
    }
    shell::deliver_text(&app, &text);
    Ok(())
}

/// Tauri command: discard the preview.
#[tauri::command]
pub fn cancel_preview(app: tauri::AppHandle) -> Result<(), String> {
    shell::close_preview(&app);
    Ok(())
}

/// Tauri command: type the clipboard (same as the tray item).
#[tauri::command]
pub fn start_typing(app: tauri::AppHandle) -> Result<(), String> {
    shell::trigger_typing(&app);
    Ok(())
}

/// Tauri command: cancel the countdown or typing in progress.
#[tauri::command]
pub fn stop_typing(app: tauri::AppHandle) -> Result<(), String> {
    shell::stop_typing(&app);
    Ok(())
}

/// Tauri command: start a snip (same as the tray item).
#[tauri::command]
pub fn start_snip(app: tauri::AppHandle) -> Result<(), String> {
    shell::trigger_ocr(&app);
    Ok(())
}
