//! Settings Tauri commands.
//!
//! Handles:
//! - Reading the current settings
//! - Saving a new settings object (sanitized, persisted, hotkeys re-bound)

use crate::hotkeys::HotkeySlot;
use crate::settings::Settings;
use crate::shell::Shell;
use crate::tray;

/// Tauri command: current settings.
#[tauri::command]
pub fn get_settings(shell: tauri::State<'_, Shell>) -> Result<Settings, String> {
    Ok(shell.settings.get())
}

/// Tauri command: replace all settings.
///
/// Values are clamped into range before saving; the stored result is
/// returned so the UI can show what was actually kept. Changed shortcuts
/// are re-registered immediately. A shortcut the system refuses keeps its
/// previous combination and the refusal is returned as the error.
#[tauri::command]
pub fn update_settings(
    app: tauri::AppHandle,
    shell: tauri::State<'_, Shell>,
    settings: Settings,
) -> Result<Settings, String> {
    let saved = shell
        .settings
        .update(|current| *current = settings)
        .map_err(|e| e.to_string())?;
    let failures = shell.bind_hotkeys(&saved);
    if failures.is_empty() {
        tray::sync_settings(&app, &saved);
        log::info!("[SETTINGS] Updated from settings window");
        return Ok(saved);
    }

    // Store what is actually registered so the window shows the truth.
    let kept = shell
        .settings
        .update(|current| {
            for (slot, _) in &failures {
                if let Some(bound) = shell.hotkeys.binding(*slot) {
                    match slot {
                        HotkeySlot::Typing => current.typing_shortcut = bound,
                        HotkeySlot::Ocr => current.ocr_shortcut = bound,
                    }
                }
            }
        })
        .map_err(|e| e.to_string())?;
    tray::sync_settings(&app, &kept);
    let reasons: Vec<String> = failures.iter().map(|(_, e)| e.to_string()).collect();
    Err(reasons.join("; "))
}

/// Open (or focus) the settings window.
pub fn open_settings(app: &tauri::AppHandle) {
    use tauri::Manager;
    if let Some(window) = app.get_webview_window("settings") {
        let _ = window.set_focus();
        return;
    }
    match tauri::WebviewWindowBuilder::new(
        app,
        "settings",
        tauri::WebviewUrl::App("settings.html".into()),
    )
    .title("TypeClip Settings")
    .inner_size(440.0, 520.0)
    .resizable(false)
    .center()
    .build()
    {
        Ok(_) => log::info!("[SETTINGS] Window opened"),
        Err(e) => log::error!("[SETTINGS] Failed to open: {}", e),
    }
}

/// Tauri command: close the settings window.
#[tauri::command]
pub fn close_settings(app: tauri::AppHandle) -> Result<(), String> {
    use tauri::Manager;
    if let Some(window) = app.get_webview_window("settings") {
        window.close().map_err(|e| e.to_string())?;
    }
    Ok(())
}
