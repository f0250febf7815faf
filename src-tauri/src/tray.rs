//! Menu bar tray icon and menu.
//!
//! The tray is the app's only persistent UI. Its title doubles as the
//! typing countdown when the countdown display mode is `menuBar`.

use crate::settings::Settings;
use crate::shell::{self, Shell};
use tauri::{
    image::Image as TauriImage,
    menu::{
        CheckMenuItem, CheckMenuItemBuilder, MenuBuilder, MenuItem, MenuItemBuilder,
        PredefinedMenuItem,
    },
    tray::TrayIconBuilder,
    AppHandle, Manager, Wry,
};

pub const TRAY_ID: &str = "typeclip";

/// Menu items whose state changes at runtime.
pub struct TrayItems {
    pub type_clipboard: MenuItem<Wry>,
    pub snip_text: MenuItem<Wry>,
    pub ocr_enabled: CheckMenuItem<Wry>,
}

/// Accelerators shown next to Type Clipboard and Snip Text.
fn trigger_accelerators(settings: &Settings) -> (String, String) {
    (
        settings.typing_shortcut.accelerator(),
        settings.ocr_shortcut.accelerator(),
    )
}

pub fn setup_tray(app: &AppHandle, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let (typing_acc, ocr_acc) = trigger_accelerators(settings);
    let type_item = MenuItemBuilder::with_id("type_clipboard", "Type Clipboard")
        .accelerator(typing_acc)
        .build(app)?;
    let snip_item = MenuItemBuilder::with_id("snip_text", "Snip Text")
        .accelerator(ocr_acc)
        .build(app)?;
    let stop_item = MenuItemBuilder::with_id("stop_typing", "Stop Typing").build(app)?;
    let ocr_item = CheckMenuItemBuilder::with_id("ocr_enabled", "Enable OCR")
        .checked(settings.ocr_enabled)
        .build(app)?;
    let settings_item = MenuItemBuilder::with_id("settings", "Settings…").build(app)?;
    let quit_item = MenuItemBuilder::with_id("quit", "Quit TypeClip").build(app)?;

    let menu = MenuBuilder::new(app)
        .item(&type_item)
        .item(&snip_item)
        .item(&stop_item)
        .item(&PredefinedMenuItem::separator(app)?)
        .item(&ocr_item)
        .item(&settings_item)
        .item(&PredefinedMenuItem::separator(app)?)
        .item(&quit_item)
        .build()?;

    // Decode the PNG icon to RGBA for Tauri's Image type
    let icon_bytes = include_bytes!("../icons/32x32.png");
    let icon_img = image::load_from_memory(icon_bytes)
        .map_err(|e| format!("Failed to decode tray icon: {}", e))?;
    let rgba = icon_img.to_rgba8();
    let (w, h) = (rgba.width(), rgba.height());
    let tray_icon = TauriImage::new_owned(rgba.into_raw(), w, h);

    TrayIconBuilder::with_id(TRAY_ID)
        .icon(tray_icon)
        .icon_as_template(true)
        .tooltip("TypeClip")
        .menu(&menu)
        .show_menu_on_left_click(true)
        .on_menu_event(|app, event| match event.id().as_ref() {
            "type_clipboard" => shell::trigger_typing(app),
            "snip_text" => shell::trigger_ocr(app),
            "stop_typing" => shell::stop_typing(app),
            "ocr_enabled" => toggle_ocr(app),
            "settings" => crate::settings_commands::open_settings(app),
            "quit" => {
                log::info!("Quit requested from tray menu");
                app.exit(0);
            }
            _ => {}
        })
        .build(app)?;

    app.manage(TrayItems {
        type_clipboard: type_item,
        snip_text: snip_item,
        ocr_enabled: ocr_item,
    });
    Ok(())
}

fn toggle_ocr(app: &AppHandle) {
    let shell = app.state::<Shell>();
    match shell.settings.update(|s| s.ocr_enabled = !s.ocr_enabled) {
        Ok(settings) => sync_settings(app, &settings),
        Err(e) => log::error!("[SETTINGS] {}", e),
    }
}

/// Reflect persisted settings in the menu.
pub fn sync_settings(app: &AppHandle, settings: &Settings) {
    let Some(items) = app.try_state::<TrayItems>() else {
        return;
    };
    if let Err(e) = items.ocr_enabled.set_checked(settings.ocr_enabled) {
        log::warn!("[SETTINGS] Tray check state not updated: {}", e);
    }
    let (typing_acc, ocr_acc) = trigger_accelerators(settings);
    for (item, accelerator) in [(&items.type_clipboard, typing_acc), (&items.snip_text, ocr_acc)] {
        if let Err(e) = item.set_accelerator(Some(accelerator)) {
            log::warn!("[SETTINGS] Tray shortcut not updated: {}", e);
        }
    }
}

/// Show `secs` as the tray title, or clear it.
pub fn show_countdown(app: &AppHandle, secs: Option<u64>) {
    let Some(tray) = app.tray_by_id(TRAY_ID) else {
        return;
    };
    let title = secs.map(|s| s.to_string());
    if let Err(e) = tray.set_title(title) {
        log::debug!("[TYPING] Countdown title not shown: {}", e);
    }
}

pub fn show_clipboard_status(app: &AppHandle, chars: usize) {
    let Some(tray) = app.tray_by_id(TRAY_ID) else {
        return;
    };
    let tooltip = if chars == 0 {
        "TypeClip: clipboard empty".to_string()
    } else {
        format!("TypeClip: {} characters ready", chars)
    };
    let _ = tray.set_tooltip(Some(tooltip));
}
