//! TypeClip: Tauri application entry point.
//!
//! This is the app shell that wires together all domains and commands.
//! No business logic lives here, only module declarations, plugin
//! registration, state management, and the command registry.
//!
//! Core domains (platform-neutral, tested on any host):
//!   - inject/    grapheme-accurate synthetic typing
//!   - selector/  drag-to-select state machine and cursor guard
//!   - capture/   region capture with fallbacks
//!   - ocr/       text recognition and reading-order assembly
//!   - typing.rs, pipeline.rs, settings.rs, hotkeys.rs, clipboard.rs
//!
//! macOS shell:
//!   - shell.rs              flows behind hotkeys, tray and webviews
//!   - overlay.rs            the selection overlay window
//!   - tray.rs               menu bar icon
//!   - commands.rs           webview commands
//!   - settings_commands.rs  settings window commands

pub mod cancel;
pub mod capture;
pub mod clipboard;
pub mod hotkeys;
pub mod inject;
pub mod ocr;
pub mod permissions;
pub mod pipeline;
pub mod selector;
pub mod settings;
pub mod typing;

#[cfg(target_os = "macos")]
mod commands;
#[cfg(target_os = "macos")]
mod overlay;
#[cfg(target_os = "macos")]
mod settings_commands;
#[cfg(target_os = "macos")]
mod shell;
#[cfg(target_os = "macos")]
mod tray;

/// Load .env.local → .env from the project root, then start logging.
///
/// Uses CARGO_MANIFEST_DIR (compile-time path to src-tauri/) to find the
/// project root regardless of the binary's working directory.
fn init_logging() {
    let manifest_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let project_root = manifest_dir.parent().unwrap_or(manifest_dir);

    'env_load: for env_file in [".env.local", ".env"] {
        let path = project_root.join(env_file);
        if path.exists() {
            match dotenvy::from_path(&path) {
                Ok(_) => eprintln!("[STARTUP] Loaded {}", path.display()),
                Err(e) => eprintln!("[STARTUP] Failed to load {}: {}", path.display(), e),
            }
            break 'env_load;
        }
    }

    env_logger::init();
}

/// Entry point, called by main.rs.
#[cfg(target_os = "macos")]
pub fn run() {
    use tauri::Manager;
    use tauri_plugin_global_shortcut::ShortcutState;

    init_logging();

    let app = tauri::Builder::default()
        .plugin(tauri_plugin_shell::init())
        .plugin(tauri_plugin_dialog::init())
        .plugin(
            tauri_plugin_global_shortcut::Builder::new()
                .with_handler(|app, shortcut, event| {
                    if event.state() == ShortcutState::Pressed {
                        shell::on_shortcut(app, shortcut);
                    }
                })
                .build(),
        )
        .manage(overlay::OverlayInput::default())
        .invoke_handler(tauri::generate_handler![
            // Webview commands (commands.rs)
            commands::overlay_event,
            commands::get_preview,
            commands::confirm_preview,
            commands::cancel_preview,
            commands::start_typing,
            commands::stop_typing,
            commands::start_snip,
            // Settings commands (settings_commands.rs)
            settings_commands::get_settings,
            settings_commands::update_settings,
            settings_commands::close_settings,
        ])
        .setup(|app| {
            log::info!("TypeClip starting up");

            // Menu bar only: no Dock icon, no app switcher entry.
            app.set_activation_policy(tauri::ActivationPolicy::Accessory);

            // Warm up Vision off the main thread to avoid a cold first snip
            std::thread::spawn(|| {
                let warm_start = std::time::Instant::now();
                ocr::apple_vision::warm_up();
                log::info!(
                    "[OCR] Vision warm-up complete in {}ms",
                    warm_start.elapsed().as_millis()
                );
            });

            let shell = shell::Shell::new(app.handle());
            let settings = shell.settings.get();
            app.manage(shell);

            tray::setup_tray(app.handle(), &settings)?;
            shell::start(app.handle());

            log::info!("Tray initialized, ready");
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("Error building TypeClip");

    app.run(|app, event| {
        if let tauri::RunEvent::Exit = event {
            shell::shutdown(app);
        }
    });
}

/// Entry point on hosts without the macOS shell.
#[cfg(not(target_os = "macos"))]
pub fn run() {
    init_logging();
    log::error!("TypeClip's application shell only runs on macOS");
}
