//! User settings persistence.
//!
//! Settings live in `~/Library/Application Support/typeclip/settings.json`
//! (`dirs::config_dir()`), or under `$TYPECLIP_CONFIG_DIR` when set.
//! A missing or unreadable file yields defaults; every value is clamped
//! into range on load and on update.

use crate::hotkeys::ShortcutBinding;
use crate::inject::{DEFAULT_PACING_MS, MAX_PACING_MS, MIN_PACING_MS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

pub const MIN_TYPING_DELAY_SECS: f64 = 0.5;
pub const MAX_TYPING_DELAY_SECS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CountdownDisplay {
    /// Remaining seconds shown as the tray title.
    #[default]
    MenuBar,
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Seconds between the trigger and the first keystroke.
    pub typing_delay_secs: f64,
    /// Milliseconds per character.
    pub typing_speed_ms: f64,
    /// Ask before typing more graphemes than this.
    pub char_warning_threshold: usize,
    pub auto_clear: bool,
    pub countdown_display: CountdownDisplay,
    pub typing_shortcut: ShortcutBinding,
    pub ocr_shortcut: ShortcutBinding,
    pub ocr_enabled: bool,
    pub ocr_preview: bool,
    pub autostart: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            typing_delay_secs: 3.0,
            typing_speed_ms: DEFAULT_PACING_MS,
            char_warning_threshold: 500,
            auto_clear: false,
            countdown_display: CountdownDisplay::MenuBar,
            typing_shortcut: ShortcutBinding::default_typing(),
            ocr_shortcut: ShortcutBinding::default_ocr(),
            ocr_enabled: true,
            ocr_preview: true,
            autostart: false,
        }
    }
}

fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

impl Settings {
    /// Countdown length. Values above the maximum are capped; negative or
    /// non-finite values fall back to the default delay.
    pub fn typing_delay(&self) -> Duration {
        let fallback = Duration::from_secs_f64(Settings::default().typing_delay_secs);
        if !self.typing_delay_secs.is_finite() {
            return fallback;
        }
        Duration::try_from_secs_f64(self.typing_delay_secs.min(MAX_TYPING_DELAY_SECS))
            .unwrap_or(fallback)
    }

    /// Copy with every field forced into its valid range.
    pub fn sanitized(mut self) -> Self {
        let defaults = Settings::default();
        self.typing_delay_secs = clamp_or(
            self.typing_delay_secs,
            MIN_TYPING_DELAY_SECS,
            MAX_TYPING_DELAY_SECS,
            defaults.typing_delay_secs,
        );
        self.typing_speed_ms = clamp_or(
            self.typing_speed_ms,
            MIN_PACING_MS,
            MAX_PACING_MS,
            defaults.typing_speed_ms,
        );
        self.char_warning_threshold = self.char_warning_threshold.max(1);
        if self.typing_shortcut.validate().is_err() {
            self.typing_shortcut = defaults.typing_shortcut;
        }
        if self.ocr_shortcut.validate().is_err() || self.ocr_shortcut == self.typing_shortcut {
            self.ocr_shortcut = defaults.ocr_shortcut;
        }
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to create settings directory: {0}")]
    CreateDir(std::io::Error),
    #[error("failed to write settings: {0}")]
    Write(std::io::Error),
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Directory holding settings.json.
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("TYPECLIP_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("typeclip")
}

/// Read settings from `path`, falling back to defaults.
pub fn load(path: &Path) -> Settings {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return Settings::default(),
    };
    match serde_json::from_str::<Settings>(&raw) {
        Ok(settings) => settings.sanitized(),
        Err(e) => {
            log::warn!("[SETTINGS] Ignoring unreadable {}: {}", path.display(), e);
            Settings::default()
        }
    }
}

pub fn save(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(SettingsError::CreateDir)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json).map_err(SettingsError::Write)?;
    Ok(())
}

/// Current settings plus the file they persist to.
pub struct SettingsStore {
    path: PathBuf,
    current: Mutex<Settings>,
}

impl SettingsStore {
    pub fn open(dir: &Path) -> Self {
        let path = dir.join("settings.json");
        let current = load(&path);
        log::info!("[SETTINGS] Loaded from {}", path.display());
        Self {
            path,
            current: Mutex::new(current),
        }
    }

    pub fn open_default() -> Self {
        Self::open(&config_dir())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> Settings {
        match self.current.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Apply `change`, sanitize, persist, and return the stored result.
    ///
    /// The in-memory value is updated even if the write fails.
    pub fn update(&self, change: impl FnOnce(&mut Settings)) -> Result<Settings, SettingsError> {
        let next = {
            let mut guard = match self.current.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let mut next = guard.clone();
            change(&mut next);
            *guard = next.sanitized();
            guard.clone()
        };
        save(&self.path, &next)?;
        log::info!("[SETTINGS] Saved");
        Ok(next)
    }
}
