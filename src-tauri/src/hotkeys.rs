//! Global hotkey bindings for the typing and OCR triggers.
//!
//! The system hotkey tap is one process-wide resource. `HotkeyRegistry` owns
//! it and exposes two independent slots, so rebinding one trigger never
//! disturbs the other. Rebinding a slot always unregisters its previous
//! combination before registering the new one.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

pub const SHIFT: u32 = 1;
pub const CONTROL: u32 = 2;
pub const ALT: u32 = 4;
pub const SUPER: u32 = 8;

const ALL_MODIFIERS: u32 = SHIFT | CONTROL | ALT | SUPER;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HotkeySlot {
    Typing,
    Ocr,
}

impl HotkeySlot {
    pub const ALL: [HotkeySlot; 2] = [HotkeySlot::Typing, HotkeySlot::Ocr];
}

/// A key identifier (W3C `code`, e.g. `KeyV`) plus a modifier bitmask.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutBinding {
    pub key: String,
    pub modifiers: u32,
}

impl ShortcutBinding {
    pub fn new(key: impl Into<String>, modifiers: u32) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }

    pub fn default_typing() -> Self {
        Self::new("KeyV", SUPER | SHIFT)
    }

    pub fn default_ocr() -> Self {
        Self::new("KeyO", SUPER | SHIFT)
    }

    pub fn validate(&self) -> Result<(), HotkeyError> {
        if self.key.trim().is_empty() {
            return Err(HotkeyError::Invalid("missing key".into()));
        }
        if self.modifiers & ALL_MODIFIERS == 0 {
            return Err(HotkeyError::Invalid(format!(
                "{} needs at least one modifier",
                self.key
            )));
        }
        if self.modifiers & !ALL_MODIFIERS != 0 {
            return Err(HotkeyError::Invalid(format!(
                "unknown modifier bits {:#x}",
                self.modifiers & !ALL_MODIFIERS
            )));
        }
        Ok(())
    }

    /// Accelerator string understood by the global-shortcut plugin.
    pub fn accelerator(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if self.modifiers & SHIFT != 0 {
            parts.push("shift");
        }
        if self.modifiers & CONTROL != 0 {
            parts.push("control");
        }
        if self.modifiers & ALT != 0 {
            parts.push("alt");
        }
        if self.modifiers & SUPER != 0 {
            parts.push("super");
        }
        parts.push(&self.key);
        parts.join("+")
    }

    /// Short human label, e.g. `⌃⌥⇧⌘V`.
    pub fn label(&self) -> String {
        let mut out = String::new();
        for (bit, glyph) in [(CONTROL, '⌃'), (ALT, '⌥'), (SHIFT, '⇧'), (SUPER, '⌘')] {
            if self.modifiers & bit != 0 {
                out.push(glyph);
            }
        }
        let key = self
            .key
            .strip_prefix("Key")
            .or_else(|| self.key.strip_prefix("Digit"))
            .unwrap_or(&self.key);
        out.push_str(key);
        out
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("invalid shortcut: {0}")]
    Invalid(String),
    #[error("{0} is already bound to the other trigger")]
    Conflict(String),
    #[error("could not register {accelerator}: {reason}")]
    Register { accelerator: String, reason: String },
    #[error("could not unregister {accelerator}: {reason}")]
    Unregister { accelerator: String, reason: String },
}

/// The system-wide hotkey source.
pub trait HotkeyBackend: Send + Sync {
    fn register(&self, binding: &ShortcutBinding) -> Result<(), HotkeyError>;
    fn unregister(&self, binding: &ShortcutBinding) -> Result<(), HotkeyError>;
}

pub struct HotkeyRegistry {
    backend: Arc<dyn HotkeyBackend>,
    slots: Mutex<HashMap<HotkeySlot, ShortcutBinding>>,
}

impl HotkeyRegistry {
    pub fn new(backend: Arc<dyn HotkeyBackend>) -> Self {
        Self {
            backend,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<HotkeySlot, ShortcutBinding>> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register `binding` for `slot`, replacing whatever the slot held.
    ///
    /// If the new combination cannot be registered the previous one is
    /// restored, so a failed rebind leaves the trigger working.
    pub fn bind(&self, slot: HotkeySlot, binding: ShortcutBinding) -> Result<(), HotkeyError> {
        binding.validate()?;
        let mut slots = self.slots();

        let clash = slots
            .iter()
            .any(|(other, existing)| *other != slot && *existing == binding);
        if clash {
            return Err(HotkeyError::Conflict(binding.label()));
        }

        let previous = slots.remove(&slot);
        if let Some(prev) = &previous {
            if let Err(e) = self.backend.unregister(prev) {
                log::warn!("[HOTKEY] {}", e);
            }
        }

        match self.backend.register(&binding) {
            Ok(()) => {
                log::info!("[HOTKEY] {:?} bound to {}", slot, binding.accelerator());
                slots.insert(slot, binding);
                Ok(())
            }
            Err(e) => {
                log::error!("[HOTKEY] {}", e);
                if let Some(prev) = previous {
                    if self.backend.register(&prev).is_ok() {
                        slots.insert(slot, prev);
                    }
                }
                Err(e)
            }
        }
    }

    /// Bring every slot in `wanted` to its binding, leaving unchanged slots
    /// alone. Changed slots are released first so two triggers can swap
    /// combinations. A slot that fails keeps its previous binding.
    pub fn bind_all(
        &self,
        wanted: impl IntoIterator<Item = (HotkeySlot, ShortcutBinding)>,
    ) -> Vec<(HotkeySlot, HotkeyError)> {
        let changed: Vec<(HotkeySlot, ShortcutBinding, Option<ShortcutBinding>)> = wanted
            .into_iter()
            .filter_map(|(slot, binding)| {
                let previous = self.binding(slot);
                (previous.as_ref() != Some(&binding)).then_some((slot, binding, previous))
            })
            .collect();
        for (slot, _, _) in &changed {
            self.unbind(*slot);
        }

        let mut failures = Vec::new();
        for (slot, binding, previous) in changed {
            if let Err(e) = self.bind(slot, binding) {
                if let Some(prev) = previous {
                    if let Err(restore) = self.bind(slot, prev) {
                        log::error!("[HOTKEY] {:?} left unbound: {}", slot, restore);
                    }
                }
                failures.push((slot, e));
            }
        }
        failures
    }

    pub fn unbind(&self, slot: HotkeySlot) {
        if let Some(binding) = self.slots().remove(&slot) {
            match self.backend.unregister(&binding) {
                Ok(()) => log::info!("[HOTKEY] {:?} unbound", slot),
                Err(e) => log::warn!("[HOTKEY] {}", e),
            }
        }
    }

    /// Release both slots. Called at shutdown.
    pub fn unbind_all(&self) {
        for slot in HotkeySlot::ALL {
            self.unbind(slot);
        }
    }

    pub fn binding(&self, slot: HotkeySlot) -> Option<ShortcutBinding> {
        self.slots().get(&slot).cloned()
    }

    /// The slot whose binding satisfies `matches`, if any.
    pub fn find(&self, matches: impl Fn(&ShortcutBinding) -> bool) -> Option<HotkeySlot> {
        self.slots()
            .iter()
            .find(|(_, binding)| matches(binding))
            .map(|(slot, _)| *slot)
    }
}

/// Unmodified Escape, used to cancel selection and typing.
pub const ESCAPE_KEY: &str = "Escape";

/// System-wide Escape, shared by every flow that can be cancelled with it.
///
/// An overlay session and a typing run may want Escape at the same time;
/// the key is registered on the first claim and released with the last.
pub struct EscapeKey {
    backend: Arc<dyn HotkeyBackend>,
    claims: Mutex<usize>,
}

impl EscapeKey {
    pub fn new(backend: Arc<dyn HotkeyBackend>) -> Self {
        Self {
            backend,
            claims: Mutex::new(0),
        }
    }

    fn binding() -> ShortcutBinding {
        ShortcutBinding::new(ESCAPE_KEY, 0)
    }

    fn claims(&self) -> MutexGuard<'_, usize> {
        match self.claims.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Hold Escape until the returned claim is dropped.
    pub fn claim(self: &Arc<Self>) -> Result<EscapeClaim, HotkeyError> {
        let mut claims = self.claims();
        if *claims == 0 {
            self.backend.register(&Self::binding())?;
            log::debug!("[HOTKEY] Global Escape registered");
        }
        *claims += 1;
        Ok(EscapeClaim {
            key: Arc::clone(self),
        })
    }

    pub fn is_held(&self) -> bool {
        *self.claims() > 0
    }

    fn release(&self) {
        let mut claims = self.claims();
        *claims = claims.saturating_sub(1);
        if *claims == 0 {
            match self.backend.unregister(&Self::binding()) {
                Ok(()) => log::debug!("[HOTKEY] Global Escape released"),
                Err(e) => log::warn!("[HOTKEY] {}", e),
            }
        }
    }
}

/// One holder's share of the global Escape.
pub struct EscapeClaim {
    key: Arc<EscapeKey>,
}

impl Drop for EscapeClaim {
    fn drop(&mut self) {
        self.key.release();
    }
}

#[cfg(target_os = "macos")]
pub use system::GlobalShortcutBackend;

#[cfg(target_os = "macos")]
mod system {
    use super::{HotkeyBackend, HotkeyError, ShortcutBinding};
    use tauri::AppHandle;
    use tauri_plugin_global_shortcut::GlobalShortcutExt;

    /// Hotkeys through the Tauri global-shortcut plugin. Presses are routed
    /// by the plugin handler installed in `run()`.
    pub struct GlobalShortcutBackend {
        app: AppHandle,
    }

    impl GlobalShortcutBackend {
        pub fn new(app: AppHandle) -> Self {
            Self { app }
        }
    }

    impl HotkeyBackend for GlobalShortcutBackend {
        fn register(&self, binding: &ShortcutBinding) -> Result<(), HotkeyError> {
            let accelerator = binding.accelerator();
            self.app
                .global_shortcut()
                .register(accelerator.as_str())
                .map_err(|e| HotkeyError::Register {
                    accelerator: accelerator.clone(),
                    reason: e.to_string(),
                })
        }

        fn unregister(&self, binding: &ShortcutBinding) -> Result<(), HotkeyError> {
            let accelerator = binding.accelerator();
            self.app
                .global_shortcut()
                .unregister(accelerator.as_str())
                .map_err(|e| HotkeyError::Unregister {
                    accelerator: accelerator.clone(),
                    reason: e.to_string(),
                })
        }
    }
}
