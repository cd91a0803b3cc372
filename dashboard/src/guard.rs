use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::info;
use tracing_subscriber::{reload, EnvFilter, Registry};

/// Filter for the diagnostic channel. While blocking is enabled the chatty
/// `diag` target is turned off entirely — the terminal-era equivalent of
/// swapping `console.log` for a no-op. Warnings and errors use the default
/// targets and are never silenced.
pub fn diag_filter(blocking: bool, base: &str) -> EnvFilter {
    if blocking {
        EnvFilter::new(format!("{base},diag=off"))
    } else {
        EnvFilter::new(base)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyVerdict {
    /// The toggle chord flipped the guard; new state carried along.
    Toggled(bool),
    /// An inspection key was swallowed.
    Suppressed,
    /// Not the guard's business.
    Pass,
}

/// Keyboard deterrent against opening the debug overlay. Enabled by default,
/// flipped by Ctrl+Shift+M. Trivially bypassable and documented as such —
/// this reproduces behavior, it is not a security boundary.
pub struct InspectGuard {
    enabled: bool,
    base_filter: String,
    reload: Option<reload::Handle<EnvFilter, Registry>>,
}

impl InspectGuard {
    /// `reload` is None in headless runs and tests, where there is no
    /// diagnostic filter to swap.
    pub fn new(base_filter: &str, reload: Option<reload::Handle<EnvFilter, Registry>>) -> Self {
        Self {
            enabled: true,
            base_filter: base_filter.to_string(),
            reload,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> KeyVerdict {
        if is_toggle_chord(key) {
            self.enabled = !self.enabled;
            self.apply_filter();
            info!("inspect guard {}", if self.enabled { "enabled" } else { "disabled" });
            return KeyVerdict::Toggled(self.enabled);
        }
        if self.enabled && is_inspect_key(key) {
            return KeyVerdict::Suppressed;
        }
        KeyVerdict::Pass
    }

    fn apply_filter(&self) {
        if let Some(handle) = &self.reload {
            let filter = diag_filter(self.enabled, &self.base_filter);
            if let Err(e) = handle.reload(filter) {
                tracing::warn!("failed to swap diagnostic filter: {e}");
            }
        }
    }
}

/// Ctrl+Shift+M flips the guard.
fn is_toggle_chord(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('m') | KeyCode::Char('M'))
        && key.modifiers.contains(KeyModifiers::CONTROL | KeyModifiers::SHIFT)
}

/// The keys that would open the debug overlay: F12, Ctrl+Shift+I, Ctrl+U.
/// The Menu key stands in for the context menu.
pub fn is_inspect_key(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::F(12) => true,
        KeyCode::Menu => true,
        KeyCode::Char('i') | KeyCode::Char('I') => {
            key.modifiers.contains(KeyModifiers::CONTROL | KeyModifiers::SHIFT)
        }
        KeyCode::Char('u') => {
            key.modifiers.contains(KeyModifiers::CONTROL)
                && !key.modifiers.contains(KeyModifiers::SHIFT)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, mods: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, mods)
    }

    #[test]
    fn chord_toggles_the_guard() {
        let mut guard = InspectGuard::new("info", None);
        assert!(guard.enabled());

        let chord = key(KeyCode::Char('M'), KeyModifiers::CONTROL | KeyModifiers::SHIFT);
        assert_eq!(guard.handle_key(&chord), KeyVerdict::Toggled(false));
        assert!(!guard.enabled());
        assert_eq!(guard.handle_key(&chord), KeyVerdict::Toggled(true));
    }

    #[test]
    fn inspection_keys_are_suppressed_while_enabled() {
        let mut guard = InspectGuard::new("info", None);
        let f12 = key(KeyCode::F(12), KeyModifiers::NONE);
        let ctrl_shift_i = key(KeyCode::Char('I'), KeyModifiers::CONTROL | KeyModifiers::SHIFT);
        let ctrl_u = key(KeyCode::Char('u'), KeyModifiers::CONTROL);

        assert_eq!(guard.handle_key(&f12), KeyVerdict::Suppressed);
        assert_eq!(guard.handle_key(&ctrl_shift_i), KeyVerdict::Suppressed);
        assert_eq!(guard.handle_key(&ctrl_u), KeyVerdict::Suppressed);
    }

    #[test]
    fn inspection_keys_pass_while_disabled() {
        let mut guard = InspectGuard::new("info", None);
        let chord = key(KeyCode::Char('M'), KeyModifiers::CONTROL | KeyModifiers::SHIFT);
        guard.handle_key(&chord);

        let f12 = key(KeyCode::F(12), KeyModifiers::NONE);
        assert_eq!(guard.handle_key(&f12), KeyVerdict::Pass);
    }

    #[test]
    fn ordinary_keys_always_pass() {
        let mut guard = InspectGuard::new("info", None);
        let plain = key(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(guard.handle_key(&plain), KeyVerdict::Pass);
    }
}
