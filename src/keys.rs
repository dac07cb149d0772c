//! Keyboard bindings for pip navigation
//!
//! Each command accepts several synonym keys.

use egui::Key;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavCommand {
    Next,
    Previous,
    Dismiss,
}

/// Key names as written in the viewer config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    pub next: Vec<String>,
    pub previous: Vec<String>,
    pub dismiss: Vec<String>,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            next: vec!["ArrowRight".to_string(), "ArrowDown".to_string()],
            previous: vec!["ArrowLeft".to_string(), "ArrowUp".to_string()],
            dismiss: vec!["Escape".to_string()],
        }
    }
}

/// Resolved key bindings
#[derive(Debug, Clone, Default)]
pub struct KeyBindings {
    bindings: Vec<(Key, NavCommand)>,
}

impl KeyBindings {
    /// Resolve key names; unknown names are logged and skipped
    pub fn from_config(config: &KeyConfig) -> Self {
        let mut bindings = Vec::new();
        let groups = [
            (&config.next, NavCommand::Next),
            (&config.previous, NavCommand::Previous),
            (&config.dismiss, NavCommand::Dismiss),
        ];
        for (names, command) in groups {
            for name in names {
                match Key::from_name(name) {
                    Some(key) => bindings.push((key, command)),
                    None => tracing::warn!("Unknown key name '{}' for {:?}, skipping", name, command),
                }
            }
        }
        Self { bindings }
    }

    pub fn command_for(&self, key: Key) -> Option<NavCommand> {
        self.bindings
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, command)| *command)
    }

    /// Commands triggered by key presses in this frame's input, in order
    pub fn commands(&self, events: &[egui::Event]) -> Vec<NavCommand> {
        events
            .iter()
            .filter_map(|event| match event {
                egui::Event::Key { key, pressed: true, .. } => self.command_for(*key),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(key: Key) -> egui::Event {
        egui::Event::Key {
            key,
            physical_key: None,
            pressed: true,
            repeat: false,
            modifiers: egui::Modifiers::default(),
        }
    }

    #[test]
    fn test_synonym_keys() {
        let keys = KeyBindings::from_config(&KeyConfig::default());
        assert_eq!(keys.command_for(Key::ArrowRight), Some(NavCommand::Next));
        assert_eq!(keys.command_for(Key::ArrowDown), Some(NavCommand::Next));
        assert_eq!(keys.command_for(Key::ArrowLeft), Some(NavCommand::Previous));
        assert_eq!(keys.command_for(Key::ArrowUp), Some(NavCommand::Previous));
        assert_eq!(keys.command_for(Key::Escape), Some(NavCommand::Dismiss));
        assert_eq!(keys.command_for(Key::A), None);
    }

    #[test]
    fn test_unknown_names_skipped() {
        let config = KeyConfig {
            next: vec!["N".to_string(), "NotAKey".to_string()],
            previous: vec![],
            dismiss: vec![],
        };
        let keys = KeyBindings::from_config(&config);
        assert_eq!(keys.command_for(Key::N), Some(NavCommand::Next));
        assert_eq!(keys.command_for(Key::ArrowRight), None);
    }

    #[test]
    fn test_commands_from_events() {
        let keys = KeyBindings::from_config(&KeyConfig::default());
        let mut release = press(Key::ArrowLeft);
        if let egui::Event::Key { pressed, .. } = &mut release {
            *pressed = false;
        }
        let events = vec![press(Key::ArrowRight), release, press(Key::ArrowUp), press(Key::B)];
        assert_eq!(keys.commands(&events), vec![NavCommand::Next, NavCommand::Previous]);
    }
}
