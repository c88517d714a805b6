//! Keyboard state tracking bound to named actions.
//!
//! The device keeps a fixed table of pressed/released states for the tracked
//! key-code range plus the four named modifiers, and answers queries through
//! an application-defined binding table (action name -> key). Host key events
//! are fed in through `key_down`/`key_up`; codes outside the tracked range
//! are dropped.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// First tracked numeric key code (inclusive).
pub const CODE_MIN: u8 = 16;
/// One past the last tracked numeric key code.
pub const CODE_MAX: u8 = 128;

const CODE_SLOTS: usize = (CODE_MAX - CODE_MIN) as usize;
const MODIFIER_SLOTS: usize = 4;

/// Modifier keys tracked by name rather than by numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Shift,
    Ctrl,
    Alt,
    Meta,
}

/// A key identifier: a numeric code in `CODE_MIN..CODE_MAX`, or a named
/// modifier. In binding JSON a key is either a bare number or one of the
/// strings `"shift"`, `"ctrl"`, `"alt"`, `"meta"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Code(u8),
    Modifier(Modifier),
}

impl Key {
    pub const SHIFT: Key = Key::Modifier(Modifier::Shift);
    pub const CTRL: Key = Key::Modifier(Modifier::Ctrl);
    pub const ALT: Key = Key::Modifier(Modifier::Alt);
    pub const META: Key = Key::Modifier(Modifier::Meta);
}

/// Action name -> key table. Supplied at device construction and fixed
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bindings(HashMap<String, Key>);

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn bind(&mut self, action: impl Into<String>, key: Key) {
        self.0.insert(action.into(), key);
    }

    pub fn get(&self, action: &str) -> Option<Key> {
        self.0.get(action).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug)]
pub struct KeyboardDevice {
    bindings: Bindings,
    states: [bool; CODE_SLOTS + MODIFIER_SLOTS],
}

fn slot_index(key: Key) -> Option<usize> {
    match key {
        Key::Code(code) if (CODE_MIN..CODE_MAX).contains(&code) => {
            Some((code - CODE_MIN) as usize)
        }
        Key::Code(_) => None,
        Key::Modifier(modifier) => Some(CODE_SLOTS + modifier as usize),
    }
}

impl KeyboardDevice {
    /// All tracked keys start released.
    pub fn new(bindings: Bindings) -> Self {
        Self {
            bindings,
            states: [false; CODE_SLOTS + MODIFIER_SLOTS],
        }
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Host key-down notification. Untracked keys are dropped; repeat-fire
    /// notifications for a held key leave the state unchanged.
    pub fn key_down(&mut self, key: Key) {
        if let Some(i) = slot_index(key) {
            self.states[i] = true;
        }
    }

    /// Host key-up notification. Untracked keys are dropped.
    pub fn key_up(&mut self, key: Key) {
        if let Some(i) = slot_index(key) {
            self.states[i] = false;
        }
    }

    /// Raw state of a key, ignoring bindings.
    pub fn pressed(&self, key: Key) -> bool {
        slot_index(key).map(|i| self.states[i]).unwrap_or(false)
    }

    /// Whether the key bound to `action` is currently pressed. Unbound
    /// actions read as released.
    pub fn on(&self, action: &str) -> bool {
        self.bindings
            .get(action)
            .map(|key| self.pressed(key))
            .unwrap_or(false)
    }

    /// Consume-on-read query: if the bound key is pressed, clears it and
    /// returns true. The state re-arms on the next key-down notification,
    /// so a held key acts as a one-shot trigger.
    pub fn toggle(&mut self, action: &str) -> bool {
        let Some(key) = self.bindings.get(action) else {
            return false;
        };
        let Some(i) = slot_index(key) else {
            return false;
        };
        if self.states[i] {
            self.states[i] = false;
            true
        } else {
            false
        }
    }
}
