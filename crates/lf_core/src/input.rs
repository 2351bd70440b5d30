//! Level-triggered keyboard state.
//!
//! `is_held(key)` is true every tick the key is physically down. Movement
//! samples this once per tick; there is no event queue, so only the current
//! state matters.

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    ShiftLeft,
    ShiftRight,
    Escape,
    F3,
}

/// Evaluation order for directional keys. Later entries win when several are
/// held at once.
pub const DIRECTIONAL_KEYS: [Key; 4] = [Key::ArrowUp, Key::ArrowDown, Key::ArrowLeft, Key::ArrowRight];

pub struct InputState {
    held: HashSet<Key>,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
        }
    }

    pub fn key_down(&mut self, key: Key) {
        self.held.insert(key);
    }

    pub fn key_up(&mut self, key: Key) {
        self.held.remove(&key);
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    /// Either physical shift key counts as the sprint modifier.
    pub fn sprint_held(&self) -> bool {
        self.is_held(Key::ShiftLeft) || self.is_held(Key::ShiftRight)
    }

    pub fn any_directional_held(&self) -> bool {
        DIRECTIONAL_KEYS.iter().any(|&k| self.is_held(k))
    }

    /// Drop every held key, e.g. when the window loses focus and key-up events
    /// will never arrive.
    pub fn release_all(&mut self) {
        self.held.clear();
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}
