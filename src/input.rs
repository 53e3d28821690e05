//! Keyboard state and the exit binding.
//!
//! The frame loop only asks one question of the keyboard: has the exit key
//! been pressed. Every other key is tracked but has no effect.

use std::collections::HashSet;

use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Keys the application reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBindings {
    pub exit: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            exit: KeyCode::Escape,
        }
    }
}

/// Keyboard state for the current frame.
#[derive(Debug, Default)]
pub struct Input {
    bindings: KeyBindings,
    keys_held: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    close_requested: bool,
}

impl Input {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            ..Default::default()
        }
    }

    /// Check if a key was pressed this frame (just went down).
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Check if a key is currently held down.
    pub fn key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    /// Whether the loop should stop: exit key down or window closed.
    pub fn exit_requested(&self) -> bool {
        self.close_requested || self.key_held(self.bindings.exit) || self.key_pressed(self.bindings.exit)
    }

    /// Clear per-frame state. Held keys persist.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
    }

    /// Process a winit window event.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.close_requested = true,
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.press(key),
                        ElementState::Released => self.release(key),
                    }
                }
            }
            _ => {}
        }
    }

    fn press(&mut self, key: KeyCode) {
        // no repeat
        if !self.keys_held.contains(&key) {
            self.keys_pressed.insert(key);
        }
        self.keys_held.insert(key);
    }

    fn release(&mut self, key: KeyCode) {
        self.keys_held.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_state() {
        let mut input = Input::new(KeyBindings::default());

        assert!(!input.key_held(KeyCode::Space));
        assert!(!input.key_pressed(KeyCode::Space));

        input.press(KeyCode::Space);
        assert!(input.key_held(KeyCode::Space));
        assert!(input.key_pressed(KeyCode::Space));

        // After begin_frame, pressed is cleared but held remains
        input.begin_frame();
        assert!(input.key_held(KeyCode::Space));
        assert!(!input.key_pressed(KeyCode::Space));

        input.release(KeyCode::Space);
        assert!(!input.key_held(KeyCode::Space));
        assert!(!input.key_pressed(KeyCode::Space));
    }

    #[test]
    fn test_exit_key_released_before_frame_still_exits() {
        let mut input = Input::new(KeyBindings::default());

        // tapped between two redraws
        input.press(KeyCode::Escape);
        input.release(KeyCode::Escape);
        assert!(input.exit_requested());

        input.begin_frame();
        assert!(!input.exit_requested());
    }

    #[test]
    fn test_escape_requests_exit() {
        let mut input = Input::new(KeyBindings::default());
        assert!(!input.exit_requested());

        input.press(KeyCode::Escape);
        assert!(input.exit_requested());
    }

    #[test]
    fn test_other_keys_ignored() {
        let mut input = Input::new(KeyBindings::default());
        for key in [KeyCode::KeyQ, KeyCode::Space, KeyCode::Enter, KeyCode::F4] {
            input.press(key);
        }
        assert!(!input.exit_requested());
    }

    #[test]
    fn test_custom_exit_key() {
        let mut input = Input::new(KeyBindings { exit: KeyCode::KeyQ });
        input.press(KeyCode::Escape);
        assert!(!input.exit_requested());

        input.press(KeyCode::KeyQ);
        assert!(input.exit_requested());
    }

    #[test]
    fn test_close_requested() {
        let mut input = Input::new(KeyBindings::default());
        input.handle_event(&WindowEvent::CloseRequested);
        assert!(input.exit_requested());
    }
}
