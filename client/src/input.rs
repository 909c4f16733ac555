//! Keyboard input: movement keys and the username prompt

use crate::game::Direction;
use macroquad::prelude::*;
use shared::MAX_USERNAME_LEN;

const MOVEMENT_KEYS: [(KeyCode, Direction); 4] = [
    (KeyCode::W, Direction::Up),
    (KeyCode::S, Direction::Down),
    (KeyCode::A, Direction::Left),
    (KeyCode::D, Direction::Right),
];

/// Movement keys held this frame; each one moves the avatar a full step
pub fn poll_directions() -> Vec<Direction> {
    MOVEMENT_KEYS
        .iter()
        .filter(|(key, _)| is_key_down(*key))
        .map(|(_, direction)| *direction)
        .collect()
}

/// Text entry shown before joining the arena
#[derive(Debug, Clone, Default)]
pub struct UsernamePrompt {
    buffer: String,
}

impl UsernamePrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Appends a printable character. Returns false if it was refused.
    pub fn push_char(&mut self, c: char) -> bool {
        if c.is_control() || self.buffer.chars().count() >= MAX_USERNAME_LEN {
            return false;
        }
        self.buffer.push(c);
        true
    }

    pub fn backspace(&mut self) {
        self.buffer.pop();
    }

    /// The entered name, if there is anything besides whitespace.
    pub fn submit(&self) -> Option<String> {
        let name = self.buffer.trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    /// Consumes this frame's keyboard events. Returns the name once confirmed.
    pub fn update(&mut self) -> Option<String> {
        while let Some(c) = get_char_pressed() {
            self.push_char(c);
        }
        if is_key_pressed(KeyCode::Backspace) {
            self.backspace();
        }
        if is_key_pressed(KeyCode::Enter) || is_key_pressed(KeyCode::KpEnter) {
            return self.submit();
        }
        None
    }
}
