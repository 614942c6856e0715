//! Key mapping for terminal input
//!
//! Converts crossterm key events to the raw key data the line editor
//! consumes: one logical keystroke per event, control keys as their
//! ASCII control codes.

use bitflags::bitflags;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

bitflags! {
    /// Modifier keys
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = Modifiers::empty();
        if mods.contains(KeyModifiers::SHIFT) {
            result |= Modifiers::SHIFT;
        }
        if mods.contains(KeyModifiers::CONTROL) {
            result |= Modifiers::CTRL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= Modifiers::ALT;
        }
        result
    }
}

/// End-of-transmission (Ctrl+D)
pub const EOT: &str = "\x04";

/// Key mapper for converting key events to raw key data
pub struct KeyMapper;

impl KeyMapper {
    /// Map a crossterm KeyEvent to raw key data
    pub fn map(event: &KeyEvent) -> Option<String> {
        let mods = Modifiers::from(event.modifiers);

        match event.code {
            KeyCode::Char(ch) => Self::map_char(ch, mods),
            KeyCode::Enter => Some("\r".to_string()),
            KeyCode::Backspace => Some("\x7f".to_string()),
            KeyCode::Tab => Some("\t".to_string()),
            KeyCode::Esc => Some("\x1b".to_string()),

            // Delivered so the editor can see and ignore them
            KeyCode::Up => Some("\x1b[A".to_string()),
            KeyCode::Down => Some("\x1b[B".to_string()),
            KeyCode::Right => Some("\x1b[C".to_string()),
            KeyCode::Left => Some("\x1b[D".to_string()),

            _ => None,
        }
    }

    /// Map a character with modifiers
    fn map_char(ch: char, mods: Modifiers) -> Option<String> {
        // Ctrl + letter = control character
        if mods.contains(Modifiers::CTRL) && !mods.contains(Modifiers::ALT) {
            if ch.is_ascii_alphabetic() {
                let ctrl_code = (ch.to_ascii_lowercase() as u8) - b'a' + 1;
                return Some(char::from(ctrl_code).to_string());
            }
            return match ch {
                '@' | '`' | ' ' => Some("\x00".to_string()),
                '[' => Some("\x1b".to_string()),
                '\\' => Some("\x1c".to_string()),
                ']' => Some("\x1d".to_string()),
                '^' | '~' => Some("\x1e".to_string()),
                '_' | '?' => Some("\x1f".to_string()),
                _ => None,
            };
        }

        // Alt + key = ESC + key
        if mods.contains(Modifiers::ALT) {
            return Some(format!("\x1b{}", ch));
        }

        Some(ch.to_string())
    }
}
