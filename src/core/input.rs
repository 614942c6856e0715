//! Input line buffer and key classification

/// What a raw key event means to the line editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    /// Enter
    Submit,
    /// Backspace / DEL
    Erase,
    /// Ctrl+C
    Interrupt,
    /// Ctrl+L
    ScreenClear,
    /// A printable ASCII character
    Printable(char),
    /// Anything else; ignored
    Other,
}

impl KeyClass {
    /// Classify a raw key event by its first character code.
    ///
    /// Events are single keystrokes; anything after the first character
    /// (escape sequence tails, pasted text) is not inspected.
    pub fn classify(data: &str) -> Self {
        let Some(ch) = data.chars().next() else {
            return KeyClass::Other;
        };
        match ch as u32 {
            13 => KeyClass::Submit,
            127 | 8 => KeyClass::Erase,
            3 => KeyClass::Interrupt,
            12 => KeyClass::ScreenClear,
            32..=126 => KeyClass::Printable(ch),
            _ => KeyClass::Other,
        }
    }
}

/// The command line being typed, not yet submitted.
///
/// Holds printable ASCII only (0x20..=0x7E).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputLine {
    buffer: String,
}

impl InputLine {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Append a character. Returns false (and leaves the line alone) for
    /// anything outside printable ASCII.
    pub fn push(&mut self, ch: char) -> bool {
        if !(' '..='~').contains(&ch) {
            return false;
        }
        self.buffer.push(ch);
        true
    }

    /// Drop the last character. Returns false when the line was empty.
    pub fn pop(&mut self) -> bool {
        self.buffer.pop().is_some()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Take the line for submission, leaving it empty
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }
}
