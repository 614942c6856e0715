//! Command dispatch
//!
//! Maps a submitted line to the action the session should perform. Every
//! input has an outcome; an unrecognized command is not an error.

use crate::commands::{normalize, CommandTable, CLEAR_COMMAND};

/// Outcome of executing one submitted line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `clear`: wipe the display and show a fresh prompt
    ClearScreen,
    /// Blank line: fresh prompt only
    Empty,
    /// Known command: type its response
    Respond(String),
    /// Anything else; holds the line exactly as typed
    Unknown(String),
}

impl Action {
    /// Text to type for this action, if any (without the trailing break)
    pub fn response_text(&self) -> Option<String> {
        match self {
            Action::Respond(text) => Some(text.clone()),
            Action::Unknown(raw) => Some(unknown_message(raw)),
            Action::ClearScreen | Action::Empty => None,
        }
    }
}

/// Interpret a submitted line against the command table
pub fn execute(table: &CommandTable, raw: &str) -> Action {
    let name = normalize(raw);

    if name == CLEAR_COMMAND {
        return Action::ClearScreen;
    }
    if name.is_empty() {
        return Action::Empty;
    }
    match table.lookup(&name) {
        Some(response) => Action::Respond(response.to_string()),
        None => Action::Unknown(raw.to_string()),
    }
}

/// Message shown for a line that matches no command
pub fn unknown_message(raw: &str) -> String {
    format!(
        "Command not found: '{}'. Type 'help' for available commands.",
        raw
    )
}
