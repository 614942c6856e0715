//! Command table
//!
//! Immutable mapping from command name to response text, loaded once at
//! startup from `data/commands.toml` (embedded) or a user-supplied file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Default table shipped with the binary
const BUILTIN_COMMANDS: &str = include_str!("../data/commands.toml");

/// Name handled by the dispatcher itself
pub const CLEAR_COMMAND: &str = "clear";

#[derive(Error, Debug)]
pub enum CommandTableError {
    #[error("Failed to read command file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid command file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Command name is empty after trimming")]
    EmptyName,

    #[error("Command '{0}' is defined more than once")]
    Duplicate(String),

    #[error("'{0}' is a built-in command and cannot be redefined")]
    Reserved(String),
}

pub type Result<T> = std::result::Result<T, CommandTableError>;

#[derive(Deserialize)]
struct CommandFile {
    commands: BTreeMap<String, String>,
}

/// Normalize a command name for lookup: trim surrounding whitespace, lowercase
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Static command name to response text mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTable {
    entries: BTreeMap<String, String>,
}

impl CommandTable {
    /// The table embedded in the binary
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_COMMANDS)
    }

    /// Load a table from a TOML file with a `[commands]` section
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| CommandTableError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let file: CommandFile = toml::from_str(content)?;
        Self::from_pairs(file.commands)
    }

    /// Build a table, normalizing keys and rejecting collisions
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut entries = BTreeMap::new();
        for (name, response) in pairs {
            let key = normalize(name.as_ref());
            if key.is_empty() {
                return Err(CommandTableError::EmptyName);
            }
            if key == CLEAR_COMMAND {
                return Err(CommandTableError::Reserved(key));
            }
            if entries.contains_key(&key) {
                return Err(CommandTableError::Duplicate(key));
            }
            entries.insert(key, response.into());
        }
        Ok(Self { entries })
    }

    /// Exact match on the normalized name; no prefixes, no aliases
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.entries.get(&normalize(name)).map(String::as_str)
    }

    #[allow(dead_code)]
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Command names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
