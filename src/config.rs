//! Configuration and style table management for portfolio-term.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.portfolio-term/config.toml`
//! - The style table mapping named tokens to escape codes
//!
//! # Configuration File
//!
//! ```toml
//! user = "Sobhi"
//! host = "portfolio"
//! typing_delay_ms = 30
//! resize_debounce_ms = 150
//! initial_fit_delays_ms = [50, 150, 400]
//! commands_file = "~/my-commands.toml"
//!
//! [padding]
//! horizontal = 12
//! vertical = 12
//!
//! [fallback_cell]
//! width = 9
//! height = 17
//!
//! [styles]
//! blue = "\u001b[38;2;59;130;246m"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prompt user name
    pub user: String,
    /// Prompt host name
    pub host: String,
    /// First line of the welcome banner
    pub greeting: String,
    /// Delay between revealed characters
    pub typing_delay_ms: u64,
    /// Quiet period before a resize is applied
    pub resize_debounce_ms: u64,
    /// Offsets (from start) of the initial fit attempts
    pub initial_fit_delays_ms: Vec<u64>,
    /// Container padding in pixels
    pub padding: PaddingConfig,
    /// Cell size used when the host reports no pixel metrics
    pub fallback_cell: CellConfig,
    pub min_cols: u16,
    pub min_rows: u16,
    /// Replacement command table
    pub commands_file: Option<PathBuf>,
    pub cursor_blink: bool,
    /// Make URLs in responses clickable (OSC 8)
    pub hyperlinks: bool,
    /// Style token overrides
    pub styles: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user: "Sobhi".to_string(),
            host: "portfolio".to_string(),
            greeting: "Hi, I'm Mohammed Sobhi, a Software Engineer From Egypt.".to_string(),
            typing_delay_ms: 30,
            resize_debounce_ms: 150,
            initial_fit_delays_ms: vec![50, 150, 400],
            padding: PaddingConfig::default(),
            fallback_cell: CellConfig::default(),
            min_cols: 40,
            min_rows: 10,
            commands_file: None,
            cursor_blink: true,
            hyperlinks: true,
            styles: BTreeMap::new(),
        }
    }
}

/// Padding around the text grid
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PaddingConfig {
    pub horizontal: u32,
    pub vertical: u32,
}

impl Default for PaddingConfig {
    fn default() -> Self {
        Self {
            horizontal: 12,
            vertical: 12,
        }
    }
}

/// Character cell size in pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CellConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            width: 9,
            height: 17,
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::get_config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Directory holding config and log files
    pub fn config_dir() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".portfolio-term"))
    }

    fn get_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn typing_delay(&self) -> Duration {
        Duration::from_millis(self.typing_delay_ms)
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn initial_fit_delays(&self) -> Vec<Duration> {
        self.initial_fit_delays_ms
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect()
    }

    /// Build the style table with overrides applied
    pub fn style_table(&self) -> StyleTable {
        let mut table = StyleTable::default();
        for (name, code) in &self.styles {
            table.set(name, unescape(code));
        }
        table
    }

    /// Prompt text without styling, e.g. `Sobhi@portfolio:~$ `
    pub fn prompt_text(&self) -> String {
        format!("{}@{}:~$ ", self.user, self.host)
    }
}

/// Named style tokens mapped to the escape codes the display understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleTable {
    codes: BTreeMap<String, String>,
}

impl Default for StyleTable {
    fn default() -> Self {
        let builtin = [
            ("reset", "\x1b[0m"),
            ("bold", "\x1b[1m"),
            ("dim", "\x1b[2m"),
            ("italic", "\x1b[3m"),
            ("underline", "\x1b[4m"),
            ("black", "\x1b[30m"),
            ("red", "\x1b[31m"),
            ("green", "\x1b[32m"),
            ("yellow", "\x1b[33m"),
            ("blue", "\x1b[34m"),
            ("magenta", "\x1b[35m"),
            ("cyan", "\x1b[36m"),
            ("white", "\x1b[37m"),
        ];
        Self {
            codes: builtin
                .iter()
                .map(|(name, code)| (name.to_string(), code.to_string()))
                .collect(),
        }
    }
}

impl StyleTable {
    /// Escape code for a token; unknown tokens style nothing
    pub fn code(&self, name: &str) -> &str {
        match self.codes.get(name) {
            Some(code) => code,
            None => {
                debug!("Unknown style token: {}", name);
                ""
            }
        }
    }

    pub fn reset(&self) -> &str {
        self.code("reset")
    }

    /// Add or replace a token. `reset` may be replaced but never removed.
    pub fn set(&mut self, name: &str, code: String) {
        self.codes.insert(name.to_lowercase(), code);
    }
}

/// Accept `\e` and `\x1b` spellings in config files
fn unescape(code: &str) -> String {
    code.replace("\\x1b", "\x1b").replace("\\e", "\x1b")
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.prompt_text(), "Sobhi@portfolio:~$ ");
        assert_eq!(config.typing_delay(), Duration::from_millis(30));
        assert_eq!(config.resize_debounce(), Duration::from_millis(150));
        assert_eq!(config.min_cols, 40);
        assert_eq!(config.min_rows, 10);
        assert!(config.hyperlinks);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
            user = "guest"
            typing_delay_ms = 5

            [fallback_cell]
            width = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.user, "guest");
        assert_eq!(config.host, "portfolio");
        assert_eq!(config.typing_delay_ms, 5);
        assert_eq!(config.fallback_cell.width, 8);
        assert_eq!(config.fallback_cell.height, 17);
    }

    #[test]
    fn test_invalid_file_is_error() {
        assert!(Config::parse("typing_delay_ms = \"fast\"").is_err());
    }

    #[test]
    fn test_style_overrides() {
        let config = Config::parse(
            r#"
            [styles]
            blue = "\\x1b[38;2;59;130;246m"
            orange = "\\e[38;5;208m"
            "#,
        )
        .unwrap();
        let styles = config.style_table();
        assert_eq!(styles.code("blue"), "\x1b[38;2;59;130;246m");
        assert_eq!(styles.code("orange"), "\x1b[38;5;208m");
        assert_eq!(styles.code("green"), "\x1b[32m");
        assert_eq!(styles.reset(), "\x1b[0m");
    }

    #[test]
    fn test_unknown_style_is_empty() {
        let styles = StyleTable::default();
        assert_eq!(styles.code("sparkle"), "");
    }
}
