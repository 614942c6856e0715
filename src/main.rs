//! portfolio-term - An interactive portfolio terminal
//!
//! A faux shell that answers a fixed set of commands with typed-out
//! responses, in the style of a personal portfolio page.
//!
//! # Quick Start
//!
//! ```text
//! portfolio-term                     # Built-in portfolio commands
//! portfolio-term -c commands.toml    # Custom command table
//! portfolio-term -d 5                # Faster typing
//! ```
//!
//! # Keys
//!
//! | Key | Action |
//! |-----|--------|
//! | Enter | Run the command line |
//! | Backspace | Erase last character |
//! | Ctrl+C | Discard the line |
//! | Ctrl+L | Clear the screen |
//! | Ctrl+D | Quit (on an empty line) |

mod commands;
mod config;
mod core;
mod ui;

use std::env;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::commands::CommandTable;
use crate::config::Config;
use crate::core::session::{SessionOptions, TerminalSession};
use crate::core::timer::SystemClock;
use crate::ui::{CrosstermDisplay, InputEvent};

/// Longest wait for input before timers are serviced
const POLL_TIMEOUT: Duration = Duration::from_millis(10);

/// Environment variable holding the log filter
const LOG_ENV: &str = "PORTFOLIO_TERM_LOG";

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command line options
#[derive(Debug, Default)]
struct Args {
    /// Command table replacing the built-in one
    commands_file: Option<PathBuf>,
    /// Typing delay override
    typing_delay_ms: Option<u64>,
    /// Skip the welcome banner
    no_banner: bool,
}

fn print_version() {
    eprintln!("portfolio-term {}", VERSION);
}

fn print_help() {
    eprintln!("portfolio-term {} - An interactive portfolio terminal", VERSION);
    eprintln!();
    eprintln!("Usage: portfolio-term [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --commands <FILE>  Command table (TOML with a [commands] section)");
    eprintln!("  -d, --delay <MS>       Delay between typed characters");
    eprintln!("      --no-banner        Start at a bare prompt");
    eprintln!("  -v, --version          Show version");
    eprintln!("  -h, --help             Show this help");
    eprintln!();
    eprintln!("Keys:");
    eprintln!("  Enter                  Run the command line");
    eprintln!("  Backspace              Erase last character");
    eprintln!("  Ctrl+C                 Discard the line");
    eprintln!("  Ctrl+L                 Clear the screen");
    eprintln!("  Ctrl+D                 Quit (on an empty line)");
    eprintln!();
    eprintln!("Configuration: ~/.portfolio-term/config.toml");
    eprintln!("Log file:      ~/.portfolio-term/portfolio-term.log ({} sets the filter)", LOG_ENV);
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-c" | "--commands" => {
                i += 1;
                let path = args.get(i).ok_or("Missing command file argument")?;
                parsed.commands_file = Some(PathBuf::from(path));
            }
            "-d" | "--delay" => {
                i += 1;
                let value = args.get(i).ok_or("Missing delay argument")?;
                let ms = value
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid delay: {}", value))?;
                parsed.typing_delay_ms = Some(ms);
            }
            "--no-banner" => {
                parsed.no_banner = true;
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(parsed)
}

/// Log to a file; stdout belongs to the display
fn init_logging() {
    let log_path = Config::config_dir()
        .map(|dir| dir.join("portfolio-term.log"))
        .unwrap_or_else(|| PathBuf::from("portfolio-term.log"));

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn load_command_table(args: &Args, config: &Config) -> anyhow::Result<CommandTable> {
    let path = args.commands_file.as_ref().or(config.commands_file.as_ref());
    let table = match path {
        Some(path) => CommandTable::load(path)
            .with_context(|| format!("Loading commands from {}", path.display()))?,
        None => CommandTable::builtin().context("Built-in command table is invalid")?,
    };
    info!(
        "Loaded {} commands: {}",
        table.len(),
        table.names().collect::<Vec<_>>().join(", ")
    );
    Ok(table)
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging();
    info!("portfolio-term {} starting...", VERSION);

    let mut config = Config::load();
    if let Some(ms) = args.typing_delay_ms {
        config.typing_delay_ms = ms;
    }

    // Fail before the screen is taken over
    let table = load_command_table(&args, &config)?;

    run_terminal(&config, table, !args.no_banner)
}

fn run_terminal(config: &Config, table: CommandTable, banner: bool) -> anyhow::Result<()> {
    let title = format!("{}@{}:~", config.user, config.host);
    let display = CrosstermDisplay::open(config.fallback_cell, config.cursor_blink, &title)?;
    let options = SessionOptions::from_config(config);
    let mut session = TerminalSession::new(display, SystemClock, table, options);

    let result = session
        .start(banner)
        .map_err(anyhow::Error::from)
        .and_then(|()| run_event_loop(&mut session));

    // Cancels timers and restores the host terminal
    session.dispose();

    if let Err(e) = &result {
        error!("Terminal stopped: {:#}", e);
    }
    info!("portfolio-term exiting");
    result
}

/// Main event loop: poll input, then service due timers
fn run_event_loop(session: &mut TerminalSession<CrosstermDisplay, SystemClock>) -> anyhow::Result<()> {
    loop {
        if session.is_disposed() {
            break;
        }

        let timeout = session
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .map_or(POLL_TIMEOUT, |until| until.min(POLL_TIMEOUT));

        match CrosstermDisplay::poll_input(timeout)? {
            Some(InputEvent::Key(data)) => {
                if session.wants_quit(&data) {
                    info!("Quit requested");
                    break;
                }
                session.handle_input(&data)?;
            }
            Some(InputEvent::Resize) => session.request_fit(),
            None => {}
        }

        session.tick()?;
    }
    Ok(())
}
