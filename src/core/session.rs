//! Terminal session
//!
//! Owns the display, the input line, the typer and the geometry adapter.
//! Construction and [`TerminalSession::dispose`] are the paired lifecycle
//! calls; everything in between is driven by `handle_input`, `request_fit`
//! and `tick` from the event loop.
//!
//! # Flow
//!
//! ```text
//! key data ─► InputLine ──(Enter)──► dispatch::execute ─► Action
//!                                                          │
//!                    display ◄── Typer ◄── format::wrap ◄──┘
//! ```
//!
//! Keys that arrive while a response is being typed are queued and
//! replayed once the trailing prompt is on screen.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::dispatch::{self, Action};
use super::format::{self, LINE_BREAK};
use super::links;
use super::input::{InputLine, KeyClass};
use super::timer::Clock;
use super::typer::{TypeProgress, Typer};
use crate::commands::CommandTable;
use crate::config::{Config, StyleTable};
use crate::ui::adapter::{DisplayAdapter, FitParams};
use crate::ui::display::{Display, Result};
use crate::ui::keymapper::EOT;

/// Keys held back while a response is typing
const MAX_PENDING_KEYS: usize = 256;

/// Session settings derived from [`Config`]
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub prompt: String,
    pub greeting: String,
    pub typing_delay: Duration,
    pub resize_debounce: Duration,
    pub initial_fit_delays: Vec<Duration>,
    pub fit: FitParams,
    pub styles: StyleTable,
    pub hyperlinks: bool,
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            prompt: config.prompt_text(),
            greeting: config.greeting.clone(),
            typing_delay: config.typing_delay(),
            resize_debounce: config.resize_debounce(),
            initial_fit_delays: config.initial_fit_delays(),
            fit: FitParams::from_config(config),
            styles: config.style_table(),
            hyperlinks: config.hyperlinks,
        }
    }
}

/// One terminal instance
pub struct TerminalSession<D: Display, C: Clock> {
    display: D,
    clock: C,
    table: CommandTable,
    options: SessionOptions,
    input: InputLine,
    typer: Typer,
    adapter: DisplayAdapter,
    pending: VecDeque<String>,
    disposed: bool,
}

impl<D: Display, C: Clock> TerminalSession<D, C> {
    /// Create a session and schedule the initial display fits
    pub fn new(display: D, clock: C, table: CommandTable, options: SessionOptions) -> Self {
        let adapter = DisplayAdapter::new(
            options.fit,
            options.resize_debounce,
            &options.initial_fit_delays,
            clock.now(),
        );
        Self {
            display,
            clock,
            table,
            options,
            input: InputLine::new(),
            typer: Typer::new(),
            adapter,
            pending: VecDeque::new(),
            disposed: false,
        }
    }

    /// Focus the display and write the banner (or just the prompt)
    pub fn start(&mut self, banner: bool) -> Result<()> {
        self.display.focus()?;
        if banner {
            let banner = self.banner();
            self.display.write(&banner)?;
        }
        self.write_prompt()
    }

    /// Feed one raw key event
    pub fn handle_input(&mut self, data: &str) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        if self.typer.is_active() {
            if self.pending.len() >= MAX_PENDING_KEYS {
                warn!("Input queue full; dropping key");
            } else {
                self.pending.push_back(data.to_string());
            }
            return Ok(());
        }
        self.process_key(data)
    }

    /// Note that the container changed size
    pub fn request_fit(&mut self) {
        if self.disposed {
            return;
        }
        let now = self.clock.now();
        self.adapter.request_fit(now);
    }

    /// Advance timers: typed output, debounced resize, initial fits
    pub fn tick(&mut self) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        let now = self.clock.now();

        if self.typer.tick(&mut self.display, now)? == TypeProgress::Finished {
            self.replay_pending()?;
        }
        if let Some(geometry) = self.adapter.tick(&mut self.display, now)? {
            debug!("Display now {}x{}", geometry.cols, geometry.rows);
        }
        Ok(())
    }

    /// Cancel every timer and tear down the display. Safe to call twice.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.typer.cancel();
        self.adapter.cancel();
        self.pending.clear();
        self.display.dispose();
        info!("Session disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    #[allow(dead_code)]
    pub fn is_typing(&self) -> bool {
        self.typer.is_active()
    }

    #[allow(dead_code)]
    pub fn input_line(&self) -> &str {
        self.input.as_str()
    }

    /// Ctrl+D on an empty line with nothing being typed ends the program
    pub fn wants_quit(&self, data: &str) -> bool {
        data == EOT && self.input.is_empty() && !self.typer.is_active()
    }

    /// Earliest moment `tick` has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.typer.next_deadline(), self.adapter.next_deadline()]
            .into_iter()
            .flatten()
            .min()
    }

    #[allow(dead_code)]
    pub fn display(&self) -> &D {
        &self.display
    }

    /// The styled prompt
    pub fn prompt(&self) -> String {
        format::style(&self.options.styles, &self.options.prompt, &["blue", "bold"])
    }

    fn process_key(&mut self, data: &str) -> Result<()> {
        match KeyClass::classify(data) {
            KeyClass::Submit => {
                self.display.write(LINE_BREAK)?;
                let line = self.input.take();
                self.execute(&line)?;
            }
            KeyClass::Erase => {
                if self.input.pop() {
                    self.display.write("\x08 \x08")?;
                }
            }
            KeyClass::Interrupt => {
                self.display.write("^C\r\n")?;
                self.input.clear();
                self.write_prompt()?;
            }
            KeyClass::ScreenClear => {
                // The prompt line goes with the screen; put it back as it was
                self.display.clear()?;
                let redraw = format!("{}{}", self.prompt(), self.echo(self.input.as_str()));
                self.display.write(&redraw)?;
            }
            KeyClass::Printable(ch) => {
                if self.input.push(ch) {
                    let echo = self.echo(&ch.to_string());
                    self.display.write(&echo)?;
                }
            }
            KeyClass::Other => {}
        }
        Ok(())
    }

    fn execute(&mut self, line: &str) -> Result<()> {
        let action = dispatch::execute(&self.table, line);
        info!("Executed command: {:?}", line);

        match action {
            Action::ClearScreen => {
                self.display.clear()?;
                self.write_prompt()
            }
            Action::Empty => self.write_prompt(),
            Action::Respond(_) | Action::Unknown(_) => {
                if let Action::Unknown(raw) = &action {
                    debug!("Unknown command: {:?}", raw);
                }
                let text = action.response_text().unwrap_or_default();
                self.type_response(&text)
            }
        }
    }

    /// Link URLs, wrap to the current width, then animate with the prompt as trailer
    fn type_response(&mut self, text: &str) -> Result<()> {
        let width = usize::from(self.display.cols());
        let text = if self.options.hyperlinks {
            links::linkify(text)
        } else {
            text.to_string()
        };
        let wrapped = format::wrap(&format!("{}{}", text, LINE_BREAK), width);
        let prompt = self.prompt();
        let now = self.clock.now();
        let progress = self.typer.start(
            &mut self.display,
            &wrapped,
            self.options.typing_delay,
            prompt,
            now,
        )?;
        if progress == TypeProgress::Finished {
            self.replay_pending()?;
        }
        Ok(())
    }

    /// Run queued keys until they run out or one starts a new response
    fn replay_pending(&mut self) -> Result<()> {
        while !self.typer.is_active() {
            let Some(data) = self.pending.pop_front() else {
                break;
            };
            self.process_key(&data)?;
        }
        Ok(())
    }

    fn write_prompt(&mut self) -> Result<()> {
        let prompt = self.prompt();
        self.display.write(&prompt)
    }

    fn echo(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        format::style(&self.options.styles, text, &["green"])
    }

    fn banner(&self) -> String {
        let styles = &self.options.styles;
        let mut banner = String::new();
        banner.push_str(&self.prompt());
        banner.push_str(&format::style(styles, "welcome", &["green"]));
        banner.push_str("\r\n\r\n");
        banner.push_str(&self.options.greeting);
        banner.push_str("\r\n\r\n\r\n");
        banner.push_str("Welcome to my interactive portfolio terminal!");
        banner.push_str("\r\n");
        banner.push_str("Type ");
        banner.push_str(&format::style(styles, "'help'", &["yellow", "bold"]));
        banner.push_str(" to see available commands.");
        banner.push_str("\r\n\r\n\r\n");
        banner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timer::ManualClock;
    use crate::ui::adapter::Geometry;
    use crate::ui::display::{CellMetrics, PixelSize, RecordingDisplay};

    const PROMPT: &str = "\x1b[34m\x1b[1mSobhi@portfolio:~$ \x1b[0m";

    fn options() -> SessionOptions {
        SessionOptions::from_config(&Config::default())
    }

    fn session_with(
        table: CommandTable,
        options: SessionOptions,
    ) -> (TerminalSession<RecordingDisplay, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let display = RecordingDisplay::new(80, 24);
        let session = TerminalSession::new(display, clock.clone(), table, options);
        (session, clock)
    }

    fn session() -> (TerminalSession<RecordingDisplay, ManualClock>, ManualClock) {
        let table = CommandTable::from_pairs([("help", "commands: help, about")]).unwrap();
        session_with(table, options())
    }

    fn type_line(session: &mut TerminalSession<RecordingDisplay, ManualClock>, line: &str) {
        for ch in line.chars() {
            session.handle_input(&ch.to_string()).unwrap();
        }
        session.handle_input("\r").unwrap();
    }

    /// Tick until the typer goes idle
    fn finish_typing(session: &mut TerminalSession<RecordingDisplay, ManualClock>, clock: &ManualClock) {
        for _ in 0..10_000 {
            if !session.is_typing() {
                return;
            }
            clock.advance_ms(30);
            session.tick().unwrap();
        }
        panic!("typing never finished");
    }

    #[test]
    fn test_start_writes_banner_and_prompt() {
        let (mut session, _) = session();
        session.start(true).unwrap();

        let out = session.display().output();
        assert!(out.starts_with(PROMPT));
        assert!(out.contains("\x1b[32mwelcome\x1b[0m"));
        assert!(out.contains("Mohammed Sobhi"));
        assert!(out.contains("\x1b[33m\x1b[1m'help'\x1b[0m"));
        assert!(out.ends_with(&format!("\r\n\r\n\r\n{}", PROMPT)));
        assert!(session.display().is_focused());
    }

    #[test]
    fn test_start_without_banner() {
        let (mut session, _) = session();
        session.start(false).unwrap();
        assert_eq!(session.display().output(), PROMPT);
    }

    #[test]
    fn test_known_command_is_typed_then_prompt() {
        let (mut session, clock) = session();
        type_line(&mut session, "  Help  ");

        assert!(session.is_typing());
        assert_eq!(session.input_line(), "");
        finish_typing(&mut session, &clock);

        let out = session.display().output();
        let expected = format!("\r\ncommands: help, about\r\n{}", PROMPT);
        assert!(out.ends_with(&expected), "{:?}", out);
    }

    #[test]
    fn test_unknown_command_message() {
        let (mut session, clock) = session();
        type_line(&mut session, "xyz");
        finish_typing(&mut session, &clock);

        let out = session.display().output();
        assert!(out.contains(
            "Command not found: 'xyz'. Type 'help' for available commands.\r\n"
        ));
        assert!(out.ends_with(PROMPT));
    }

    #[test]
    fn test_clear_command() {
        let (mut session, _) = session();
        session.start(true).unwrap();
        type_line(&mut session, " CLEAR ");

        assert_eq!(session.display().clears(), 1);
        assert_eq!(session.display().output(), PROMPT);
        assert!(!session.is_typing());
    }

    #[test]
    fn test_empty_line_writes_prompt() {
        let (mut session, _) = session();
        type_line(&mut session, "   ");
        assert_eq!(
            session.display().output(),
            format!("{0}{0}{0}\r\n{1}", "\x1b[32m \x1b[0m", PROMPT)
        );
        assert!(!session.is_typing());
    }

    #[test]
    fn test_printable_echo_is_green() {
        let (mut session, _) = session();
        session.handle_input("h").unwrap();
        assert_eq!(session.input_line(), "h");
        assert_eq!(session.display().output(), "\x1b[32mh\x1b[0m");
    }

    #[test]
    fn test_backspace() {
        let (mut session, _) = session();
        session.handle_input("a").unwrap();
        session.handle_input("b").unwrap();
        session.handle_input("\x7f").unwrap();
        assert_eq!(session.input_line(), "a");
        assert!(session.display().output().ends_with("\x08 \x08"));
    }

    #[test]
    fn test_backspace_on_empty_is_noop() {
        let (mut session, _) = session();
        session.handle_input("\x7f").unwrap();
        session.handle_input("\x08").unwrap();
        assert_eq!(session.input_line(), "");
        assert_eq!(session.display().writes(), 0);
    }

    #[test]
    fn test_interrupt_clears_line() {
        let (mut session, _) = session();
        session.handle_input("a").unwrap();
        session.handle_input("\x03").unwrap();
        assert_eq!(session.input_line(), "");
        assert!(session
            .display()
            .output()
            .ends_with(&format!("^C\r\n{}", PROMPT)));
    }

    #[test]
    fn test_screen_clear_keeps_line() {
        let (mut session, _) = session();
        session.handle_input("h").unwrap();
        session.handle_input("e").unwrap();
        session.handle_input("\x0c").unwrap();

        assert_eq!(session.input_line(), "he");
        assert_eq!(session.display().clears(), 1);
        assert_eq!(
            session.display().output(),
            format!("{}\x1b[32mhe\x1b[0m", PROMPT)
        );
    }

    #[test]
    fn test_other_keys_ignored() {
        let (mut session, _) = session();
        for data in ["\t", "\x1b", "\x1b[A", "\x04", "é"] {
            session.handle_input(data).unwrap();
        }
        assert_eq!(session.input_line(), "");
        assert_eq!(session.display().writes(), 0);
    }

    #[test]
    fn test_keys_queued_while_typing() {
        let (mut session, clock) = session();
        type_line(&mut session, "help");
        assert!(session.is_typing());

        // Typed during the animation: nothing is echoed yet
        let writes = session.display().writes();
        type_line(&mut session, "xyz");
        assert_eq!(session.display().writes(), writes);
        assert_eq!(session.input_line(), "");

        // First response completes, then the queued line runs
        finish_typing(&mut session, &clock);
        let out = session.display().output();
        let first = out.find("commands: help, about").unwrap();
        let second = out.find("Command not found: 'xyz'").unwrap();
        assert!(first < second);
        assert!(out.ends_with(PROMPT));
        assert!(!session.is_typing());
    }

    #[test]
    fn test_queue_holds_at_most_max_pending_keys() {
        let (mut session, clock) = session();
        type_line(&mut session, "help");
        assert!(session.is_typing());

        for _ in 0..MAX_PENDING_KEYS + 44 {
            session.handle_input("a").unwrap();
        }
        assert_eq!(session.pending.len(), MAX_PENDING_KEYS);

        finish_typing(&mut session, &clock);
        assert_eq!(session.input_line(), "a".repeat(MAX_PENDING_KEYS));
        assert!(session.pending.is_empty());
    }

    #[test]
    fn test_wants_quit_only_on_idle_empty_line() {
        let (mut session, clock) = session();
        assert!(session.wants_quit(EOT));
        assert!(!session.wants_quit("q"));

        session.handle_input("h").unwrap();
        assert!(!session.wants_quit(EOT));
        session.handle_input("\x03").unwrap();
        assert!(session.wants_quit(EOT));

        type_line(&mut session, "help");
        assert!(!session.wants_quit(EOT));
        finish_typing(&mut session, &clock);
        assert!(session.wants_quit(EOT));
    }

    #[test]
    fn test_urls_in_responses_are_links() {
        let url = "https://github.com/MohammedSobhiT";
        let table = CommandTable::from_pairs([("contact", format!("GitHub - {}", url))]).unwrap();
        let (mut session, clock) = session_with(table, options());
        type_line(&mut session, "contact");
        finish_typing(&mut session, &clock);

        let linked = format!("GitHub - \x1b]8;;{0}\x1b\\{0}\x1b]8;;\x1b\\\r\n", url);
        assert!(session.display().output().contains(&linked));
    }

    #[test]
    fn test_links_disabled() {
        let url = "https://github.com/MohammedSobhiT";
        let mut options = options();
        options.hyperlinks = false;
        let table = CommandTable::from_pairs([("contact", url)]).unwrap();
        let (mut session, clock) = session_with(table, options);
        type_line(&mut session, "contact");
        finish_typing(&mut session, &clock);

        let out = session.display().output();
        assert!(out.contains(&format!("{}\r\n", url)));
        assert!(!out.contains("\x1b]8;"));
    }

    #[test]
    fn test_linked_url_wraps_by_visible_width() {
        let table = CommandTable::from_pairs([(
            "projects",
            "Find more of my work at https://github.com/MohammedSobhiT today",
        )])
        .unwrap();
        let (mut session, clock) = session_with(table, options());
        session.display.resize(40, 10).unwrap();
        type_line(&mut session, "projects");
        finish_typing(&mut session, &clock);

        let out = session.display().output();
        assert!(out.contains(
            "Find more of my work at\r\n\x1b]8;;https://github.com/MohammedSobhiT\x1b\\https://github.com/MohammedSobhiT\x1b]8;;\x1b\\ today\r\n"
        ), "{:?}", out);
    }

    #[test]
    fn test_response_wrapped_to_display_width() {
        let long = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu nu";
        let table = CommandTable::from_pairs([("about", long)]).unwrap();
        let (mut session, clock) = session_with(table, options());
        session.display.resize(40, 10).unwrap();

        type_line(&mut session, "about");
        finish_typing(&mut session, &clock);

        let out = session.display().output();
        assert!(out.contains("alpha beta gamma delta epsilon zeta eta\r\ntheta iota kappa lambda mu nu\r\n"));
    }

    #[test]
    fn test_dispose_cancels_typing() {
        let (mut session, clock) = session();
        type_line(&mut session, "help");
        clock.advance_ms(60);
        session.tick().unwrap();
        let writes = session.display().writes();

        session.dispose();
        assert!(session.is_disposed());
        assert!(session.display().is_disposed());
        assert_eq!(session.next_deadline(), None);

        for _ in 0..100 {
            clock.advance_ms(30);
            session.tick().unwrap();
        }
        session.handle_input("a").unwrap();
        assert_eq!(session.display().writes(), writes);

        // Idempotent
        session.dispose();
    }

    #[test]
    fn test_initial_fit_and_resize() {
        let mut options = options();
        options.initial_fit_delays = vec![Duration::from_millis(50)];
        let table = CommandTable::default();
        let (mut session, clock) = session_with(table, options);
        session.display.container = Some(PixelSize { width: 824, height: 624 });
        session.display.metrics = Some(CellMetrics { width: 8, height: 16 });

        clock.advance_ms(50);
        session.tick().unwrap();
        assert_eq!(
            Geometry {
                cols: session.display().cols(),
                rows: session.display().rows()
            },
            Geometry { cols: 100, rows: 37 }
        );

        session.display.container = Some(PixelSize { width: 424, height: 324 });
        session.request_fit();
        clock.advance_ms(100);
        session.tick().unwrap();
        assert_eq!(session.display().cols(), 100);

        clock.advance_ms(50);
        session.tick().unwrap();
        assert_eq!(session.display().cols(), 50);
        assert_eq!(session.display().rows(), 18);
    }
}
