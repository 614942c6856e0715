//! Typed response animation
//!
//! Reveals text on the display one unit at a time. The animation is a
//! cooperative task: the event loop calls [`Typer::tick`] and the typer
//! writes whatever has come due since the last call. Cancelling drops the
//! session, so nothing is written afterwards.

use std::time::{Duration, Instant};

use tracing::trace;

use super::format;
use super::timer::Timer;
use crate::ui::display::{Display, Result};

/// In-flight reveal of one response
#[derive(Debug)]
struct TypingSession {
    /// Text split into reveal steps
    units: Vec<String>,
    /// Next unit to write
    index: usize,
    delay: Duration,
    timer: Timer,
    /// Written once every unit has been revealed
    trailer: String,
}

impl TypingSession {
    fn new(text: &str, delay: Duration, trailer: String) -> Self {
        Self {
            units: split_units(text),
            index: 0,
            delay,
            timer: Timer::new(),
            trailer,
        }
    }
}

/// Result of advancing the animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeProgress {
    /// Nothing is being typed
    Idle,
    /// Still revealing
    Typing,
    /// The trailer was just written; the typer is idle again
    Finished,
}

/// Drives at most one typing session at a time
#[derive(Debug, Default)]
pub struct Typer {
    session: Option<TypingSession>,
}

impl Typer {
    pub fn new() -> Self {
        Self { session: None }
    }

    /// Begin revealing `text`, followed by `trailer` (usually the prompt).
    ///
    /// The first unit is written immediately, each later one `delay` after
    /// the previous. The trailer follows `delay` after the last unit. Any
    /// session already running is replaced.
    pub fn start<D: Display + ?Sized>(
        &mut self,
        display: &mut D,
        text: &str,
        delay: Duration,
        trailer: String,
        now: Instant,
    ) -> Result<TypeProgress> {
        if self.session.is_some() {
            trace!("Replacing active typing session");
        }
        let mut session = TypingSession::new(text, delay, trailer);
        // Due right away, so the first unit goes out synchronously
        session.timer.schedule(now, Duration::ZERO);
        self.session = Some(session);
        self.tick(display, now)
    }

    /// Write every unit that has come due by `now`
    pub fn tick<D: Display + ?Sized>(&mut self, display: &mut D, now: Instant) -> Result<TypeProgress> {
        let Some(session) = self.session.as_mut() else {
            return Ok(TypeProgress::Idle);
        };

        let mut finished = false;
        while let Some(due) = session.timer.deadline() {
            if !session.timer.fire(now) {
                break;
            }
            if let Some(unit) = session.units.get(session.index) {
                display.write(unit)?;
                session.index += 1;
                // Pace from the deadline so a late tick catches up
                session.timer.schedule(due, session.delay);
            } else {
                display.write(&session.trailer)?;
                finished = true;
                break;
            }
        }

        if finished {
            self.session = None;
            Ok(TypeProgress::Finished)
        } else {
            Ok(TypeProgress::Typing)
        }
    }

    /// Stop the animation; pending units are discarded
    pub fn cancel(&mut self) {
        if let Some(session) = self.session.take() {
            trace!(
                "Cancelled typing at {}/{}",
                session.index,
                session.units.len()
            );
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// When the next unit is due
    pub fn next_deadline(&self) -> Option<Instant> {
        self.session.as_ref().and_then(|s| s.timer.deadline())
    }
}

/// Reveal steps: a `\r\n` pair or a whole escape sequence counts as one
fn split_units(text: &str) -> Vec<String> {
    let mut units: Vec<String> = Vec::with_capacity(text.len());
    for seg in format::segments(text) {
        match units.last_mut() {
            Some(last) if seg == "\n" && last.as_str() == "\r" => last.push('\n'),
            _ => units.push(seg.to_string()),
        }
    }
    units
}
