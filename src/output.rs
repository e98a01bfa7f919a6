//! Human-facing diagnostics on stderr.
//!
//! Workflow annotations for the runner live in [`crate::actions`]; this module
//! is for people reading the raw step log or running the launcher locally.
//! Every line carries the `[invoke-binary]` prefix so it can be told apart
//! from the child's own output on the shared stream.

use console::{Color, Term, style};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

/// Prefix on every diagnostic line.
const PREFIX: &str = "[invoke-binary]";

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Kind of diagnostic, which decides the label colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Something the launcher is about to do.
    Action,
    /// The child ended in an unusual way.
    Note,
    /// The launcher itself failed.
    Fail,
}

impl Level {
    fn color(self) -> Color {
        match self {
            Level::Action => Color::Cyan,
            Level::Note => Color::Yellow,
            Level::Fail => Color::Red,
        }
    }
}

fn stderr_is_tty() -> bool {
    Term::stderr().is_term()
}

/// Writes `[invoke-binary] <label> <msg>`, colouring the label on a TTY.
pub fn line_to(w: &mut dyn Write, level: Level, label: &str, msg: &str, is_tty: bool) {
    let label = if is_tty {
        style(label).bold().fg(level.color()).to_string()
    } else {
        label.to_string()
    };
    let _ = if msg.is_empty() {
        writeln!(w, "{PREFIX} {label}")
    } else {
        writeln!(w, "{PREFIX} {label} {msg}")
    };
}

/// Writes an indented `[invoke-binary]   <msg>` line, dimmed on a TTY.
pub fn detail_to(w: &mut dyn Write, msg: &str, is_tty: bool) {
    let body = format!("  {msg}");
    let body = if is_tty {
        style(body).dim().to_string()
    } else {
        body
    };
    let _ = writeln!(w, "{PREFIX} {body}");
}

pub fn action(label: &str, msg: &str) {
    line_to(&mut io::stderr(), Level::Action, label, msg, stderr_is_tty());
}

pub fn fail(label: &str, msg: &str) {
    line_to(&mut io::stderr(), Level::Fail, label, msg, stderr_is_tty());
}

pub fn note(msg: &str) {
    line_to(&mut io::stderr(), Level::Note, "Note", msg, stderr_is_tty());
}

pub fn detail(msg: &str) {
    detail_to(&mut io::stderr(), msg, stderr_is_tty());
}

/// Prints a detail line only in verbose mode.
pub fn verbose_detail(msg: &str) {
    if is_verbose() {
        detail(msg);
    }
}

pub fn set_verbose(enabled: bool) {
    VERBOSE.store(enabled, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}
