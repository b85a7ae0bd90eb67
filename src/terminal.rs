//! Terminal capability probe: live geometry plus capability sequences.
//!
//! Geometry is re-queried on every call so a resize between renders is
//! always observed. Capability sequences are resolved once, from the
//! terminfo entry for `$TERM`.

use std::cell::Cell;
use std::env;
use std::io;

use crossterm::terminal::size as terminal_size;
use crossterm::tty::IsTty;
use terminfo::{capability as cap, Database};

use crate::error::ProgressError;

/// Current size of the controlling terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub rows: u16,
    pub cols: u16,
}

/// Which color pair to select for the filled part of the bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorRole {
    /// Regular progress.
    Normal,
    /// Waiting on user input.
    Blocked,
    /// Back to the terminal's default pair.
    Reset,
}

/// What the scroll area needs to know about the terminal it draws on.
pub trait Terminal {
    fn rows(&self) -> Result<u16, ProgressError>;
    fn cols(&self) -> Result<u16, ProgressError>;
    /// Sequence that clears the line the cursor is on.
    fn clear_line_sequence(&self) -> &[u8];
    fn color_sequence(&self, role: ColorRole) -> &[u8];

    fn geometry(&self) -> Result<Geometry, ProgressError> {
        Ok(Geometry {
            rows: self.rows()?,
            cols: self.cols()?,
        })
    }
}

impl<T: Terminal + ?Sized> Terminal for &T {
    fn rows(&self) -> Result<u16, ProgressError> {
        (**self).rows()
    }

    fn cols(&self) -> Result<u16, ProgressError> {
        (**self).cols()
    }

    fn clear_line_sequence(&self) -> &[u8] {
        (**self).clear_line_sequence()
    }

    fn color_sequence(&self, role: ColorRole) -> &[u8] {
        (**self).color_sequence(role)
    }
}

/// Terminal backed by crossterm geometry and the terminfo database.
#[derive(Debug, Clone)]
pub struct TermInfoTerminal {
    clear_line: Vec<u8>,
    normal: Vec<u8>,
    blocked: Vec<u8>,
    reset: Vec<u8>,
}

impl TermInfoTerminal {
    /// Resolve capabilities for `$TERM` on the process's stdout.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::TerminalUnavailable`] when stdout is not a
    /// terminal, the terminal type is unknown, or it cannot clear a line.
    pub fn from_env() -> Result<Self, ProgressError> {
        if !io::stdout().is_tty() {
            return Err(ProgressError::unavailable("stdout is not a terminal"));
        }
        let database = Database::from_env().map_err(|err| {
            ProgressError::unavailable(format!("terminal type not in terminfo database: {err}"))
        })?;
        let terminal = Self::from_database(&database)?;
        let geometry = terminal.geometry()?;
        tracing::debug!(
            rows = geometry.rows,
            cols = geometry.cols,
            colors = !terminal.normal.is_empty(),
            "terminal capabilities resolved"
        );
        Ok(terminal)
    }

    /// Pull the needed capabilities out of an already loaded database.
    pub fn from_database(database: &Database) -> Result<Self, ProgressError> {
        let clear_line = database
            .get::<cap::ClrEol>()
            .and_then(|el| collect_expansion(|out| el.expand().to(out)))
            .filter(|el| !el.is_empty())
            .ok_or_else(|| ProgressError::unavailable("terminal cannot clear to end of line"))?;

        let fg_black = database
            .get::<cap::SetAForeground>()
            .and_then(|setaf| collect_expansion(|out| setaf.expand().color(0).to(out)));
        let bg_green = database
            .get::<cap::SetABackground>()
            .and_then(|setab| collect_expansion(|out| setab.expand().color(2).to(out)));
        let bg_yellow = database
            .get::<cap::SetABackground>()
            .and_then(|setab| collect_expansion(|out| setab.expand().color(3).to(out)));
        let reset = database
            .get::<cap::OrigPair>()
            .and_then(|op| collect_expansion(|out| op.expand().to(out)));

        let (normal, blocked, reset) = match (fg_black, bg_green, bg_yellow, reset) {
            (Some(fg), Some(bg), Some(bg_blocked), Some(reset)) => {
                ([fg.as_slice(), &bg].concat(), [fg, bg_blocked].concat(), reset)
            }
            _ => {
                tracing::debug!("terminal has no color pair capabilities; bar is monochrome");
                (Vec::new(), Vec::new(), Vec::new())
            }
        };

        Ok(Self {
            clear_line,
            normal,
            blocked,
            reset,
        })
    }
}

fn collect_expansion<E>(expand: impl FnOnce(&mut Vec<u8>) -> Result<(), E>) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    expand(&mut out).ok().map(|()| strip_padding(&out))
}

/// Drop `$<N>` delay markers; `tputs` consumes them as padding, never as output.
fn strip_padding(expanded: &[u8]) -> Vec<u8> {
    let mut stripped = Vec::with_capacity(expanded.len());
    let mut rest = expanded;
    while let Some(start) = rest.windows(2).position(|pair| pair == b"$<") {
        let Some(len) = rest[start..].iter().position(|byte| *byte == b'>') else {
            break;
        };
        stripped.extend_from_slice(&rest[..start]);
        rest = &rest[start + len + 1..];
    }
    stripped.extend_from_slice(rest);
    stripped
}

fn parse_env_dimension(key: &str) -> Option<u16> {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
        .filter(|value| *value > 0)
}

fn normalize_dimension(observed: u16, env_fallback: Option<u16>) -> Option<u16> {
    if observed > 0 {
        Some(observed)
    } else {
        env_fallback
    }
}

fn probe_dimension(
    pick: impl FnOnce((u16, u16)) -> u16,
    env_key: &str,
) -> Result<u16, ProgressError> {
    let observed = terminal_size()
        .map_err(|err| ProgressError::unavailable(format!("terminal size query failed: {err}")))?;
    normalize_dimension(pick(observed), parse_env_dimension(env_key))
        .ok_or_else(|| ProgressError::unavailable("terminal reports zero size"))
}

impl Terminal for TermInfoTerminal {
    fn rows(&self) -> Result<u16, ProgressError> {
        probe_dimension(|(_, rows)| rows, "LINES")
    }

    fn cols(&self) -> Result<u16, ProgressError> {
        probe_dimension(|(cols, _)| cols, "COLUMNS")
    }

    fn clear_line_sequence(&self) -> &[u8] {
        &self.clear_line
    }

    fn color_sequence(&self, role: ColorRole) -> &[u8] {
        match role {
            ColorRole::Normal => &self.normal,
            ColorRole::Blocked => &self.blocked,
            ColorRole::Reset => &self.reset,
        }
    }
}

/// In-memory terminal for tests and headless callers.
///
/// Geometry lives in cells so a test can resize the "terminal" between two
/// renders while the scroll area still holds a shared reference to it.
#[derive(Debug, Clone)]
pub struct ScriptedTerminal {
    rows: Cell<u16>,
    cols: Cell<u16>,
    available: Cell<bool>,
    clear_line: Vec<u8>,
    normal: Vec<u8>,
    blocked: Vec<u8>,
    reset: Vec<u8>,
}

impl ScriptedTerminal {
    /// xterm-like capabilities: `ESC[K`, black on green, black on yellow.
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            rows: Cell::new(rows),
            cols: Cell::new(cols),
            available: Cell::new(true),
            clear_line: b"\x1b[K".to_vec(),
            normal: b"\x1b[30m\x1b[42m".to_vec(),
            blocked: b"\x1b[30m\x1b[43m".to_vec(),
            reset: b"\x1b[39m\x1b[49m".to_vec(),
        }
    }

    #[must_use]
    pub fn with_clear_line(mut self, sequence: &[u8]) -> Self {
        self.clear_line = sequence.to_vec();
        self
    }

    pub fn resize(&self, rows: u16, cols: u16) {
        self.rows.set(rows);
        self.cols.set(cols);
    }

    /// Make every geometry probe fail, as if the terminal went away.
    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }

    fn probe(&self, value: u16) -> Result<u16, ProgressError> {
        if !self.available.get() {
            return Err(ProgressError::unavailable("scripted terminal detached"));
        }
        if value == 0 {
            return Err(ProgressError::unavailable("terminal reports zero size"));
        }
        Ok(value)
    }
}

impl Terminal for ScriptedTerminal {
    fn rows(&self) -> Result<u16, ProgressError> {
        self.probe(self.rows.get())
    }

    fn cols(&self) -> Result<u16, ProgressError> {
        self.probe(self.cols.get())
    }

    fn clear_line_sequence(&self) -> &[u8] {
        &self.clear_line
    }

    fn color_sequence(&self, role: ColorRole) -> &[u8] {
        match role {
            ColorRole::Normal => &self.normal,
            ColorRole::Blocked => &self.blocked,
            ColorRole::Reset => &self.reset,
        }
    }
}
