//! Error taxonomy for the progress facility.

use std::io;

/// Failures surfaced to callers of the scroll area.
///
/// Geometry races and repeated teardown are handled internally and never
/// show up here.
#[derive(Debug)]
pub enum ProgressError {
    /// No controlling terminal, or the terminal type is unknown to the
    /// capability database. Fatal to the facility; callers should fall back
    /// to plain output.
    TerminalUnavailable(String),
    /// A percentage outside `0..=100` was passed in.
    InvalidPercentage(i32),
    /// Writing control sequences to the terminal failed.
    Io(io::Error),
}

impl ProgressError {
    pub(crate) fn unavailable(reason: impl Into<String>) -> Self {
        Self::TerminalUnavailable(reason.into())
    }

    /// True when the embedding program should fall back to plain output.
    #[must_use]
    pub fn is_terminal_unavailable(&self) -> bool {
        matches!(self, Self::TerminalUnavailable(_))
    }
}

impl std::fmt::Display for ProgressError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TerminalUnavailable(reason) => write!(f, "terminal unavailable: {reason}"),
            Self::InvalidPercentage(value) => {
                write!(f, "invalid percentage {value}: expected 0..=100")
            }
            Self::Io(err) => write!(f, "terminal write failed: {err}"),
        }
    }
}

impl std::error::Error for ProgressError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ProgressError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}
