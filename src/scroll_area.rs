//! Scroll-region lifecycle and status-line rendering for the reserved row.
//!
//! The terminal's scroll region is shrunk by one row so ordinary output keeps
//! scrolling in rows `0..N-2` while row `N-1` is only ever painted here.
//! Every region change and every paint is bracketed by cursor save/restore,
//! so the caller's own output position is never disturbed.

use std::io::{self, Write};

use crate::bar::{compose_line, BarColors};
use crate::error::ProgressError;
use crate::interrupt::{self, InterruptGuard};
use crate::percentage::Percentage;
use crate::sequences::{
    push_move_to_row, push_region_bracket, GROW_PADDING, RESTORE_CURSOR, SAVE_CURSOR,
    SHRINK_PADDING,
};
use crate::stats::RateTracker;
use crate::terminal::{ColorRole, TermInfoTerminal, Terminal};

/// Rendering mode of the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarMode {
    #[default]
    Normal,
    /// Waiting on user input; painted with the warning color pair.
    Blocked,
}

impl BarMode {
    fn color_role(self) -> ColorRole {
        match self {
            Self::Normal => ColorRole::Normal,
            Self::Blocked => ColorRole::Blocked,
        }
    }
}

/// Owner of the reserved last row.
///
/// All state that would otherwise be process-wide lives here, so independent
/// instances can be driven against fake terminals in tests.
pub struct ScrollArea<T: Terminal, W: Write> {
    terminal: T,
    out: W,
    active: bool,
    established_rows: u16,
    show_statistics: bool,
    trapping_enabled: bool,
    tracker: Option<RateTracker>,
    mode: BarMode,
    percentage: Percentage,
    guard: InterruptGuard,
}

impl ScrollArea<TermInfoTerminal, io::Stdout> {
    /// Scroll area on the process's stdout, using `$TERM` capabilities.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::TerminalUnavailable`] when stdout is not a
    /// usable terminal.
    pub fn stdout() -> Result<Self, ProgressError> {
        Ok(Self::new(TermInfoTerminal::from_env()?, io::stdout()))
    }
}

impl<T: Terminal, W: Write> ScrollArea<T, W> {
    pub fn new(terminal: T, out: W) -> Self {
        Self {
            terminal,
            out,
            active: false,
            established_rows: 0,
            show_statistics: true,
            trapping_enabled: false,
            tracker: None,
            mode: BarMode::Normal,
            percentage: Percentage::ZERO,
            guard: InterruptGuard::default(),
        }
    }

    /// Opt in to tearing the region down on SIGINT. Call before setup.
    pub fn enable_trapping(&mut self) {
        self.trapping_enabled = true;
    }

    /// Reserve the last row and paint an empty bar.
    ///
    /// Calling it again while the region is active re-establishes the region
    /// for the current geometry without restarting the rate statistics.
    ///
    /// # Errors
    ///
    /// Fails when the terminal cannot be probed or written to.
    pub fn setup_scroll_area(&mut self, show_statistics: bool) -> Result<(), ProgressError> {
        self.show_statistics = show_statistics;
        if self.active {
            tracing::debug!("setup requested while active; re-establishing region");
        } else {
            self.tracker = None;
            self.mode = BarMode::Normal;
            self.percentage = Percentage::ZERO;
        }
        self.establish()
    }

    /// Advance the bar in the normal color pair.
    ///
    /// # Errors
    ///
    /// [`ProgressError::InvalidPercentage`] outside `0..=100`, otherwise
    /// probe or write failures.
    pub fn draw_progress_bar(&mut self, percentage: i32) -> Result<(), ProgressError> {
        self.render(BarMode::Normal, percentage)
    }

    /// Paint the bar in the warning color pair while waiting on the user.
    ///
    /// # Errors
    ///
    /// Same as [`Self::draw_progress_bar`].
    pub fn block_progress_bar(&mut self, percentage: i32) -> Result<(), ProgressError> {
        self.render(BarMode::Blocked, percentage)
    }

    /// Blank the reserved row without releasing it.
    ///
    /// # Errors
    ///
    /// Fails when the terminal cannot be probed or written to.
    pub fn clear_progress_bar(&mut self) -> Result<(), ProgressError> {
        let rows = self.terminal.rows()?;
        let mut sequence = Vec::new();
        push_clear_row(&mut sequence, rows, self.terminal.clear_line_sequence());
        emit(&mut self.out, &sequence)?;
        Ok(())
    }

    /// Give the reserved row back and restore full-height scrolling.
    ///
    /// A no-op when no region is active.
    ///
    /// # Errors
    ///
    /// Fails when the release sequence cannot be written.
    pub fn destroy_scroll_area(&mut self) -> Result<(), ProgressError> {
        if !self.active {
            tracing::debug!("teardown without an active region ignored");
            self.guard.disarm();
            return Ok(());
        }
        self.active = false;
        self.tracker = None;
        self.mode = BarMode::Normal;
        self.percentage = Percentage::ZERO;

        if self.take_interrupt_release() {
            tracing::debug!("region already released by interrupt guard");
            return Ok(());
        }

        let rows = self.terminal.rows().unwrap_or_else(|err| {
            tracing::warn!(
                error = %err,
                rows = self.established_rows,
                "row probe failed during teardown; releasing established rows"
            );
            self.established_rows
        });
        let mut sequence = Vec::new();
        push_region_bracket(&mut sequence, rows);
        push_clear_row(&mut sequence, rows, self.terminal.clear_line_sequence());
        sequence.extend_from_slice(GROW_PADDING);
        let result = emit(&mut self.out, &sequence);
        self.guard.disarm();
        tracing::debug!(rows, "scroll region released");
        result.map_err(ProgressError::from)
    }

    /// Whether the terminal's row count differs from the established region.
    ///
    /// # Errors
    ///
    /// Fails when the terminal cannot be probed.
    pub fn has_geometry_changed(&self) -> Result<bool, ProgressError> {
        Ok(self.terminal.rows()? != self.established_rows)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn established_rows(&self) -> u16 {
        self.established_rows
    }

    pub fn mode(&self) -> BarMode {
        self.mode
    }

    pub fn percentage(&self) -> Percentage {
        self.percentage
    }

    pub fn is_trap_armed(&self) -> bool {
        self.guard.is_armed()
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    fn establish(&mut self) -> Result<(), ProgressError> {
        let rows = self.terminal.rows()?;
        let mut sequence = Vec::new();
        // A grown terminal pulls the old reserved row into the scroll region.
        if self.active && self.established_rows > 0 && self.established_rows < rows {
            push_clear_row(
                &mut sequence,
                self.established_rows,
                self.terminal.clear_line_sequence(),
            );
        }
        sequence.extend_from_slice(SHRINK_PADDING);
        push_region_bracket(&mut sequence, rows.saturating_sub(1));
        emit(&mut self.out, &sequence)?;

        self.active = true;
        self.established_rows = rows;
        self.tracker.get_or_insert_with(RateTracker::start);
        self.arm_guard(rows);
        tracing::debug!(rows, statistics = self.show_statistics, "scroll region established");

        self.paint(rows)
    }

    fn arm_guard(&mut self, rows: u16) {
        if !self.trapping_enabled {
            return;
        }
        if self.guard.is_armed() {
            self.guard.update_rows(rows);
            return;
        }
        match InterruptGuard::arm(self.terminal.clear_line_sequence(), rows) {
            Ok(guard) => self.guard = guard,
            Err(err) => tracing::warn!(error = %err, "failed to install interrupt guard"),
        }
    }

    /// Acknowledge a release done by the interrupt guard, if any.
    fn take_interrupt_release(&mut self) -> bool {
        if !self.guard.is_armed() || !interrupt::take_emergency_teardown() {
            return false;
        }
        self.guard.disarm();
        true
    }

    fn render(&mut self, mode: BarMode, percentage: i32) -> Result<(), ProgressError> {
        let percentage = Percentage::new(percentage)?;
        if self.take_interrupt_release() {
            self.active = false;
        }
        let rows = self.terminal.rows()?;
        self.mode = mode;
        self.percentage = percentage;
        if !self.active || rows != self.established_rows {
            tracing::debug!(
                active = self.active,
                established = self.established_rows,
                rows,
                "re-establishing scroll region before paint"
            );
            return self.establish();
        }
        self.paint(rows)
    }

    fn paint(&mut self, rows: u16) -> Result<(), ProgressError> {
        let cols = self.terminal.cols()?;
        let suffix = if self.show_statistics {
            let tracker = self.tracker.get_or_insert_with(RateTracker::start);
            Some(tracker.snapshot(self.percentage).suffix())
        } else {
            None
        };
        let colors = BarColors {
            fill: self.terminal.color_sequence(self.mode.color_role()),
            reset: self.terminal.color_sequence(ColorRole::Reset),
        };

        let mut sequence = Vec::new();
        sequence.extend_from_slice(SAVE_CURSOR);
        push_move_to_row(&mut sequence, rows);
        sequence.extend_from_slice(self.terminal.clear_line_sequence());
        sequence.extend_from_slice(&compose_line(
            cols,
            self.percentage,
            suffix.as_deref(),
            colors,
        ));
        sequence.extend_from_slice(RESTORE_CURSOR);
        emit(&mut self.out, &sequence)?;
        Ok(())
    }
}

impl<T: Terminal, W: Write> Drop for ScrollArea<T, W> {
    fn drop(&mut self) {
        if self.active {
            if let Err(err) = self.destroy_scroll_area() {
                tracing::warn!(error = %err, "teardown on drop failed");
            }
        }
    }
}

fn push_clear_row(sequence: &mut Vec<u8>, rows: u16, clear_line: &[u8]) {
    sequence.extend_from_slice(SAVE_CURSOR);
    push_move_to_row(sequence, rows);
    sequence.extend_from_slice(clear_line);
    sequence.extend_from_slice(RESTORE_CURSOR);
}

fn emit(out: &mut impl Write, sequence: &[u8]) -> io::Result<()> {
    out.write_all(sequence)?;
    out.flush()
}
