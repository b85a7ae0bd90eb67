//! Pinned progress bar that owns the last terminal row while ordinary output
//! keeps scrolling in the rows above it.
//!
//! ```no_run
//! use pinbar::ScrollArea;
//!
//! # fn main() -> Result<(), pinbar::ProgressError> {
//! let mut area = ScrollArea::stdout()?;
//! area.enable_trapping();
//! area.setup_scroll_area(true)?;
//! for pct in 0..=100 {
//!     println!("working on step {pct}");
//!     area.draw_progress_bar(pct)?;
//! }
//! area.destroy_scroll_area()?;
//! # Ok(())
//! # }
//! ```

pub mod bar;
pub mod config;
pub mod error;
pub mod interrupt;
pub mod percentage;
pub mod scroll_area;
pub mod sequences;
pub mod stats;
pub mod telemetry;
pub mod terminal;
pub mod terminal_restore;

pub use error::ProgressError;
pub use percentage::Percentage;
pub use scroll_area::{BarMode, ScrollArea};
pub use terminal::{ColorRole, Geometry, ScriptedTerminal, TermInfoTerminal, Terminal};
